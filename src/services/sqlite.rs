//! A SQLite backed identity service and document store for local
//! development and tests.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bcrypt::{hash, verify};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use rand::{RngCore, rngs::OsRng};
use time::OffsetDateTime;

use crate::{
    Bank, DocumentId, Error, NewBank, NewTransfer, Transfer, User,
    services::{
        documents::{DocumentStore, NewUserRecord},
        identity::{IdentityAccount, IdentityService, Session},
    },
};

/// Stores accounts, sessions and documents in one SQLite database.
///
/// Document IDs are the row IDs of the underlying tables.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    connection: Arc<Mutex<Connection>>,
    password_cost: u32,
}

impl SqliteBackend {
    /// The bcrypt cost used for hashing passwords outside of tests.
    pub const DEFAULT_PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

    /// Create the tables in `connection` if they do not exist and wrap it
    /// in a backend.
    ///
    /// `password_cost` is the bcrypt cost. Pass
    /// [SqliteBackend::DEFAULT_PASSWORD_COST] unless speed matters more than
    /// security, e.g. in tests.
    ///
    /// # Errors
    ///
    /// Returns an [Error::SqlError] if the tables could not be created.
    pub fn new(connection: Connection, password_cost: u32) -> Result<Self, Error> {
        create_tables(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            password_cost,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)
    }
}

/// The number of random bytes in a session secret.
const SESSION_SECRET_BYTES: usize = 32;

/// Generate a session secret from the operating system's random number
/// generator, hex encoded.
fn new_session_secret() -> String {
    let mut bytes = [0u8; SESSION_SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);

    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Create the tables used by [SqliteBackend].
///
/// # Errors
///
/// Returns an error if any of the SQL statements fail.
pub fn create_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS identity_account (
            id INTEGER PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session (
            secret TEXT PRIMARY KEY,
            account_id INTEGER NOT NULL,
            FOREIGN KEY(account_id) REFERENCES identity_account(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS user_profile (
            id INTEGER PRIMARY KEY,
            user_id TEXT UNIQUE NOT NULL,
            email TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            address1 TEXT NOT NULL,
            city TEXT NOT NULL,
            state TEXT NOT NULL,
            postal_code TEXT NOT NULL,
            date_of_birth TEXT NOT NULL,
            dwolla_customer_id TEXT NOT NULL,
            dwolla_customer_url TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bank (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            bank_id TEXT NOT NULL,
            account_id TEXT NOT NULL,
            access_token TEXT NOT NULL,
            funding_source_url TEXT NOT NULL,
            shareable_id TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS bank_user_id ON bank(user_id);
        CREATE INDEX IF NOT EXISTS bank_account_id ON bank(account_id);

        CREATE TABLE IF NOT EXISTS transfer (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            amount REAL NOT NULL,
            channel TEXT NOT NULL,
            category TEXT NOT NULL,
            sender_id TEXT NOT NULL,
            sender_bank_id TEXT NOT NULL,
            receiver_id TEXT NOT NULL,
            receiver_bank_id TEXT NOT NULL,
            email TEXT NOT NULL,
            created_at TEXT NOT NULL
        );",
    )
}

fn row_id(id: i64) -> DocumentId {
    DocumentId::new_unchecked(&id.to_string())
}

fn text_id(row: &Row, index: usize) -> Result<DocumentId, rusqlite::Error> {
    let raw_id: String = row.get(index)?;

    Ok(DocumentId::new_unchecked(&raw_id))
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

const USER_COLUMNS: &str = "id, user_id, email, first_name, last_name, address1, city, state, \
    postal_code, date_of_birth, dwolla_customer_id, dwolla_customer_url";

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: row_id(row.get(0)?),
        user_id: text_id(row, 1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        address1: row.get(5)?,
        city: row.get(6)?,
        state: row.get(7)?,
        postal_code: row.get(8)?,
        date_of_birth: row.get(9)?,
        dwolla_customer_id: row.get(10)?,
        dwolla_customer_url: row.get(11)?,
    })
}

const BANK_COLUMNS: &str =
    "id, user_id, bank_id, account_id, access_token, funding_source_url, shareable_id";

fn map_bank_row(row: &Row) -> Result<Bank, rusqlite::Error> {
    Ok(Bank {
        id: row_id(row.get(0)?),
        user_id: text_id(row, 1)?,
        bank_id: row.get(2)?,
        account_id: row.get(3)?,
        access_token: row.get(4)?,
        funding_source_url: row.get(5)?,
        shareable_id: row.get(6)?,
    })
}

const TRANSFER_COLUMNS: &str = "id, name, amount, channel, category, sender_id, sender_bank_id, \
    receiver_id, receiver_bank_id, email, created_at";

fn map_transfer_row(row: &Row) -> Result<Transfer, rusqlite::Error> {
    Ok(Transfer {
        id: row_id(row.get(0)?),
        name: row.get(1)?,
        amount: row.get(2)?,
        channel: row.get(3)?,
        category: row.get(4)?,
        sender_id: text_id(row, 5)?,
        sender_bank_id: text_id(row, 6)?,
        receiver_id: text_id(row, 7)?,
        receiver_bank_id: text_id(row, 8)?,
        email: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[async_trait]
impl IdentityService for SqliteBackend {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<IdentityAccount, Error> {
        let password_hash =
            hash(password, self.password_cost).map_err(|e| Error::HashingError(e.to_string()))?;
        let connection = self.lock()?;

        connection
            .execute(
                "INSERT INTO identity_account (email, password, name) VALUES (?1, ?2, ?3)",
                (email, &password_hash, name),
            )
            .map_err(|error| {
                if is_unique_violation(&error) {
                    Error::DuplicateEmail(email.to_owned())
                } else {
                    error.into()
                }
            })?;

        Ok(IdentityAccount {
            id: row_id(connection.last_insert_rowid()),
            email: email.to_owned(),
            name: name.to_owned(),
        })
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<Session, Error> {
        let connection = self.lock()?;

        let (account_id, password_hash): (i64, String) = connection
            .query_row(
                "SELECT id, password FROM identity_account WHERE email = ?1",
                [email],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or(Error::InvalidCredentials)?;

        let is_match =
            verify(password, &password_hash).map_err(|e| Error::HashingError(e.to_string()))?;
        if !is_match {
            return Err(Error::InvalidCredentials);
        }

        let secret = new_session_secret();
        connection.execute(
            "INSERT INTO session (secret, account_id) VALUES (?1, ?2)",
            (&secret, account_id),
        )?;

        Ok(Session {
            user_id: row_id(account_id),
            secret,
        })
    }

    async fn get_account(&self, session_secret: &str) -> Result<IdentityAccount, Error> {
        self.lock()?
            .query_row(
                "SELECT identity_account.id, email, name FROM session
                INNER JOIN identity_account ON identity_account.id = session.account_id
                WHERE session.secret = ?1",
                [session_secret],
                |row| {
                    Ok(IdentityAccount {
                        id: row_id(row.get(0)?),
                        email: row.get(1)?,
                        name: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or(Error::InvalidCredentials)
    }

    async fn delete_session(&self, session_secret: &str) -> Result<(), Error> {
        let rows_affected = self
            .lock()?
            .execute("DELETE FROM session WHERE secret = ?1", [session_secret])?;

        match rows_affected {
            0 => Err(Error::InvalidCredentials),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteBackend {
    async fn create_user(&self, user: &NewUserRecord<'_>) -> Result<User, Error> {
        let details = user.details;
        let connection = self.lock()?;

        connection.execute(
            "INSERT INTO user_profile (user_id, email, first_name, last_name, address1, city, \
            state, postal_code, date_of_birth, dwolla_customer_id, dwolla_customer_url)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            (
                user.user_id.as_str(),
                &details.email,
                &details.first_name,
                &details.last_name,
                &details.address1,
                &details.city,
                &details.state,
                &details.postal_code,
                &details.date_of_birth,
                user.dwolla_customer_id,
                user.dwolla_customer_url,
            ),
        )?;

        Ok(User {
            id: row_id(connection.last_insert_rowid()),
            user_id: user.user_id.clone(),
            email: details.email.clone(),
            first_name: details.first_name.clone(),
            last_name: details.last_name.clone(),
            address1: details.address1.clone(),
            city: details.city.clone(),
            state: details.state.clone(),
            postal_code: details.postal_code.clone(),
            date_of_birth: details.date_of_birth.clone(),
            dwolla_customer_id: user.dwolla_customer_id.to_owned(),
            dwolla_customer_url: user.dwolla_customer_url.to_owned(),
        })
    }

    async fn get_user(&self, user_id: &DocumentId) -> Result<User, Error> {
        self.lock()?
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM user_profile WHERE user_id = ?1"),
                [user_id.as_str()],
                map_user_row,
            )
            .map_err(Error::from)
    }

    async fn create_bank(&self, bank: &NewBank) -> Result<Bank, Error> {
        let connection = self.lock()?;

        connection.execute(
            "INSERT INTO bank (user_id, bank_id, account_id, access_token, funding_source_url, \
            shareable_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                bank.user_id.as_str(),
                &bank.bank_id,
                &bank.account_id,
                &bank.access_token,
                &bank.funding_source_url,
                &bank.shareable_id,
            ),
        )?;

        Ok(Bank {
            id: row_id(connection.last_insert_rowid()),
            user_id: bank.user_id.clone(),
            bank_id: bank.bank_id.clone(),
            account_id: bank.account_id.clone(),
            access_token: bank.access_token.clone(),
            funding_source_url: bank.funding_source_url.clone(),
            shareable_id: bank.shareable_id.clone(),
        })
    }

    async fn get_banks(&self, user_id: &DocumentId) -> Result<Vec<Bank>, Error> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {BANK_COLUMNS} FROM bank WHERE user_id = ?1 ORDER BY id ASC"
        ))?;

        statement
            .query_map([user_id.as_str()], map_bank_row)?
            .map(|bank| bank.map_err(Error::from))
            .collect()
    }

    async fn get_bank(&self, id: &DocumentId) -> Result<Bank, Error> {
        self.lock()?
            .query_row(
                &format!("SELECT {BANK_COLUMNS} FROM bank WHERE id = ?1"),
                [id.as_str()],
                map_bank_row,
            )
            .map_err(Error::from)
    }

    async fn get_bank_by_account_id(&self, account_id: &str) -> Result<Bank, Error> {
        self.lock()?
            .query_row(
                &format!("SELECT {BANK_COLUMNS} FROM bank WHERE account_id = ?1 LIMIT 1"),
                [account_id],
                map_bank_row,
            )
            .map_err(Error::from)
    }

    async fn create_transfer(&self, transfer: &NewTransfer) -> Result<Transfer, Error> {
        let now = OffsetDateTime::now_utc();
        let created_at = now.replace_nanosecond(0).unwrap_or(now);
        let connection = self.lock()?;

        connection.execute(
            "INSERT INTO transfer (name, amount, channel, category, sender_id, sender_bank_id, \
            receiver_id, receiver_bank_id, email, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            (
                &transfer.name,
                transfer.amount,
                &transfer.channel,
                &transfer.category,
                transfer.sender_id.as_str(),
                transfer.sender_bank_id.as_str(),
                transfer.receiver_id.as_str(),
                transfer.receiver_bank_id.as_str(),
                &transfer.email,
                created_at,
            ),
        )?;

        Ok(Transfer {
            id: row_id(connection.last_insert_rowid()),
            name: transfer.name.clone(),
            amount: transfer.amount,
            channel: transfer.channel.clone(),
            category: transfer.category.clone(),
            sender_id: transfer.sender_id.clone(),
            sender_bank_id: transfer.sender_bank_id.clone(),
            receiver_id: transfer.receiver_id.clone(),
            receiver_bank_id: transfer.receiver_bank_id.clone(),
            email: transfer.email.clone(),
            created_at,
        })
    }

    async fn get_transfers_by_bank(&self, bank_id: &DocumentId) -> Result<Vec<Transfer>, Error> {
        let connection = self.lock()?;
        let mut statement = connection.prepare(&format!(
            "SELECT {TRANSFER_COLUMNS} FROM transfer
            WHERE sender_bank_id = ?1 OR receiver_bank_id = ?1
            ORDER BY id ASC"
        ))?;

        statement
            .query_map([bank_id.as_str()], map_transfer_row)?
            .map(|transfer| transfer.map_err(Error::from))
            .collect()
    }
}



#[cfg(test)]
mod document_store_tests {
    use rusqlite::Connection;

    use crate::{
        DocumentId, Error, NewBank, NewTransfer, NewUser,
        services::documents::{DocumentStore, NewUserRecord},
    };

    use super::SqliteBackend;

    fn get_backend() -> SqliteBackend {
        SqliteBackend::new(Connection::open_in_memory().unwrap(), 4).unwrap()
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            address1: "1 Main St".to_owned(),
            city: "Springfield".to_owned(),
            state: "NY".to_owned(),
            postal_code: "11101".to_owned(),
            date_of_birth: "1990-01-01".to_owned(),
            ssn: "1234".to_owned(),
            email: email.to_owned(),
        }
    }

    fn new_bank(user_id: &DocumentId, account_id: &str) -> NewBank {
        NewBank {
            user_id: user_id.clone(),
            bank_id: format!("item-{account_id}"),
            account_id: account_id.to_owned(),
            access_token: format!("access-{account_id}"),
            funding_source_url: format!("https://dwolla.test/funding-sources/{account_id}"),
            shareable_id: crate::encrypt_id(account_id),
        }
    }

    #[tokio::test]
    async fn get_user_by_identity_id() {
        let backend = get_backend();
        let identity_id = DocumentId::new_unchecked("42");
        let details = new_user("jane@example.com");

        let created = backend
            .create_user(&NewUserRecord {
                user_id: &identity_id,
                details: &details,
                dwolla_customer_url: "https://dwolla.test/customers/abc",
                dwolla_customer_id: "abc",
            })
            .await
            .unwrap();
        let got = backend.get_user(&identity_id).await.unwrap();

        assert_eq!(got, created);
        assert_eq!(got.dwolla_customer_id, "abc");
    }

    #[tokio::test]
    async fn missing_user_is_not_found() {
        let backend = get_backend();

        let result = backend.get_user(&DocumentId::new_unchecked("42")).await;

        assert_eq!(result, Err(Error::NotFound));
    }

    #[tokio::test]
    async fn banks_are_listed_per_user() {
        let backend = get_backend();
        let alice = DocumentId::new_unchecked("1");
        let bob = DocumentId::new_unchecked("2");

        let first = backend.create_bank(&new_bank(&alice, "acc1")).await.unwrap();
        let second = backend.create_bank(&new_bank(&alice, "acc2")).await.unwrap();
        backend.create_bank(&new_bank(&bob, "acc3")).await.unwrap();

        let banks = backend.get_banks(&alice).await.unwrap();

        assert_eq!(banks, vec![first, second]);
    }

    #[tokio::test]
    async fn get_bank_by_id_and_account_id() {
        let backend = get_backend();
        let user_id = DocumentId::new_unchecked("1");
        let bank = backend.create_bank(&new_bank(&user_id, "acc1")).await.unwrap();

        assert_eq!(backend.get_bank(&bank.id).await, Ok(bank.clone()));
        assert_eq!(backend.get_bank_by_account_id("acc1").await, Ok(bank));
        assert_eq!(
            backend.get_bank_by_account_id("acc2").await,
            Err(Error::NotFound)
        );
        assert_eq!(
            backend.get_bank(&DocumentId::new_unchecked("999")).await,
            Err(Error::NotFound)
        );
    }

    #[tokio::test]
    async fn transfers_are_found_from_both_sides() {
        let backend = get_backend();
        let alice = DocumentId::new_unchecked("1");
        let bob = DocumentId::new_unchecked("2");
        let alice_bank = backend.create_bank(&new_bank(&alice, "acc1")).await.unwrap();
        let bob_bank = backend.create_bank(&new_bank(&bob, "acc2")).await.unwrap();
        let unrelated_bank = backend.create_bank(&new_bank(&bob, "acc3")).await.unwrap();

        let transfer = backend
            .create_transfer(&NewTransfer {
                name: "Rent".to_owned(),
                amount: 12.5,
                channel: "online".to_owned(),
                category: "Transfer".to_owned(),
                sender_id: alice.clone(),
                sender_bank_id: alice_bank.id.clone(),
                receiver_id: bob.clone(),
                receiver_bank_id: bob_bank.id.clone(),
                email: "bob@example.com".to_owned(),
            })
            .await
            .unwrap();

        assert_eq!(
            backend.get_transfers_by_bank(&alice_bank.id).await,
            Ok(vec![transfer.clone()])
        );
        assert_eq!(
            backend.get_transfers_by_bank(&bob_bank.id).await,
            Ok(vec![transfer])
        );
        assert_eq!(
            backend.get_transfers_by_bank(&unrelated_bank.id).await,
            Ok(vec![])
        );
    }
}
