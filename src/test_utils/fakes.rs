//! Hand-written fakes of the third-party services and a SQLite backed
//! store with helpers for seeding users, banks and transfers.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use rusqlite::Connection;

use crate::{
    Bank, Error, NewBank, NewTransfer, NewUser, Service, Services, Transfer, User, encrypt_id,
    services::{
        AccountsResponse, AggregatedAccount, AggregationService, Balances, DocumentStore,
        FundingSourceRequest, IdentityService, Institution, Item, LinkTokenRequest,
        NewUserRecord, PaymentsProcessor, PublicTokenExchange, Session, SqliteBackend, SyncPage,
        TransferRequest,
    },
};

/// The password of every user created by [TestBackend].
pub(crate) const TEST_PASSWORD: &str = "averysafeandsecurepassword";

/// The lowest cost bcrypt accepts, so tests do not spend time hashing.
const TEST_PASSWORD_COST: u32 = 4;

fn unavailable(service: Service, what: &str) -> Error {
    Error::upstream(service, format!("{what} is not available"))
}

/// An aggregation service that serves canned items, institutions and sync
/// pages, and records the requests it receives.
#[derive(Default)]
pub(crate) struct FakeAggregator {
    items: HashMap<String, AccountsResponse>,
    institutions: HashMap<String, Institution>,
    sync_pages: HashMap<String, Vec<SyncPage>>,
    exchanges: HashMap<String, PublicTokenExchange>,
    failing_tokens: HashSet<String>,
    endless_sync: bool,
    link_requests: Mutex<Vec<LinkTokenRequest>>,
    sync_cursors: Mutex<Vec<Option<String>>>,
    institution_country_codes: Mutex<Vec<Vec<String>>>,
}

impl FakeAggregator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve an item with a single checking account for `access_token`.
    pub(crate) fn with_item(
        mut self,
        access_token: &str,
        account_id: &str,
        current_balance: f64,
        institution_id: &str,
    ) -> Self {
        self.items.insert(
            access_token.to_owned(),
            AccountsResponse {
                accounts: vec![AggregatedAccount {
                    account_id: account_id.to_owned(),
                    balances: Balances {
                        available: Some(current_balance),
                        current: Some(current_balance),
                    },
                    mask: Some("0000".to_owned()),
                    name: "Plaid Checking".to_owned(),
                    official_name: Some("Plaid Gold Standard 0% Interest Checking".to_owned()),
                    account_type: "depository".to_owned(),
                    subtype: Some("checking".to_owned()),
                }],
                item: Item {
                    item_id: format!("item-{account_id}"),
                    institution_id: Some(institution_id.to_owned()),
                },
            },
        );
        self.institutions.insert(
            institution_id.to_owned(),
            Institution {
                institution_id: institution_id.to_owned(),
                name: format!("Institution {institution_id}"),
                logo: None,
                primary_color: Some("#004966".to_owned()),
                url: None,
            },
        );

        self
    }

    /// Serve `pages` from the sync feed of `access_token`, in order.
    pub(crate) fn with_sync_pages(mut self, access_token: &str, pages: Vec<SyncPage>) -> Self {
        self.sync_pages.insert(access_token.to_owned(), pages);
        self
    }

    pub(crate) fn with_exchange(mut self, public_token: &str, access_token: &str, item_id: &str) -> Self {
        self.exchanges.insert(
            public_token.to_owned(),
            PublicTokenExchange {
                access_token: access_token.to_owned(),
                item_id: item_id.to_owned(),
            },
        );
        self
    }

    /// Fail every accounts request made with `access_token`.
    pub(crate) fn with_failing_token(mut self, access_token: &str) -> Self {
        self.failing_tokens.insert(access_token.to_owned());
        self
    }

    /// Make the sync feed report more pages forever.
    pub(crate) fn with_endless_sync(mut self) -> Self {
        self.endless_sync = true;
        self
    }

    pub(crate) fn link_requests(&self) -> Vec<LinkTokenRequest> {
        self.link_requests.lock().unwrap().clone()
    }

    /// The cursor of every sync request, in order.
    pub(crate) fn sync_cursors(&self) -> Vec<Option<String>> {
        self.sync_cursors.lock().unwrap().clone()
    }

    pub(crate) fn institution_country_codes(&self) -> Vec<Vec<String>> {
        self.institution_country_codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl AggregationService for FakeAggregator {
    async fn create_link_token(&self, request: &LinkTokenRequest) -> Result<String, Error> {
        self.link_requests.lock().unwrap().push(request.clone());

        Ok(format!("link-sandbox-{}", request.client_user_id))
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<PublicTokenExchange, Error> {
        self.exchanges
            .get(public_token)
            .cloned()
            .ok_or_else(|| unavailable(Service::Aggregation, public_token))
    }

    async fn get_accounts(&self, access_token: &str) -> Result<AccountsResponse, Error> {
        if self.failing_tokens.contains(access_token) {
            return Err(Error::upstream(
                Service::Aggregation,
                "ITEM_LOGIN_REQUIRED",
            ));
        }

        self.items
            .get(access_token)
            .cloned()
            .ok_or_else(|| unavailable(Service::Aggregation, access_token))
    }

    async fn get_institution(
        &self,
        institution_id: &str,
        country_codes: &[String],
    ) -> Result<Institution, Error> {
        self.institution_country_codes
            .lock()
            .unwrap()
            .push(country_codes.to_vec());

        self.institutions
            .get(institution_id)
            .cloned()
            .ok_or_else(|| unavailable(Service::Aggregation, institution_id))
    }

    async fn sync_transactions(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<SyncPage, Error> {
        let mut cursors = self.sync_cursors.lock().unwrap();
        cursors.push(cursor.map(str::to_owned));

        if self.endless_sync {
            return Ok(SyncPage {
                added: vec![],
                next_cursor: format!("cursor-{}", cursors.len()),
                has_more: true,
            });
        }

        let Some(pages) = self.sync_pages.get(access_token) else {
            return Ok(SyncPage {
                added: vec![],
                next_cursor: String::new(),
                has_more: false,
            });
        };

        let index = match cursor {
            None => 0,
            Some(cursor) => pages
                .iter()
                .position(|page| page.next_cursor == cursor)
                .map(|position| position + 1)
                .ok_or_else(|| unavailable(Service::Aggregation, cursor))?,
        };

        pages
            .get(index)
            .cloned()
            .ok_or_else(|| unavailable(Service::Aggregation, "sync page"))
    }

    async fn create_processor_token(
        &self,
        _access_token: &str,
        account_id: &str,
        _processor: &str,
    ) -> Result<String, Error> {
        Ok(format!("processor-{account_id}"))
    }
}

/// A payments processor that accepts every request unless told otherwise.
#[derive(Default)]
pub(crate) struct FakePayments {
    fail: bool,
    no_funding_source: bool,
    customers: Mutex<Vec<NewUser>>,
    funding_sources: Mutex<Vec<FundingSourceRequest>>,
    transfers: Mutex<Vec<TransferRequest>>,
}

impl FakePayments {
    /// A processor that fails every request.
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// A processor that accepts funding sources without saying where they
    /// were created.
    pub(crate) fn without_funding_source() -> Self {
        Self {
            no_funding_source: true,
            ..Default::default()
        }
    }

    pub(crate) fn customers(&self) -> Vec<NewUser> {
        self.customers.lock().unwrap().clone()
    }

    pub(crate) fn funding_sources(&self) -> Vec<FundingSourceRequest> {
        self.funding_sources.lock().unwrap().clone()
    }

    pub(crate) fn transfers(&self) -> Vec<TransferRequest> {
        self.transfers.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), Error> {
        match self.fail {
            true => Err(unavailable(Service::Payments, "the payments processor")),
            false => Ok(()),
        }
    }
}

#[async_trait]
impl PaymentsProcessor for FakePayments {
    async fn create_customer(&self, customer: &NewUser) -> Result<String, Error> {
        self.check()?;
        let mut customers = self.customers.lock().unwrap();
        customers.push(customer.clone());

        Ok(format!("https://dwolla.test/customers/cust-{}", customers.len()))
    }

    async fn add_funding_source(
        &self,
        request: &FundingSourceRequest,
    ) -> Result<Option<String>, Error> {
        self.check()?;
        self.funding_sources.lock().unwrap().push(request.clone());

        match self.no_funding_source {
            true => Ok(None),
            false => Ok(Some(format!(
                "https://dwolla.test/funding-sources/{}",
                request.processor_token
            ))),
        }
    }

    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, Error> {
        self.check()?;
        let mut transfers = self.transfers.lock().unwrap();
        transfers.push(request.clone());

        Ok(format!("https://dwolla.test/transfers/{}", transfers.len()))
    }
}

/// An in-memory SQLite identity service and document store.
#[derive(Clone)]
pub(crate) struct TestBackend {
    pub(crate) store: SqliteBackend,
}

impl TestBackend {
    pub(crate) fn new() -> Self {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");

        Self {
            store: SqliteBackend::new(connection, TEST_PASSWORD_COST)
                .expect("Could not create tables"),
        }
    }

    /// Wire the backend and the given fakes into [Services].
    pub(crate) fn services(
        &self,
        aggregator: FakeAggregator,
        payments: FakePayments,
    ) -> Services {
        let store = Arc::new(self.store.clone());

        Services {
            aggregator: Arc::new(aggregator),
            payments: Arc::new(payments),
            identity: store.clone(),
            documents: store,
        }
    }

    /// Create an identity account with [TEST_PASSWORD] and a profile for it.
    pub(crate) async fn create_user(&self, email: &str) -> User {
        let account = self
            .store
            .create_account(email, TEST_PASSWORD, "Jane Doe")
            .await
            .expect("Could not create account");
        let details = NewUser {
            first_name: "Jane".to_owned(),
            last_name: "Doe".to_owned(),
            address1: "1 Main St".to_owned(),
            city: "Springfield".to_owned(),
            state: "NY".to_owned(),
            postal_code: "11101".to_owned(),
            date_of_birth: "1990-01-01".to_owned(),
            ssn: "1234".to_owned(),
            email: email.to_owned(),
        };
        let customer_id = format!("cust-{}", account.id);

        self.store
            .create_user(&NewUserRecord {
                user_id: &account.id,
                details: &details,
                dwolla_customer_url: &format!("https://dwolla.test/customers/{customer_id}"),
                dwolla_customer_id: &customer_id,
            })
            .await
            .expect("Could not create user")
    }

    /// Sign in as `user`.
    pub(crate) async fn create_session(&self, user: &User) -> Session {
        self.store
            .create_session(&user.email, TEST_PASSWORD)
            .await
            .expect("Could not create session")
    }

    /// Link a bank for `user` whose access token is "access-{account_id}".
    pub(crate) async fn create_bank(&self, user: &User, account_id: &str) -> Bank {
        self.store
            .create_bank(&NewBank {
                user_id: user.id.clone(),
                bank_id: format!("item-{account_id}"),
                account_id: account_id.to_owned(),
                access_token: format!("access-{account_id}"),
                funding_source_url: format!("https://dwolla.test/funding-sources/{account_id}"),
                shareable_id: encrypt_id(account_id),
            })
            .await
            .expect("Could not create bank")
    }

    pub(crate) async fn create_transfer(&self, sender: &Bank, receiver: &Bank, amount: f64) -> Transfer {
        self.store
            .create_transfer(&NewTransfer {
                name: "Transfer".to_owned(),
                amount,
                channel: "online".to_owned(),
                category: "Transfer".to_owned(),
                sender_id: sender.user_id.clone(),
                sender_bank_id: sender.id.clone(),
                receiver_id: receiver.user_id.clone(),
                receiver_bank_id: receiver.id.clone(),
                email: "receiver@example.com".to_owned(),
            })
            .await
            .expect("Could not create transfer")
    }
}
