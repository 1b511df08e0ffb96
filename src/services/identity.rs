//! The interface to the identity service that owns accounts and sessions.

use async_trait::async_trait;

use crate::{DocumentId, Error};

/// An account in the identity service.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityAccount {
    /// The account's ID.
    pub id: DocumentId,
    /// The account's email address.
    pub email: String,
    /// The account's display name.
    pub name: String,
}

/// A logged-in session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The account the session belongs to.
    pub user_id: DocumentId,
    /// The secret that authorizes requests made with the session.
    ///
    /// This is stored in the session cookie and must never be logged.
    pub secret: String,
}

/// The identity service.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Create an account with an email and password.
    ///
    /// Returns [Error::DuplicateEmail] if the email is already in use.
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<IdentityAccount, Error>;

    /// Log in with an email and password.
    ///
    /// Returns [Error::InvalidCredentials] if the combination is wrong.
    async fn create_session(&self, email: &str, password: &str) -> Result<Session, Error>;

    /// Get the account that `session_secret` belongs to.
    ///
    /// Returns [Error::InvalidCredentials] if the session is unknown or has
    /// expired.
    async fn get_account(&self, session_secret: &str) -> Result<IdentityAccount, Error>;

    /// End the session that `session_secret` belongs to.
    async fn delete_session(&self, session_secret: &str) -> Result<(), Error>;
}
