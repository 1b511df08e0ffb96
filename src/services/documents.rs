//! The interface to the document store that holds user profiles, linked
//! banks and transfers.

use async_trait::async_trait;

use crate::{Bank, DocumentId, Error, NewBank, NewTransfer, NewUser, Transfer, User};

/// The data needed to create a user profile document.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserRecord<'a> {
    /// The ID of the user's account in the identity service.
    pub user_id: &'a DocumentId,
    /// The profile details from the sign-up form.
    pub details: &'a NewUser,
    /// The URL of the user's customer record in the payments processor.
    pub dwolla_customer_url: &'a str,
    /// The ID of the user's customer record in the payments processor.
    pub dwolla_customer_id: &'a str,
}

/// The document store.
///
/// Lookups of a single record return [Error::NotFound] when no document
/// matches.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a user profile.
    async fn create_user(&self, user: &NewUserRecord<'_>) -> Result<User, Error>;

    /// Get the profile of the identity-service account `user_id`.
    async fn get_user(&self, user_id: &DocumentId) -> Result<User, Error>;

    /// Create a linked bank record.
    async fn create_bank(&self, bank: &NewBank) -> Result<Bank, Error>;

    /// Get all banks linked by the user whose profile ID is `user_id`.
    async fn get_banks(&self, user_id: &DocumentId) -> Result<Vec<Bank>, Error>;

    /// Get a bank by its document ID.
    async fn get_bank(&self, id: &DocumentId) -> Result<Bank, Error>;

    /// Get the bank linked to the aggregation service account `account_id`.
    async fn get_bank_by_account_id(&self, account_id: &str) -> Result<Bank, Error>;

    /// Record a transfer.
    async fn create_transfer(&self, transfer: &NewTransfer) -> Result<Transfer, Error>;

    /// Get all transfers that `bank_id` sent or received.
    async fn get_transfers_by_bank(&self, bank_id: &DocumentId) -> Result<Vec<Transfer>, Error>;
}
