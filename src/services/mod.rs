//! Clients for the third-party services the app depends on.
//!
//! Each service is reached through a trait so that request handlers can be
//! given real HTTP clients in production and fakes in tests.

mod aggregation;
mod appwrite;
mod documents;
mod dwolla;
mod identity;
mod payments;
mod plaid;
mod sqlite;

pub use aggregation::{
    AccountsResponse, AggregatedAccount, AggregationService, Balances, Institution, Item,
    LinkTokenRequest, PublicTokenExchange, SyncPage, SyncedTransaction,
};
pub use appwrite::AppwriteClient;
pub use documents::{DocumentStore, NewUserRecord};
pub use dwolla::DwollaClient;
pub use identity::{IdentityAccount, IdentityService, Session};
pub use payments::{
    FundingSourceRequest, PaymentsProcessor, TransferRequest, extract_customer_id_from_url,
};
pub use plaid::PlaidClient;
pub use sqlite::{SqliteBackend, create_tables};
