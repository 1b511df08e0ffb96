//! Orchestrates the aggregation service, payments processor and document
//! store into the account, transaction and bank-linking views of a user.
//!
//! Every function takes the service clients it needs as arguments so that
//! tests can pass in fakes.

mod accounts;
mod institution;
mod link;
mod transactions;

pub use accounts::{get_account, get_accounts};
pub use institution::{COUNTRY_CODES, get_institution};
pub use link::{create_link_token, exchange_public_token};
pub use transactions::{MAX_SYNC_PAGES, get_transactions, get_transfer_transactions};
