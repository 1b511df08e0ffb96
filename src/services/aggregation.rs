//! The interface to the bank aggregation service and the data it returns.
//!
//! The types mirror the aggregation service's JSON so that the HTTP client
//! can deserialize responses directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::Error;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// The parameters for creating a link token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkTokenRequest {
    /// The ID that the aggregation service uses to identify the end user.
    pub client_user_id: String,
    /// The name shown in the linking widget.
    pub client_name: String,
    /// The products the link grants access to, e.g. "auth".
    pub products: Vec<String>,
    /// The language of the linking widget.
    pub language: String,
    /// The countries whose institutions can be linked.
    pub country_codes: Vec<String>,
}

/// The result of exchanging a single-use public token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublicTokenExchange {
    /// The durable access token for the linked item.
    pub access_token: String,
    /// The ID of the linked item.
    pub item_id: String,
}

/// The balances of an account as reported by the institution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Balances {
    /// The amount that can be spent right now.
    pub available: Option<f64>,
    /// The total amount of funds in the account.
    pub current: Option<f64>,
}

/// An account as returned by the aggregation service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregatedAccount {
    /// The account's ID.
    pub account_id: String,
    /// The account's balances.
    pub balances: Balances,
    /// The last few digits of the account number.
    pub mask: Option<String>,
    /// The display name of the account.
    pub name: String,
    /// The name the institution gives the account.
    pub official_name: Option<String>,
    /// The account type, e.g. "depository".
    #[serde(rename = "type")]
    pub account_type: String,
    /// The account subtype, e.g. "checking".
    pub subtype: Option<String>,
}

/// A login connection to a financial institution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Item {
    /// The item's ID.
    pub item_id: String,
    /// The institution the item is connected to.
    pub institution_id: Option<String>,
}

/// The accounts of an item.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountsResponse {
    /// The item's accounts.
    pub accounts: Vec<AggregatedAccount>,
    /// The item the accounts belong to.
    pub item: Item,
}

/// Display metadata for a financial institution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Institution {
    /// The institution's ID.
    pub institution_id: String,
    /// The institution's name.
    pub name: String,
    /// The base64 encoded PNG logo of the institution.
    pub logo: Option<String>,
    /// The hex colour code of the institution's branding.
    pub primary_color: Option<String>,
    /// The institution's website.
    pub url: Option<String>,
}

/// A transaction from the transaction sync feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncedTransaction {
    /// The transaction's ID.
    pub transaction_id: String,
    /// The account the transaction was made on.
    pub account_id: String,
    /// The merchant name or transaction description.
    pub name: String,
    /// The amount of the transaction. Positive values are money leaving the
    /// account.
    pub amount: f64,
    /// The date the transaction posted.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// Whether the transaction has not settled yet.
    pub pending: bool,
    /// How the payment was made, e.g. "online".
    pub payment_channel: String,
    /// The category hierarchy, most general first.
    #[serde(default)]
    pub category: Option<Vec<String>>,
    /// The merchant logo.
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// One page of the transaction sync feed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncPage {
    /// The transactions added since the previous cursor.
    pub added: Vec<SyncedTransaction>,
    /// The cursor to pass to get the next page.
    pub next_cursor: String,
    /// Whether there are more pages after this one.
    pub has_more: bool,
}

/// The bank aggregation service.
///
/// All calls except [AggregationService::create_link_token] and
/// [AggregationService::exchange_public_token] are authorized with an
/// item's access token.
#[async_trait]
pub trait AggregationService: Send + Sync {
    /// Create a short-lived token for starting the client-side linking widget.
    async fn create_link_token(&self, request: &LinkTokenRequest) -> Result<String, Error>;

    /// Exchange a single-use public token for a durable access token.
    async fn exchange_public_token(&self, public_token: &str)
    -> Result<PublicTokenExchange, Error>;

    /// Get the accounts of the item that `access_token` belongs to.
    async fn get_accounts(&self, access_token: &str) -> Result<AccountsResponse, Error>;

    /// Get the metadata of an institution in one of `country_codes`.
    async fn get_institution(
        &self,
        institution_id: &str,
        country_codes: &[String],
    ) -> Result<Institution, Error>;

    /// Get the page of transactions after `cursor`, or the first page if
    /// `cursor` is `None`.
    async fn sync_transactions(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<SyncPage, Error>;

    /// Create a token that lets `processor` access one account of an item.
    async fn create_processor_token(
        &self,
        access_token: &str,
        account_id: &str,
        processor: &str,
    ) -> Result<String, Error>;
}
