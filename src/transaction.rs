//! The transaction shape shared by synced bank transactions and internally
//! recorded transfers.

use time::OffsetDateTime;

/// Whether money left or entered the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Money left the account.
    Debit,
    /// Money entered the account.
    Credit,
}

impl Direction {
    /// The lowercase label used in the UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Debit => "debit",
            Direction::Credit => "credit",
        }
    }
}

/// Where a [Transaction] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionSource {
    /// The aggregation service's transaction feed.
    Synced,
    /// A transfer recorded by this application.
    Transfer,
}

/// A transaction on a bank account.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction in its source.
    pub id: String,
    /// The merchant or transfer name.
    pub name: String,
    /// The amount of money moved, always as reported by the source.
    pub amount: f64,
    /// When the transaction happened.
    ///
    /// Synced transactions only have a date, so they are placed at midnight UTC.
    pub date: OffsetDateTime,
    /// The primary category, empty if the source has none.
    pub category: String,
    /// How the payment was made, e.g. "online" or "in store".
    pub payment_channel: String,
    /// Whether money left or entered the account.
    pub direction: Direction,
    /// Whether the transaction has not settled yet.
    pub pending: bool,
    /// The merchant logo, if the source has one.
    pub image: Option<String>,
    /// Where the transaction came from.
    pub source: TransactionSource,
}

/// Combine synced and transfer transactions into a single list sorted by
/// date, newest first.
///
/// The sort is stable, so transactions with the same timestamp keep the
/// order they had in `synced` followed by `transfers`.
pub fn merge_transactions(
    synced: Vec<Transaction>,
    transfers: Vec<Transaction>,
) -> Vec<Transaction> {
    let mut transactions = synced;
    transactions.extend(transfers);
    transactions.sort_by(|a, b| b.date.cmp(&a.date));

    transactions
}
