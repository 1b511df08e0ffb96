//! The endpoint URIs.
//!
//! For pages that show a single bank, use [bank_endpoint] to add the bank ID
//! to the query string.

use crate::DocumentId;

/// The home page with the balance overview and recent transactions.
pub const HOME_VIEW: &str = "/";
/// The page listing the user's linked banks.
pub const MY_BANKS_VIEW: &str = "/my-banks";
/// The page listing the transactions of one bank.
pub const TRANSACTION_HISTORY_VIEW: &str = "/transaction-history";
/// The page for sending money to another user's bank.
pub const PAYMENT_TRANSFER_VIEW: &str = "/payment-transfer";
/// The page that runs the bank linking widget.
pub const CONNECT_BANK_VIEW: &str = "/connect-bank";
/// The route for getting the sign-up page.
pub const SIGN_UP_VIEW: &str = "/sign-up";
/// The route for getting the sign-in page.
pub const SIGN_IN_VIEW: &str = "/sign-in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for creating an account.
pub const SIGN_UP_API: &str = "/api/sign_up";
/// The route for signing in a user.
pub const SIGN_IN_API: &str = "/api/sign_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route that exchanges the public token from the linking widget.
pub const EXCHANGE_PUBLIC_TOKEN_API: &str = "/api/exchange_public_token";
/// The route for sending a transfer.
pub const TRANSFERS_API: &str = "/api/transfers";

/// Add the bank `id`, and optionally a `page` number, to the query string of
/// `endpoint`.
pub fn bank_endpoint(endpoint: &str, id: &DocumentId, page: Option<u64>) -> String {
    match page {
        Some(page) => format!("{endpoint}?id={id}&page={page}"),
        None => format!("{endpoint}?id={id}"),
    }
}
