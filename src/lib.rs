//! Aurora is a personal banking web app.
//!
//! Users sign up, link their bank accounts through an aggregation service,
//! view balances and transactions across all linked banks, and move money
//! between banks through a payments processor.
//!
//! This library provides a server that directly serves HTML pages. The
//! third-party services are reached through the traits in [services] so
//! that each request handler receives its clients from [AppState].

#![warn(missing_docs)]

use std::{fmt::Display, net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod account;
mod aggregator;
mod alert;
mod app_state;
mod auth;
mod bank;
mod config;
mod connect_bank;
mod endpoints;
mod home;
mod html;
mod internal_server_error;
mod logging;
mod my_banks;
mod navigation;
mod not_found;
mod pagination;
mod routing;
pub mod services;
mod transaction;
mod transaction_history;
mod transfer;
mod user;

#[cfg(test)]
mod test_utils;

pub use account::{Account, AccountDetail, AccountsSummary};
pub use aggregator::{
    MAX_SYNC_PAGES, create_link_token, exchange_public_token, get_account, get_accounts,
    get_institution, get_transactions,
};
pub use app_state::{AppState, Services};
pub use bank::{Bank, NewBank, decrypt_id, encrypt_id};
pub use config::{ConfigError, ServiceConfig};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use transaction::{Direction, Transaction, TransactionSource};
pub use transfer::{NewTransfer, Transfer};
pub use user::{DocumentId, NewUser, User};

use crate::{
    alert::Alert,
    internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The third-party service that an upstream error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// The bank aggregation service (Plaid).
    Aggregation,
    /// The payments processor (Dwolla).
    Payments,
    /// The identity service that owns accounts and sessions (Appwrite).
    Identity,
    /// The document store that holds users, banks and transfers (Appwrite).
    Documents,
}

impl Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Service::Aggregation => "aggregation service",
            Service::Payments => "payments processor",
            Service::Identity => "identity service",
            Service::Documents => "document store",
        };

        f.write_str(name)
    }
}

/// The broad category of an [Error].
///
/// Callers use this to tell "the thing does not exist" apart from "a
/// service we depend on is down" and "the request was malformed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A user, bank or account record is missing.
    NotFound,
    /// The request contained malformed or unacceptable input.
    Validation,
    /// The request is missing valid credentials.
    Unauthorized,
    /// A third-party service failed or returned an unusable response.
    Upstream,
    /// Something went wrong inside this application.
    Internal,
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows or
    /// documents.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A document ID did not match the allowed format.
    #[error("\"{0}\" is not a valid document ID")]
    InvalidDocumentId(String),

    /// The email and password combination did not match an account.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The session cookie is missing from the cookie jar in the request.
    #[error("no session cookie in the cookie jar")]
    SessionMissing,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// A sign-up or transfer form field was missing or malformed.
    ///
    /// The first string is the field name, the second describes the problem.
    #[error("invalid {0}: {1}")]
    InvalidField(&'static str, String),

    /// An account with the same email address already exists.
    #[error("an account with the email \"{0}\" already exists")]
    DuplicateEmail(String),

    /// A shareable ID could not be decoded into an account ID.
    #[error("the shareable ID is not valid")]
    InvalidShareableId,

    /// The source bank of a transfer does not belong to the sender.
    #[error("the bank does not belong to the current user")]
    BankOwnership,

    /// The aggregation service returned an item without any accounts.
    #[error("the linked item has no accounts")]
    NoAccounts,

    /// The payments processor did not return a funding source for a newly
    /// linked bank, so no bank record was created.
    #[error("the payments processor did not create a funding source")]
    MissingFundingSource,

    /// The transaction sync feed kept reporting more pages past the limit.
    #[error("transaction sync did not finish after {0} pages")]
    SyncPageLimit(usize),

    /// A third-party service failed.
    ///
    /// The message should only be logged for debugging on the server.
    #[error("the {service} failed: {message}")]
    Upstream {
        /// The service that failed.
        service: Service,
        /// The error reported by the service or HTTP client.
        message: String,
    },

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl Error {
    /// Create an [Error::Upstream] for `service` from any displayable error.
    pub fn upstream(service: Service, error: impl Display) -> Self {
        Error::Upstream {
            service,
            message: error.to_string(),
        }
    }

    /// Classify the error so callers can react to the cause of a failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound | Error::NoAccounts => ErrorKind::NotFound,
            Error::InvalidDocumentId(_)
            | Error::TooWeak(_)
            | Error::InvalidField(_, _)
            | Error::DuplicateEmail(_)
            | Error::InvalidShareableId
            | Error::BankOwnership => ErrorKind::Validation,
            Error::InvalidCredentials | Error::SessionMissing => ErrorKind::Unauthorized,
            Error::Upstream { .. } | Error::MissingFundingSource | Error::SyncPageLimit(_) => {
                ErrorKind::Upstream
            }
            Error::HashingError(_) | Error::SqlError(_) | Error::DatabaseLockError => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.kind() {
            ErrorKind::NotFound => get_404_not_found_response(),
            ErrorKind::Upstream => {
                tracing::error!("An upstream service failed: {}", self);
                InternalServerError {
                    description: "Service Unavailable",
                    fix: "One of the services we depend on is not responding. Please try again later.",
                }
                .into_response()
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            _ => {
                tracing::error!("An unexpected error occurred: {}", self);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an alert for HTMX form endpoints.
    pub(crate) fn into_alert_response(self) -> Response {
        match self {
            Error::InvalidField(field, reason) => Alert::error(
                &format!("Invalid {field}"),
                &reason,
            )
            .into_response_with_status(StatusCode::BAD_REQUEST),
            Error::InvalidShareableId => Alert::error(
                "Invalid shareable ID",
                "Check the recipient's shareable ID and try again.",
            )
            .into_response_with_status(StatusCode::BAD_REQUEST),
            Error::BankOwnership | Error::InvalidDocumentId(_) => Alert::error(
                "Invalid source bank",
                "Choose one of your linked banks as the source of funds.",
            )
            .into_response_with_status(StatusCode::BAD_REQUEST),
            Error::NotFound => Alert::error(
                "Bank not found",
                "The recipient's bank could not be found. \
                Ask them to check their shareable ID on the My Banks page.",
            )
            .into_response_with_status(StatusCode::NOT_FOUND),
            error if error.kind() == ErrorKind::Upstream => {
                tracing::error!("An upstream service failed: {error}");
                Alert::error(
                    "Service unavailable",
                    "A banking service is not responding right now. Please try again later.",
                )
                .into_response_with_status(StatusCode::BAD_GATEWAY)
            }
            error => {
                tracing::error!("An unexpected error occurred: {error}");
                Alert::error(
                    "Something went wrong",
                    "An unexpected error occurred, check the server logs for more details.",
                )
                .into_response_with_status(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}
