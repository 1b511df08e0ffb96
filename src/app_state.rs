//! Implements a struct that holds the state of the server.

use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    pagination::PaginationConfig,
    services::{AggregationService, DocumentStore, IdentityService, PaymentsProcessor},
};

/// The clients of the third-party services.
///
/// Handlers pass these into the orchestration functions. Tests swap in
/// fakes and an in-memory SQLite backend.
#[derive(Clone)]
pub struct Services {
    /// The bank aggregation service.
    pub aggregator: Arc<dyn AggregationService>,
    /// The payments processor.
    pub payments: Arc<dyn PaymentsProcessor>,
    /// The identity service that owns accounts and sessions.
    pub identity: Arc<dyn IdentityService>,
    /// The document store for user profiles, banks and transfers.
    pub documents: Arc<dyn DocumentStore>,
}

/// The state of the server.
#[derive(Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The config that controls how to display pages of data.
    pub pagination_config: PaginationConfig,

    /// The third-party service clients.
    pub services: Services,
}

impl AppState {
    /// Create a new [AppState], deriving the cookie key from `cookie_secret`.
    pub fn new(cookie_secret: &str, pagination_config: PaginationConfig, services: Services) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            pagination_config,
            services,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for Services {
    fn from_ref(state: &AppState) -> Self {
        state.services.clone()
    }
}

impl FromRef<AppState> for PaginationConfig {
    fn from_ref(state: &AppState) -> Self {
        state.pagination_config.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}
