//! Credentials and endpoints for the third-party services, read from
//! environment variables.

use std::env;

/// The errors that can occur while reading the service configuration.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("the environment variable '{0}' must be set")]
    Missing(&'static str),

    /// An environment variable is set to a value that is not allowed.
    #[error("the environment variable '{name}' has the invalid value \"{value}\", expected one of {expected}")]
    Invalid {
        /// The name of the variable.
        name: &'static str,
        /// The value it was set to.
        value: String,
        /// The values that are allowed.
        expected: &'static str,
    },
}

/// Settings for the bank aggregation service.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaidConfig {
    /// The base URL of the API for the selected environment.
    pub base_url: String,
    /// The client ID issued by the aggregation service.
    pub client_id: String,
    /// The secret for the selected environment.
    pub secret: String,
}

/// Settings for the payments processor.
#[derive(Debug, Clone, PartialEq)]
pub struct DwollaConfig {
    /// The base URL of the API for the selected environment.
    pub base_url: String,
    /// The application key.
    pub key: String,
    /// The application secret.
    pub secret: String,
}

/// Settings for the identity service and document store.
#[derive(Debug, Clone, PartialEq)]
pub struct AppwriteConfig {
    /// The API endpoint, e.g. "https://cloud.appwrite.io/v1".
    pub endpoint: String,
    /// The project ID.
    pub project_id: String,
    /// The server API key.
    pub api_key: String,
    /// The ID of the database that holds the collections.
    pub database_id: String,
    /// The ID of the collection of user profiles.
    pub user_collection_id: String,
    /// The ID of the collection of linked banks.
    pub bank_collection_id: String,
    /// The ID of the collection of transfers.
    pub transaction_collection_id: String,
}

/// The configuration of all third-party services.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// The aggregation service settings.
    pub plaid: PlaidConfig,
    /// The payments processor settings.
    pub dwolla: DwollaConfig,
    /// The identity service and document store settings. `None` when the
    /// local SQLite backend is used instead.
    pub appwrite: Option<AppwriteConfig>,
}

impl ServiceConfig {
    /// Read the configuration from the process environment.
    ///
    /// Appwrite settings are only read when `use_appwrite` is set.
    ///
    /// # Errors
    ///
    /// Returns a [ConfigError] if a required variable is missing or an
    /// environment name is not recognised.
    pub fn from_env(use_appwrite: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok(), use_appwrite)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        use_appwrite: bool,
    ) -> Result<Self, ConfigError> {
        let require = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        let plaid_env = lookup("PLAID_ENV").unwrap_or_else(|| "sandbox".to_owned());
        let plaid_base_url = match plaid_env.as_str() {
            "sandbox" => "https://sandbox.plaid.com",
            "development" => "https://development.plaid.com",
            "production" => "https://production.plaid.com",
            _ => {
                return Err(ConfigError::Invalid {
                    name: "PLAID_ENV",
                    value: plaid_env,
                    expected: "sandbox, development, production",
                });
            }
        };

        let dwolla_env = lookup("DWOLLA_ENV").unwrap_or_else(|| "sandbox".to_owned());
        let dwolla_base_url = match dwolla_env.as_str() {
            "sandbox" => "https://api-sandbox.dwolla.com",
            "production" => "https://api.dwolla.com",
            _ => {
                return Err(ConfigError::Invalid {
                    name: "DWOLLA_ENV",
                    value: dwolla_env,
                    expected: "sandbox, production",
                });
            }
        };

        let appwrite = if use_appwrite {
            Some(AppwriteConfig {
                endpoint: require("APPWRITE_ENDPOINT")?
                    .trim_end_matches('/')
                    .to_owned(),
                project_id: require("APPWRITE_PROJECT")?,
                api_key: require("APPWRITE_KEY")?,
                database_id: require("APPWRITE_DATABASE_ID")?,
                user_collection_id: require("APPWRITE_USER_COLLECTION_ID")?,
                bank_collection_id: require("APPWRITE_BANK_COLLECTION_ID")?,
                transaction_collection_id: require("APPWRITE_TRANSACTION_COLLECTION_ID")?,
            })
        } else {
            None
        };

        Ok(Self {
            plaid: PlaidConfig {
                base_url: plaid_base_url.to_owned(),
                client_id: require("PLAID_CLIENT_ID")?,
                secret: require("PLAID_SECRET")?,
            },
            dwolla: DwollaConfig {
                base_url: dwolla_base_url.to_owned(),
                key: require("DWOLLA_KEY")?,
                secret: require("DWOLLA_SECRET")?,
            },
            appwrite,
        })
    }
}

#[cfg(test)]
mod service_config_tests {
    use std::collections::HashMap;

    use super::{ConfigError, ServiceConfig};

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("PLAID_CLIENT_ID", "client"),
            ("PLAID_SECRET", "plaid-secret"),
            ("DWOLLA_KEY", "key"),
            ("DWOLLA_SECRET", "dwolla-secret"),
        ])
    }

    fn load(
        vars: &HashMap<&'static str, &'static str>,
        use_appwrite: bool,
    ) -> Result<ServiceConfig, ConfigError> {
        ServiceConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()), use_appwrite)
    }

    #[test]
    fn defaults_to_sandbox() {
        let config = load(&base_vars(), false).unwrap();

        assert_eq!(config.plaid.base_url, "https://sandbox.plaid.com");
        assert_eq!(config.dwolla.base_url, "https://api-sandbox.dwolla.com");
        assert_eq!(config.appwrite, None);
    }

    #[test]
    fn reports_missing_variable() {
        let mut vars = base_vars();
        vars.remove("PLAID_SECRET");

        assert_eq!(load(&vars, false), Err(ConfigError::Missing("PLAID_SECRET")));
    }

    #[test]
    fn rejects_unknown_environment() {
        let mut vars = base_vars();
        vars.insert("PLAID_ENV", "staging");

        assert!(matches!(
            load(&vars, false),
            Err(ConfigError::Invalid {
                name: "PLAID_ENV",
                ..
            })
        ));
    }

    #[test]
    fn reads_appwrite_settings_when_requested() {
        let mut vars = base_vars();
        vars.extend([
            ("APPWRITE_ENDPOINT", "https://cloud.appwrite.io/v1/"),
            ("APPWRITE_PROJECT", "project"),
            ("APPWRITE_KEY", "key"),
            ("APPWRITE_DATABASE_ID", "db"),
            ("APPWRITE_USER_COLLECTION_ID", "users"),
            ("APPWRITE_BANK_COLLECTION_ID", "banks"),
            ("APPWRITE_TRANSACTION_COLLECTION_ID", "transactions"),
        ]);

        let appwrite = load(&vars, true).unwrap().appwrite.unwrap();

        assert_eq!(appwrite.endpoint, "https://cloud.appwrite.io/v1");
        assert_eq!(appwrite.transaction_collection_id, "transactions");
    }

    #[test]
    fn requires_appwrite_settings_when_requested() {
        assert_eq!(
            load(&base_vars(), true),
            Err(ConfigError::Missing("APPWRITE_ENDPOINT"))
        );
    }
}
