//! HTTP client for the Plaid API.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    Error, Service,
    config::PlaidConfig,
    services::aggregation::{
        AccountsResponse, AggregationService, Institution, LinkTokenRequest, PublicTokenExchange,
        SyncPage,
    },
};

/// The number of transactions to request per sync page.
const SYNC_PAGE_SIZE: u32 = 100;

/// A client for the Plaid API.
///
/// Every request body carries the client ID and secret.
#[derive(Debug, Clone)]
pub struct PlaidClient {
    http: reqwest::Client,
    config: PlaidConfig,
}

/// Wraps a request body with the client credentials.
#[derive(Serialize)]
struct Authenticated<'a, T> {
    client_id: &'a str,
    secret: &'a str,
    #[serde(flatten)]
    body: T,
}

/// The error body returned with 4xx and 5xx responses.
#[derive(Debug, Deserialize)]
struct PlaidError {
    error_type: String,
    error_code: String,
    error_message: String,
}

impl PlaidClient {
    /// Create a client that sends requests with `http`.
    pub fn new(http: reqwest::Client, config: PlaidConfig) -> Self {
        Self { http, config }
    }

    async fn post<B, R>(&self, path: &str, body: B) -> Result<R, Error>
    where
        B: Serialize + Send,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.config.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(&Authenticated {
                client_id: &self.config.client_id,
                secret: &self.config.secret,
                body,
            })
            .send()
            .await
            .map_err(|error| Error::upstream(Service::Aggregation, error))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| Error::upstream(Service::Aggregation, error))?;

        parse_response(path, status, &bytes)
    }
}

fn parse_response<R: DeserializeOwned>(
    path: &str,
    status: StatusCode,
    bytes: &[u8],
) -> Result<R, Error> {
    if !status.is_success() {
        let message = match serde_json::from_slice::<PlaidError>(bytes) {
            Ok(error) => format!(
                "{path} returned {status}: {} {} {}",
                error.error_type, error.error_code, error.error_message
            ),
            Err(_) => format!("{path} returned {status}"),
        };

        return Err(Error::upstream(Service::Aggregation, message));
    }

    serde_json::from_slice(bytes).map_err(|error| {
        Error::upstream(
            Service::Aggregation,
            format!("could not parse the response from {path}: {error}"),
        )
    })
}

#[derive(Serialize)]
struct AccessTokenBody<'a> {
    access_token: &'a str,
}

#[derive(Deserialize)]
struct LinkTokenResponse {
    link_token: String,
}

#[derive(Deserialize)]
struct InstitutionResponse {
    institution: Institution,
}

#[derive(Deserialize)]
struct ProcessorTokenResponse {
    processor_token: String,
}

#[async_trait]
impl AggregationService for PlaidClient {
    async fn create_link_token(&self, request: &LinkTokenRequest) -> Result<String, Error> {
        #[derive(Serialize)]
        struct User<'a> {
            client_user_id: &'a str,
        }

        #[derive(Serialize)]
        struct Body<'a> {
            user: User<'a>,
            client_name: &'a str,
            products: &'a [String],
            language: &'a str,
            country_codes: &'a [String],
        }

        let response: LinkTokenResponse = self
            .post(
                "/link/token/create",
                Body {
                    user: User {
                        client_user_id: &request.client_user_id,
                    },
                    client_name: &request.client_name,
                    products: &request.products,
                    language: &request.language,
                    country_codes: &request.country_codes,
                },
            )
            .await?;

        Ok(response.link_token)
    }

    async fn exchange_public_token(
        &self,
        public_token: &str,
    ) -> Result<PublicTokenExchange, Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            public_token: &'a str,
        }

        self.post("/item/public_token/exchange", Body { public_token })
            .await
    }

    async fn get_accounts(&self, access_token: &str) -> Result<AccountsResponse, Error> {
        self.post("/accounts/get", AccessTokenBody { access_token })
            .await
    }

    async fn get_institution(
        &self,
        institution_id: &str,
        country_codes: &[String],
    ) -> Result<Institution, Error> {
        #[derive(Serialize)]
        struct Options {
            include_optional_metadata: bool,
        }

        #[derive(Serialize)]
        struct Body<'a> {
            institution_id: &'a str,
            country_codes: &'a [String],
            options: Options,
        }

        let response: InstitutionResponse = self
            .post(
                "/institutions/get_by_id",
                Body {
                    institution_id,
                    country_codes,
                    options: Options {
                        include_optional_metadata: true,
                    },
                },
            )
            .await?;

        Ok(response.institution)
    }

    async fn sync_transactions(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<SyncPage, Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            access_token: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            cursor: Option<&'a str>,
            count: u32,
        }

        self.post(
            "/transactions/sync",
            Body {
                access_token,
                cursor,
                count: SYNC_PAGE_SIZE,
            },
        )
        .await
    }

    async fn create_processor_token(
        &self,
        access_token: &str,
        account_id: &str,
        processor: &str,
    ) -> Result<String, Error> {
        #[derive(Serialize)]
        struct Body<'a> {
            access_token: &'a str,
            account_id: &'a str,
            processor: &'a str,
        }

        let response: ProcessorTokenResponse = self
            .post(
                "/processor/token/create",
                Body {
                    access_token,
                    account_id,
                    processor,
                },
            )
            .await?;

        Ok(response.processor_token)
    }
}
