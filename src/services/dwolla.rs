//! HTTP client for the Dwolla API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{
    Response,
    header::{ACCEPT, CONTENT_TYPE, LOCATION},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use crate::{
    Error, NewUser, Service,
    config::DwollaConfig,
    services::payments::{FundingSourceRequest, PaymentsProcessor, TransferRequest},
};

/// The media type Dwolla expects for request and response bodies.
const HAL_JSON: &str = "application/vnd.dwolla.v1.hal+json";

/// Renew the access token this long before it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// A client for the Dwolla API.
///
/// Requests are authorized with an application access token that is fetched
/// with the client credentials grant and reused until shortly before it
/// expires.
#[derive(Debug)]
pub struct DwollaClient {
    http: reqwest::Client,
    config: DwollaConfig,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct Link {
    href: String,
}

#[derive(Deserialize)]
struct OnDemandAuthorizationLinks {
    #[serde(rename = "self")]
    this: Link,
}

#[derive(Deserialize)]
struct OnDemandAuthorization {
    #[serde(rename = "_links")]
    links: OnDemandAuthorizationLinks,
}

/// The customer fields Dwolla needs to create a verified personal customer.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomerBody<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    #[serde(rename = "type")]
    customer_type: &'a str,
    address1: &'a str,
    city: &'a str,
    state: &'a str,
    postal_code: &'a str,
    date_of_birth: &'a str,
    ssn: &'a str,
}

impl<'a> From<&'a NewUser> for CustomerBody<'a> {
    fn from(user: &'a NewUser) -> Self {
        Self {
            first_name: &user.first_name,
            last_name: &user.last_name,
            email: &user.email,
            customer_type: "personal",
            address1: &user.address1,
            city: &user.city,
            state: &user.state,
            postal_code: &user.postal_code,
            date_of_birth: &user.date_of_birth,
            ssn: &user.ssn,
        }
    }
}

impl DwollaClient {
    /// Create a client that sends requests with `http`.
    pub fn new(http: reqwest::Client, config: DwollaConfig) -> Self {
        Self {
            http,
            config,
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, Error> {
        let mut token = self.token.lock().await;

        if let Some(cached) = token.as_ref()
            && cached.expires_at > Instant::now()
        {
            return Ok(cached.access_token.clone());
        }

        let response = self
            .http
            .post(format!("{}/token", self.config.base_url))
            .basic_auth(&self.config.key, Some(&self.config.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|error| Error::upstream(Service::Payments, error))?;
        let response = check_status(response, "/token").await?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|error| Error::upstream(Service::Payments, error))?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *token = Some(CachedToken {
            access_token: body.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(body.access_token)
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<Response, Error> {
        let url = if path.starts_with("https://") {
            path.to_owned()
        } else {
            format!("{}{}", self.config.base_url, path)
        };
        let access_token = self.access_token().await?;
        let body = serde_json::to_vec(body).map_err(|error| Error::upstream(Service::Payments, error))?;

        let response = self
            .http
            .post(url)
            .bearer_auth(access_token)
            .header(ACCEPT, HAL_JSON)
            .header(CONTENT_TYPE, HAL_JSON)
            .body(body)
            .send()
            .await
            .map_err(|error| Error::upstream(Service::Payments, error))?;

        check_status(response, path).await
    }
}

async fn check_status(response: Response, path: &str) -> Result<Response, Error> {
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();

    Err(Error::upstream(
        Service::Payments,
        format!("{path} returned {status}: {body}"),
    ))
}

fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn funding_source_body(request: &FundingSourceRequest, authorization_url: &str) -> serde_json::Value {
    json!({
        "_links": {
            "on-demand-authorization": { "href": authorization_url }
        },
        "name": request.bank_name,
        "plaidToken": request.processor_token,
    })
}

fn transfer_body(request: &TransferRequest) -> serde_json::Value {
    json!({
        "_links": {
            "source": { "href": request.source_funding_source_url },
            "destination": { "href": request.destination_funding_source_url },
        },
        "amount": {
            "currency": "USD",
            "value": request.amount,
        },
    })
}

#[async_trait]
impl PaymentsProcessor for DwollaClient {
    async fn create_customer(&self, customer: &NewUser) -> Result<String, Error> {
        let body = serde_json::to_value(CustomerBody::from(customer))
            .map_err(|error| Error::upstream(Service::Payments, error))?;
        let response = self.post("/customers", &body).await?;

        location(&response).ok_or_else(|| {
            Error::upstream(
                Service::Payments,
                "customer was created without a location header",
            )
        })
    }

    async fn add_funding_source(
        &self,
        request: &FundingSourceRequest,
    ) -> Result<Option<String>, Error> {
        let response = self
            .post("/on-demand-authorizations", &json!({}))
            .await?;
        let authorization: OnDemandAuthorization = response
            .json()
            .await
            .map_err(|error| Error::upstream(Service::Payments, error))?;

        let path = format!("/customers/{}/funding-sources", request.customer_id);
        let body = funding_source_body(request, &authorization.links.this.href);
        let response = self.post(&path, &body).await?;

        Ok(location(&response))
    }

    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, Error> {
        let response = self.post("/transfers", &transfer_body(request)).await?;

        location(&response).ok_or_else(|| {
            Error::upstream(
                Service::Payments,
                "transfer was created without a location header",
            )
        })
    }
}
