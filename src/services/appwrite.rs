//! HTTP client for the Appwrite REST API, used as both the identity service
//! and the document store.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    Bank, DocumentId, Error, NewBank, NewTransfer, Service, Transfer, User,
    config::AppwriteConfig,
    services::{
        documents::{DocumentStore, NewUserRecord},
        identity::{IdentityAccount, IdentityService, Session},
    },
};

/// Asks Appwrite to generate the ID of a new account or document.
const UNIQUE_ID: &str = "unique()";

const PROJECT_HEADER: &str = "X-Appwrite-Project";
const KEY_HEADER: &str = "X-Appwrite-Key";
const SESSION_HEADER: &str = "X-Appwrite-Session";

/// The number of documents requested per page when listing a collection.
const PAGE_SIZE: usize = 100;

/// A client for an Appwrite project.
///
/// Requests made on behalf of the server carry the API key. Requests made on
/// behalf of a user carry only their session secret.
#[derive(Debug, Clone)]
pub struct AppwriteClient {
    http: reqwest::Client,
    config: AppwriteConfig,
}

#[derive(Debug, Deserialize)]
struct AppwriteError {
    message: String,
    #[serde(rename = "type", default)]
    error_type: String,
}

#[derive(Deserialize)]
struct DocumentList<T> {
    documents: Vec<T>,
}

/// Just the ID of a listed document, used as the cursor for the next page.
#[derive(Deserialize)]
struct DocumentRef {
    #[serde(rename = "$id")]
    id: String,
}

#[derive(Deserialize)]
struct AccountResponse {
    #[serde(rename = "$id")]
    id: DocumentId,
    email: String,
    name: String,
}

impl From<AccountResponse> for IdentityAccount {
    fn from(account: AccountResponse) -> Self {
        Self {
            id: account.id,
            email: account.email,
            name: account.name,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    user_id: DocumentId,
    secret: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "$id", skip_serializing)]
    id: Option<DocumentId>,
    user_id: DocumentId,
    email: String,
    first_name: String,
    last_name: String,
    address1: String,
    city: String,
    state: String,
    postal_code: String,
    date_of_birth: String,
    dwolla_customer_id: String,
    dwolla_customer_url: String,
}

impl TryFrom<UserDocument> for User {
    type Error = Error;

    fn try_from(document: UserDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: document.id.ok_or_else(|| missing_field("$id"))?,
            user_id: document.user_id,
            email: document.email,
            first_name: document.first_name,
            last_name: document.last_name,
            address1: document.address1,
            city: document.city,
            state: document.state,
            postal_code: document.postal_code,
            date_of_birth: document.date_of_birth,
            dwolla_customer_id: document.dwolla_customer_id,
            dwolla_customer_url: document.dwolla_customer_url,
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct BankDocument {
    #[serde(rename = "$id", skip_serializing)]
    id: Option<DocumentId>,
    user_id: DocumentId,
    bank_id: String,
    account_id: String,
    access_token: String,
    funding_source_url: String,
    shareable_id: String,
}

impl From<&NewBank> for BankDocument {
    fn from(bank: &NewBank) -> Self {
        Self {
            id: None,
            user_id: bank.user_id.clone(),
            bank_id: bank.bank_id.clone(),
            account_id: bank.account_id.clone(),
            access_token: bank.access_token.clone(),
            funding_source_url: bank.funding_source_url.clone(),
            shareable_id: bank.shareable_id.clone(),
        }
    }
}

impl TryFrom<BankDocument> for Bank {
    type Error = Error;

    fn try_from(document: BankDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: document.id.ok_or_else(|| missing_field("$id"))?,
            user_id: document.user_id,
            bank_id: document.bank_id,
            account_id: document.account_id,
            access_token: document.access_token,
            funding_source_url: document.funding_source_url,
            shareable_id: document.shareable_id,
        })
    }
}

/// A transfer document. The amount is stored as a string attribute.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferDocument {
    #[serde(rename = "$id", skip_serializing)]
    id: Option<DocumentId>,
    #[serde(rename = "$createdAt", skip_serializing)]
    created_at: Option<String>,
    name: String,
    amount: String,
    channel: String,
    category: String,
    sender_id: DocumentId,
    sender_bank_id: DocumentId,
    receiver_id: DocumentId,
    receiver_bank_id: DocumentId,
    email: String,
}

impl From<&NewTransfer> for TransferDocument {
    fn from(transfer: &NewTransfer) -> Self {
        Self {
            id: None,
            created_at: None,
            name: transfer.name.clone(),
            amount: format!("{:.2}", transfer.amount),
            channel: transfer.channel.clone(),
            category: transfer.category.clone(),
            sender_id: transfer.sender_id.clone(),
            sender_bank_id: transfer.sender_bank_id.clone(),
            receiver_id: transfer.receiver_id.clone(),
            receiver_bank_id: transfer.receiver_bank_id.clone(),
            email: transfer.email.clone(),
        }
    }
}

impl TryFrom<TransferDocument> for Transfer {
    type Error = Error;

    fn try_from(document: TransferDocument) -> Result<Self, Self::Error> {
        let amount = document.amount.trim().parse().map_err(|_| {
            Error::upstream(
                Service::Documents,
                format!("transfer amount \"{}\" is not a number", document.amount),
            )
        })?;
        let created_at = document
            .created_at
            .as_deref()
            .ok_or_else(|| missing_field("$createdAt"))
            .and_then(|created_at| {
                OffsetDateTime::parse(created_at, &Rfc3339)
                    .map_err(|error| Error::upstream(Service::Documents, error))
            })?;

        Ok(Self {
            id: document.id.ok_or_else(|| missing_field("$id"))?,
            name: document.name,
            amount,
            channel: document.channel,
            category: document.category,
            sender_id: document.sender_id,
            sender_bank_id: document.sender_bank_id,
            receiver_id: document.receiver_id,
            receiver_bank_id: document.receiver_bank_id,
            email: document.email,
            created_at,
        })
    }
}

fn missing_field(field: &str) -> Error {
    Error::upstream(
        Service::Documents,
        format!("document is missing the field {field}"),
    )
}

/// Build an Appwrite query that matches documents whose `attribute` equals
/// `value`.
fn equal(attribute: &str, value: &str) -> String {
    json!({
        "method": "equal",
        "attribute": attribute,
        "values": [value],
    })
    .to_string()
}

/// The queries for one page of a listing: `queries`, a page size limit, and
/// the ID of the last document of the previous page if there is one.
fn page_queries(queries: &[String], cursor: Option<&str>) -> Vec<String> {
    let mut page = queries.to_vec();
    page.push(json!({ "method": "limit", "values": [PAGE_SIZE] }).to_string());

    if let Some(cursor) = cursor {
        page.push(json!({ "method": "cursorAfter", "values": [cursor] }).to_string());
    }

    page
}

/// Turn an Appwrite response into `R`, mapping 404 to [Error::NotFound] and
/// 401 to [Error::InvalidCredentials].
fn parse_response<R: DeserializeOwned>(
    service: Service,
    path: &str,
    status: StatusCode,
    bytes: &[u8],
) -> Result<R, Error> {
    match status {
        StatusCode::NOT_FOUND => return Err(Error::NotFound),
        StatusCode::UNAUTHORIZED => return Err(Error::InvalidCredentials),
        status if !status.is_success() => {
            let message = match serde_json::from_slice::<AppwriteError>(bytes) {
                Ok(error) => format!(
                    "{path} returned {status}: {} {}",
                    error.error_type, error.message
                ),
                Err(_) => format!("{path} returned {status}"),
            };

            return Err(Error::upstream(service, message));
        }
        _ => {}
    }

    serde_json::from_slice(bytes).map_err(|error| {
        Error::upstream(
            service,
            format!("could not parse the response from {path}: {error}"),
        )
    })
}

impl AppwriteClient {
    /// Create a client that sends requests with `http`.
    pub fn new(http: reqwest::Client, config: AppwriteConfig) -> Self {
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn documents_path(&self, collection_id: &str) -> String {
        format!(
            "/databases/{}/collections/{}/documents",
            self.config.database_id, collection_id
        )
    }

    /// A request made with the server's API key.
    fn server_request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(PROJECT_HEADER, &self.config.project_id)
            .header(KEY_HEADER, &self.config.api_key)
    }

    /// A request made on behalf of the user that owns `session_secret`.
    fn session_request(
        &self,
        method: reqwest::Method,
        path: &str,
        session_secret: &str,
    ) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .header(PROJECT_HEADER, &self.config.project_id)
            .header(SESSION_HEADER, session_secret)
    }

    async fn send(
        &self,
        service: Service,
        request: RequestBuilder,
    ) -> Result<(StatusCode, Vec<u8>), Error> {
        let response = request
            .send()
            .await
            .map_err(|error| Error::upstream(service, error))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| Error::upstream(service, error))?;

        Ok((status, bytes.to_vec()))
    }

    async fn create_document<T, R>(&self, collection_id: &str, data: &T) -> Result<R, Error>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let path = self.documents_path(collection_id);
        let request = self
            .server_request(reqwest::Method::POST, &path)
            .json(&json!({ "documentId": UNIQUE_ID, "data": data }));
        let (status, bytes) = self.send(Service::Documents, request).await?;

        parse_response(Service::Documents, &path, status, &bytes)
    }

    async fn get_document<R: DeserializeOwned>(
        &self,
        collection_id: &str,
        id: &DocumentId,
    ) -> Result<R, Error> {
        let path = format!("{}/{}", self.documents_path(collection_id), id);
        let request = self.server_request(reqwest::Method::GET, &path);
        let (status, bytes) = self.send(Service::Documents, request).await?;

        parse_response(Service::Documents, &path, status, &bytes)
    }

    /// List every document in a collection matching `queries`, following
    /// the cursor until a short page comes back.
    async fn list_documents<R: DeserializeOwned>(
        &self,
        collection_id: &str,
        queries: &[String],
    ) -> Result<Vec<R>, Error> {
        let path = self.documents_path(collection_id);
        let mut documents = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page_query = page_queries(queries, cursor.as_deref());
            let params: Vec<(&str, &str)> = page_query
                .iter()
                .map(|query| ("queries[]", query.as_str()))
                .collect();
            let request = self
                .server_request(reqwest::Method::GET, &path)
                .query(&params);
            let (status, bytes) = self.send(Service::Documents, request).await?;

            let page: DocumentList<R> = parse_response(Service::Documents, &path, status, &bytes)?;
            let refs: DocumentList<DocumentRef> =
                parse_response(Service::Documents, &path, status, &bytes)?;
            let page_len = page.documents.len();
            documents.extend(page.documents);

            match refs.documents.into_iter().last() {
                Some(last) if page_len == PAGE_SIZE => cursor = Some(last.id),
                _ => break,
            }
        }

        Ok(documents)
    }
}

#[async_trait]
impl IdentityService for AppwriteClient {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<IdentityAccount, Error> {
        let path = "/account";
        let request = self.server_request(reqwest::Method::POST, path).json(&json!({
            "userId": UNIQUE_ID,
            "email": email,
            "password": password,
            "name": name,
        }));
        let (status, bytes) = self.send(Service::Identity, request).await?;

        if status == StatusCode::CONFLICT {
            return Err(Error::DuplicateEmail(email.to_owned()));
        }

        let account: AccountResponse = parse_response(Service::Identity, path, status, &bytes)?;

        Ok(account.into())
    }

    async fn create_session(&self, email: &str, password: &str) -> Result<Session, Error> {
        let path = "/account/sessions/email";
        let request = self
            .server_request(reqwest::Method::POST, path)
            .json(&json!({ "email": email, "password": password }));
        let (status, bytes) = self.send(Service::Identity, request).await?;

        // Malformed emails are rejected with 400 instead of 401.
        if status == StatusCode::BAD_REQUEST {
            return Err(Error::InvalidCredentials);
        }

        let session: SessionResponse = parse_response(Service::Identity, path, status, &bytes)?;

        Ok(Session {
            user_id: session.user_id,
            secret: session.secret,
        })
    }

    async fn get_account(&self, session_secret: &str) -> Result<IdentityAccount, Error> {
        let path = "/account";
        let request = self.session_request(reqwest::Method::GET, path, session_secret);
        let (status, bytes) = self.send(Service::Identity, request).await?;
        let account: AccountResponse = parse_response(Service::Identity, path, status, &bytes)?;

        Ok(account.into())
    }

    async fn delete_session(&self, session_secret: &str) -> Result<(), Error> {
        let path = "/account/sessions/current";
        let request = self.session_request(reqwest::Method::DELETE, path, session_secret);
        let (status, bytes) = self.send(Service::Identity, request).await?;

        match status {
            StatusCode::NO_CONTENT => Ok(()),
            status => parse_response::<serde_json::Value>(Service::Identity, path, status, &bytes)
                .map(|_| ()),
        }
    }
}

#[async_trait]
impl DocumentStore for AppwriteClient {
    async fn create_user(&self, user: &NewUserRecord<'_>) -> Result<User, Error> {
        let details = user.details;
        let document = UserDocument {
            id: None,
            user_id: user.user_id.clone(),
            email: details.email.clone(),
            first_name: details.first_name.clone(),
            last_name: details.last_name.clone(),
            address1: details.address1.clone(),
            city: details.city.clone(),
            state: details.state.clone(),
            postal_code: details.postal_code.clone(),
            date_of_birth: details.date_of_birth.clone(),
            dwolla_customer_id: user.dwolla_customer_id.to_owned(),
            dwolla_customer_url: user.dwolla_customer_url.to_owned(),
        };

        let created: UserDocument = self
            .create_document(&self.config.user_collection_id, &document)
            .await?;

        created.try_into()
    }

    async fn get_user(&self, user_id: &DocumentId) -> Result<User, Error> {
        let documents: Vec<UserDocument> = self
            .list_documents(
                &self.config.user_collection_id,
                &[equal("userId", user_id.as_str())],
            )
            .await?;

        documents
            .into_iter()
            .next()
            .ok_or(Error::NotFound)?
            .try_into()
    }

    async fn create_bank(&self, bank: &NewBank) -> Result<Bank, Error> {
        let created: BankDocument = self
            .create_document(&self.config.bank_collection_id, &BankDocument::from(bank))
            .await?;

        created.try_into()
    }

    async fn get_banks(&self, user_id: &DocumentId) -> Result<Vec<Bank>, Error> {
        let documents: Vec<BankDocument> = self
            .list_documents(
                &self.config.bank_collection_id,
                &[equal("userId", user_id.as_str())],
            )
            .await?;

        documents.into_iter().map(Bank::try_from).collect()
    }

    async fn get_bank(&self, id: &DocumentId) -> Result<Bank, Error> {
        let document: BankDocument = self
            .get_document(&self.config.bank_collection_id, id)
            .await?;

        document.try_into()
    }

    async fn get_bank_by_account_id(&self, account_id: &str) -> Result<Bank, Error> {
        let documents: Vec<BankDocument> = self
            .list_documents(
                &self.config.bank_collection_id,
                &[equal("accountId", account_id)],
            )
            .await?;

        documents
            .into_iter()
            .next()
            .ok_or(Error::NotFound)?
            .try_into()
    }

    async fn create_transfer(&self, transfer: &NewTransfer) -> Result<Transfer, Error> {
        let created: TransferDocument = self
            .create_document(
                &self.config.transaction_collection_id,
                &TransferDocument::from(transfer),
            )
            .await?;

        created.try_into()
    }

    async fn get_transfers_by_bank(&self, bank_id: &DocumentId) -> Result<Vec<Transfer>, Error> {
        let collection_id = &self.config.transaction_collection_id;
        let sent_query = [equal("senderBankId", bank_id.as_str())];
        let received_query = [equal("receiverBankId", bank_id.as_str())];
        let (sent, received) = tokio::try_join!(
            self.list_documents::<TransferDocument>(collection_id, &sent_query),
            self.list_documents::<TransferDocument>(collection_id, &received_query),
        )?;

        let mut transfers: Vec<Transfer> = Vec::with_capacity(sent.len() + received.len());
        for document in sent.into_iter().chain(received) {
            let transfer = Transfer::try_from(document)?;

            // A transfer between two accounts of the same bank matches both queries.
            if !transfers.iter().any(|existing| existing.id == transfer.id) {
                transfers.push(transfer);
            }
        }

        Ok(transfers)
    }
}
