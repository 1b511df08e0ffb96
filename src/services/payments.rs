//! The interface to the payments processor.

use async_trait::async_trait;

use crate::{Error, NewUser};

/// The parameters for registering a linked bank as a funding source.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingSourceRequest {
    /// The ID of the customer that owns the bank account.
    pub customer_id: String,
    /// The processor token minted by the aggregation service.
    pub processor_token: String,
    /// The name to give the funding source.
    pub bank_name: String,
}

/// The parameters for moving money between two funding sources.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    /// The URL of the funding source to take money from.
    pub source_funding_source_url: String,
    /// The URL of the funding source to send money to.
    pub destination_funding_source_url: String,
    /// The amount in US dollars, formatted with two decimal places.
    pub amount: String,
}

/// The payments processor that moves money between bank accounts.
#[async_trait]
pub trait PaymentsProcessor: Send + Sync {
    /// Create a personal customer and return the URL of the customer record.
    async fn create_customer(&self, customer: &NewUser) -> Result<String, Error>;

    /// Register a bank account as a funding source and return its URL.
    ///
    /// Returns `Ok(None)` if the processor accepted the request but did not
    /// report where the funding source was created.
    async fn add_funding_source(
        &self,
        request: &FundingSourceRequest,
    ) -> Result<Option<String>, Error>;

    /// Start a transfer and return the URL of the transfer record.
    async fn create_transfer(&self, request: &TransferRequest) -> Result<String, Error>;
}

/// Get the customer ID from the URL of a customer record, i.e. the last
/// path segment.
pub fn extract_customer_id_from_url(url: &str) -> &str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

#[cfg(test)]
mod extract_customer_id_tests {
    use super::extract_customer_id_from_url;

    #[test]
    fn returns_last_path_segment() {
        let url = "https://api-sandbox.dwolla.com/customers/FC451A7A-AE30-4404-AB95-E3553FCD733F";

        assert_eq!(
            extract_customer_id_from_url(url),
            "FC451A7A-AE30-4404-AB95-E3553FCD733F"
        );
    }

    #[test]
    fn ignores_trailing_slash() {
        assert_eq!(
            extract_customer_id_from_url("https://api.dwolla.com/customers/abc/"),
            "abc"
        );
    }

    #[test]
    fn returns_whole_string_without_slashes() {
        assert_eq!(extract_customer_id_from_url("abc"), "abc");
    }
}
