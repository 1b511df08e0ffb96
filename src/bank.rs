//! Linked bank records and the shareable IDs derived from them.

use base64::Engine as _;

use crate::{DocumentId, Error};

/// A bank account that a user has linked through the aggregation service.
///
/// One record is created per successful link and is never updated.
#[derive(Debug, Clone, PartialEq)]
pub struct Bank {
    /// The ID of the bank document.
    pub id: DocumentId,
    /// The ID of the profile document of the user that owns the bank.
    pub user_id: DocumentId,
    /// The aggregation service's item ID.
    pub bank_id: String,
    /// The aggregation service's ID for the linked account.
    pub account_id: String,
    /// The durable token for reading the item from the aggregation service.
    ///
    /// This is a secret and must never be rendered.
    pub access_token: String,
    /// The payments processor's URL for the account's funding source.
    pub funding_source_url: String,
    /// The encoded account ID that the user can give to people who want to
    /// send them money.
    pub shareable_id: String,
}

/// The data needed to create a [Bank] record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBank {
    /// The ID of the profile document of the user that owns the bank.
    pub user_id: DocumentId,
    /// The aggregation service's item ID.
    pub bank_id: String,
    /// The aggregation service's ID for the linked account.
    pub account_id: String,
    /// The durable token for reading the item from the aggregation service.
    pub access_token: String,
    /// The payments processor's URL for the account's funding source.
    pub funding_source_url: String,
    /// The encoded account ID.
    pub shareable_id: String,
}

/// Encode an account ID as a shareable ID.
pub fn encrypt_id(account_id: &str) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(account_id)
}

/// Decode a shareable ID back into the account ID.
///
/// # Errors
///
/// Returns [Error::InvalidShareableId] if `shareable_id` is not valid base64
/// or does not decode to UTF-8 text.
pub fn decrypt_id(shareable_id: &str) -> Result<String, Error> {
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(shareable_id.trim())
        .map_err(|_| Error::InvalidShareableId)?;

    String::from_utf8(bytes).map_err(|_| Error::InvalidShareableId)
}

#[cfg(test)]
mod shareable_id_tests {
    use crate::Error;

    use super::{decrypt_id, encrypt_id};

    #[test]
    fn decrypt_recovers_account_id() {
        let account_id = "BxBXxLj1m4HMXBm9WZZmCWVbPjX16EHwv99vp";

        let shareable_id = encrypt_id(account_id);

        assert_ne!(shareable_id, account_id);
        assert_eq!(decrypt_id(&shareable_id), Ok(account_id.to_owned()));
    }

    #[test]
    fn shareable_id_is_url_safe() {
        let shareable_id = encrypt_id("??>>~~");

        assert!(
            shareable_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "got {shareable_id}"
        );
    }

    #[test]
    fn decrypt_ignores_surrounding_whitespace() {
        let shareable_id = format!("  {}\n", encrypt_id("acc_1"));

        assert_eq!(decrypt_id(&shareable_id), Ok("acc_1".to_owned()));
    }

    #[test]
    fn decrypt_rejects_garbage() {
        assert_eq!(decrypt_id("not base64!"), Err(Error::InvalidShareableId));
    }
}
