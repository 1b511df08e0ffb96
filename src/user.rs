//! The user profile stored in the document store and the document ID type
//! shared by all stored records.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// The maximum length of a document or account ID.
const MAX_ID_LENGTH: usize = 36;

/// A validated document ID.
///
/// IDs are 1 to 36 characters of ASCII letters, digits and underscores, and
/// must not start with an underscore. Validating IDs before they are used in
/// a query stops malformed input from reaching the document store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Validate `raw_id` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidDocumentId] if `raw_id` is empty, too long,
    /// contains characters other than `[A-Za-z0-9_]`, or starts with `_`.
    pub fn new(raw_id: &str) -> Result<Self, Error> {
        let is_valid = !raw_id.is_empty()
            && raw_id.len() <= MAX_ID_LENGTH
            && !raw_id.starts_with('_')
            && raw_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');

        if is_valid {
            Ok(Self(raw_id.to_owned()))
        } else {
            Err(Error::InvalidDocumentId(raw_id.to_owned()))
        }
    }

    /// Wrap an ID that came from a trusted source without validating it,
    /// e.g. an ID generated by the document store.
    pub fn new_unchecked(raw_id: &str) -> Self {
        Self(raw_id.to_owned())
    }

    /// The ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DocumentId::new(&value)
    }
}

impl From<DocumentId> for String {
    fn from(value: DocumentId) -> Self {
        value.0
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The ID of the user's profile document.
    pub id: DocumentId,
    /// The ID of the user's account in the identity service.
    pub user_id: DocumentId,
    /// The user's email address.
    pub email: String,
    /// The user's given name.
    pub first_name: String,
    /// The user's family name.
    pub last_name: String,
    /// The user's street address.
    pub address1: String,
    /// The user's city.
    pub city: String,
    /// The two letter abbreviation of the user's state, e.g. "NY".
    pub state: String,
    /// The user's postal code.
    pub postal_code: String,
    /// The user's date of birth as "YYYY-MM-DD".
    pub date_of_birth: String,
    /// The ID of the user's customer record in the payments processor.
    pub dwolla_customer_id: String,
    /// The URL of the user's customer record in the payments processor.
    pub dwolla_customer_url: String,
}

impl User {
    /// The user's first and last name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The profile details collected at sign-up, excluding the password.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    /// The user's given name.
    pub first_name: String,
    /// The user's family name.
    pub last_name: String,
    /// The user's street address.
    pub address1: String,
    /// The user's city.
    pub city: String,
    /// The two letter abbreviation of the user's state, e.g. "NY".
    pub state: String,
    /// The user's postal code.
    pub postal_code: String,
    /// The user's date of birth as "YYYY-MM-DD".
    pub date_of_birth: String,
    /// The last four digits of the user's social security number.
    ///
    /// Only forwarded to the payments processor, never stored.
    pub ssn: String,
    /// The user's email address.
    pub email: String,
}

/// Check that `email` looks like an email address and trim it.
///
/// # Errors
///
/// Returns [Error::InvalidField] if there is no local part before the `@` or
/// the domain has no dot.
pub fn validate_email(email: &str) -> Result<&str, Error> {
    let email = email.trim();

    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') =>
        {
            Ok(email)
        }
        _ => Err(Error::InvalidField(
            "email",
            format!("\"{email}\" is not a valid email address"),
        )),
    }
}
