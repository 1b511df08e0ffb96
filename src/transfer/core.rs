use time::OffsetDateTime;

use crate::{
    DocumentId, Error, User, decrypt_id,
    services::{DocumentStore, PaymentsProcessor, TransferRequest},
    user::validate_email,
};

/// The payment channel recorded for transfers made in the app.
pub const TRANSFER_CHANNEL: &str = "online";
/// The category recorded for transfers made in the app.
pub const TRANSFER_CATEGORY: &str = "Transfer";

/// A transfer between two linked banks that was made in the app.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    /// The ID of the transfer document.
    pub id: DocumentId,
    /// The note the sender gave the transfer.
    pub name: String,
    /// The amount in US dollars.
    pub amount: f64,
    /// The payment channel, always [TRANSFER_CHANNEL].
    pub channel: String,
    /// The category, always [TRANSFER_CATEGORY].
    pub category: String,
    /// The profile ID of the user that sent the money.
    pub sender_id: DocumentId,
    /// The bank the money was taken from.
    pub sender_bank_id: DocumentId,
    /// The profile ID of the user that received the money.
    pub receiver_id: DocumentId,
    /// The bank the money was sent to.
    pub receiver_bank_id: DocumentId,
    /// The recipient's email address.
    pub email: String,
    /// When the transfer was recorded.
    pub created_at: OffsetDateTime,
}

/// The data needed to record a [Transfer].
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    /// The note the sender gave the transfer.
    pub name: String,
    /// The amount in US dollars.
    pub amount: f64,
    /// The payment channel.
    pub channel: String,
    /// The category.
    pub category: String,
    /// The profile ID of the user that sent the money.
    pub sender_id: DocumentId,
    /// The bank the money was taken from.
    pub sender_bank_id: DocumentId,
    /// The profile ID of the user that received the money.
    pub receiver_id: DocumentId,
    /// The bank the money was sent to.
    pub receiver_bank_id: DocumentId,
    /// The recipient's email address.
    pub email: String,
}

/// The raw values from the transfer form.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferDetails {
    /// The document ID of the sender's bank.
    pub source_bank_id: String,
    /// The recipient's shareable ID.
    pub shareable_id: String,
    /// The amount as typed by the user.
    pub amount: String,
    /// The recipient's email address.
    pub email: String,
    /// An optional note for the transfer.
    pub note: String,
}

/// Parse a dollar amount written as plain digits with an optional one or
/// two digit fraction, e.g. `12` or `12.50`, that must be positive.
///
/// # Errors
///
/// Returns [Error::InvalidField] if the amount is not in that format or is
/// zero.
pub fn parse_amount(raw_amount: &str) -> Result<f64, Error> {
    let raw_amount = raw_amount.trim();
    let invalid = |reason: &str| Error::InvalidField("amount", reason.to_owned());

    let (dollars, cents) = match raw_amount.split_once('.') {
        Some((dollars, cents)) => (dollars, Some(cents)),
        None => (raw_amount, None),
    };
    let is_digits = |text: &str| !text.is_empty() && text.bytes().all(|byte| byte.is_ascii_digit());

    if !is_digits(dollars) || cents.is_some_and(|cents| !is_digits(cents)) {
        return Err(invalid("the amount must be a number, e.g. 12.50"));
    }

    if cents.is_some_and(|cents| cents.len() > 2) {
        return Err(invalid("the amount cannot have more than two decimal places"));
    }

    let amount: f64 = raw_amount
        .parse()
        .map_err(|_| invalid("the amount must be a number, e.g. 12.50"))?;

    if amount <= 0.0 {
        return Err(invalid("the amount must be greater than zero"));
    }

    Ok(amount)
}

/// Send money from one of `sender`'s banks to the bank identified by a
/// shareable ID, then record the transfer.
///
/// The transfer is only recorded once the payments processor has accepted
/// it.
///
/// # Errors
///
/// Returns an error if:
/// - the amount or email is invalid,
/// - the source bank does not exist or does not belong to `sender`,
/// - the shareable ID is malformed or no bank is linked to it,
/// - the payments processor or document store fails.
pub async fn transfer_funds(
    sender: &User,
    details: &TransferDetails,
    payments: &dyn PaymentsProcessor,
    documents: &dyn DocumentStore,
) -> Result<Transfer, Error> {
    let amount = parse_amount(&details.amount)?;
    let email = validate_email(&details.email)?;
    let source_bank_id = DocumentId::new(details.source_bank_id.trim())?;
    let receiver_account_id = decrypt_id(&details.shareable_id)?;

    let sender_bank = documents.get_bank(&source_bank_id).await?;
    if sender_bank.user_id != sender.id {
        tracing::warn!(
            "User {} tried to transfer from bank {} which they do not own",
            sender.id,
            sender_bank.id
        );
        return Err(Error::BankOwnership);
    }

    let receiver_bank = documents
        .get_bank_by_account_id(&receiver_account_id)
        .await?;

    let transfer_url = payments
        .create_transfer(&TransferRequest {
            source_funding_source_url: sender_bank.funding_source_url.clone(),
            destination_funding_source_url: receiver_bank.funding_source_url.clone(),
            amount: format!("{amount:.2}"),
        })
        .await?;
    tracing::info!("Created transfer {transfer_url}");

    let note = details.note.trim();
    let name = if note.is_empty() {
        "Transfer".to_owned()
    } else {
        note.to_owned()
    };

    documents
        .create_transfer(&NewTransfer {
            name,
            amount,
            channel: TRANSFER_CHANNEL.to_owned(),
            category: TRANSFER_CATEGORY.to_owned(),
            sender_id: sender.id.clone(),
            sender_bank_id: sender_bank.id,
            receiver_id: receiver_bank.user_id,
            receiver_bank_id: receiver_bank.id,
            email: email.to_owned(),
        })
        .await
}
