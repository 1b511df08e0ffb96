//! Defines the endpoint that sends a transfer.

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use serde::Deserialize;

use crate::{
    AppState, User,
    alert::Alert,
    html::format_currency,
    transfer::core::{TransferDetails, transfer_funds},
};

/// The form data for sending a transfer.
#[derive(Debug, Deserialize)]
pub struct TransferForm {
    /// The document ID of the bank to take the money from.
    pub source_bank_id: String,
    /// The recipient's shareable ID.
    pub shareable_id: String,
    /// The amount in dollars.
    pub amount: String,
    /// The recipient's email address.
    pub email: String,
    /// An optional note for the transfer.
    pub note: Option<String>,
}

impl From<TransferForm> for TransferDetails {
    fn from(form: TransferForm) -> Self {
        TransferDetails {
            source_bank_id: form.source_bank_id,
            shareable_id: form.shareable_id,
            amount: form.amount,
            email: form.email,
            note: form.note.unwrap_or_default(),
        }
    }
}

/// A route handler for sending a transfer, responds with an alert saying
/// whether the transfer was sent.
pub async fn create_transfer_endpoint(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Form(form): Form<TransferForm>,
) -> Response {
    let details = TransferDetails::from(form);
    let services = &state.services;

    match transfer_funds(
        &user,
        &details,
        services.payments.as_ref(),
        services.documents.as_ref(),
    )
    .await
    {
        Ok(transfer) => {
            tracing::info!(
                "User {} sent {} from bank {} to bank {}",
                user.id,
                transfer.amount,
                transfer.sender_bank_id,
                transfer.receiver_bank_id
            );

            let details = format!(
                "{} was sent to {}.",
                format_currency(transfer.amount),
                transfer.email
            );
            Alert::success("Transfer sent", &details).into_response_with_status(StatusCode::OK)
        }
        Err(error) => error.into_alert_response(),
    }
}
