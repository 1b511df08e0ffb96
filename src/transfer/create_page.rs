//! Defines the page with the form for sending money to another user.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    AccountsSummary, AppState, Error, User, endpoints, get_accounts,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, dollar_input_styles,
        format_currency, loading_spinner,
    },
    navigation::NavBar,
    transaction_history::no_banks_view,
};

fn transfer_form(summary: &AccountsSummary) -> Markup {
    html! {
        form
            hx-post=(endpoints::TRANSFERS_API)
            hx-target="#alert-container"
            hx-target-error="#alert-container"
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            div
            {
                label for="source_bank_id" class=(FORM_LABEL_STYLE) { "Select Source Bank" }
                select id="source_bank_id" name="source_bank_id" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for account in &summary.accounts {
                        option value=(account.appwrite_item_id)
                        {
                            (account.name) " (" (format_currency(account.current_balance)) ")"
                        }
                    }
                }
            }

            div
            {
                label for="note" class=(FORM_LABEL_STYLE) { "Transfer Note (Optional)" }
                textarea
                    id="note"
                    name="note"
                    rows="3"
                    placeholder="Write a short note here"
                    class=(FORM_TEXT_INPUT_STYLE)
                {}
            }

            h2 class="text-lg font-semibold" { "Bank account details" }

            div
            {
                label for="email" class=(FORM_LABEL_STYLE) { "Recipient's Email Address" }
                input
                    id="email"
                    name="email"
                    type="email"
                    placeholder="john@example.com"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="shareable_id" class=(FORM_LABEL_STYLE) { "Receiver's Shareable ID" }
                input
                    id="shareable_id"
                    name="shareable_id"
                    type="text"
                    placeholder="Enter the shareable ID"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }
                div class="input-wrapper w-full"
                {
                    input
                        id="amount"
                        name="amount"
                        type="number"
                        step="0.01"
                        min="0.01"
                        placeholder="0.00"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Transfer Funds"
            }
        }
    }
}

/// Display the form for sending money from one of the user's banks.
pub async fn get_payment_transfer_page(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Response, Error> {
    let services = &state.services;
    let summary = get_accounts(
        &user.id,
        services.documents.as_ref(),
        services.aggregator.as_ref(),
    )
    .await?;

    let nav_bar = NavBar::new(endpoints::PAYMENT_TRANSFER_VIEW).into_html();
    let content = html! {
        (nav_bar)

        main class="max-w-xl mx-auto px-4 py-6 space-y-6 text-gray-900 dark:text-white"
        {
            header
            {
                h1 class="text-2xl font-semibold" { "Payment Transfer" }
                p class="text-gray-500 dark:text-gray-400"
                {
                    "Please provide any specific details or notes related to the payment transfer."
                }
            }

            @if summary.accounts.is_empty() {
                (no_banks_view())
            } @else {
                (transfer_form(&summary))
            }
        }
    };

    Ok(base("Payment Transfer", &[dollar_input_styles()], &content).into_response())
}
