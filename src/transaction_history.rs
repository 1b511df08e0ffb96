//! The page that lists the transactions of one linked bank, a page at a time.
//!
//! Also defines the transaction table and bank tabs shared with the home page.

use axum::{
    Extension,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;
use time::{OffsetDateTime, macros::format_description};

use crate::{
    Account, AccountsSummary, AppState, Direction, Error, Transaction, User, endpoints,
    get_account, get_accounts,
    html::{LINK_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency},
    navigation::NavBar,
    pagination::{create_pagination_indicators, pagination_view},
};

/// The query string of pages that show a single bank.
#[derive(Debug, Default, Deserialize)]
pub struct BankQuery {
    /// The ID of the bank document. Defaults to the user's first bank.
    pub id: Option<String>,
    /// The page of transactions to show, starting from one.
    pub page: Option<u64>,
}

/// Pick the account to show: the one linked by the bank `requested_id`, or
/// the first account if no bank was requested.
///
/// # Errors
///
/// Returns [Error::NotFound] if `requested_id` is not one of the user's
/// banks, so users cannot view other users' banks by changing the URL.
pub(crate) fn select_account<'a>(
    requested_id: Option<&str>,
    summary: &'a AccountsSummary,
) -> Result<Option<&'a Account>, Error> {
    match requested_id {
        Some(id) => summary
            .accounts
            .iter()
            .find(|account| account.appwrite_item_id.as_str() == id)
            .map(Some)
            .ok_or(Error::NotFound),
        None => Ok(summary.accounts.first()),
    }
}

fn format_date(date: OffsetDateTime) -> String {
    date.format(format_description!("[month repr:short] [day], [year]"))
        .unwrap_or_else(|_| date.date().to_string())
}

fn transaction_row(transaction: &Transaction) -> Markup {
    let (amount, amount_style) = match transaction.direction {
        Direction::Debit => (
            format!("-{}", format_currency(transaction.amount.abs())),
            "text-red-600 dark:text-red-400",
        ),
        Direction::Credit => (
            format!("+{}", format_currency(transaction.amount.abs())),
            "text-green-600 dark:text-green-400",
        ),
    };
    let status = if transaction.pending { "Pending" } else { "Success" };

    html! {
        tr class=(TABLE_ROW_STYLE) data-direction=(transaction.direction.as_str())
        {
            th scope="row" class="px-6 py-4 font-medium text-gray-900 dark:text-white"
            {
                div class="flex items-center gap-3"
                {
                    @if let Some(image) = &transaction.image {
                        img src=(image) alt="" class="h-6 w-6 rounded-full";
                    }

                    span { (transaction.name) }
                }
            }
            td class={ "px-6 py-4 font-semibold " (amount_style) } { (amount) }
            td class=(TABLE_CELL_STYLE) { (status) }
            td class=(TABLE_CELL_STYLE) { (format_date(transaction.date)) }
            td class=(TABLE_CELL_STYLE) { (transaction.payment_channel) }
            td class=(TABLE_CELL_STYLE) { (transaction.category) }
        }
    }
}

/// A table of `transactions` with one row per transaction.
pub(crate) fn transactions_table(transactions: &[Transaction]) -> Markup {
    html! {
        @if transactions.is_empty() {
            p class="py-4 text-gray-500 dark:text-gray-400" { "No transactions yet." }
        } @else {
            div class="relative overflow-x-auto rounded-lg shadow"
            {
                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Transaction" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Channel" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        }
                    }

                    tbody
                    {
                        @for transaction in transactions {
                            (transaction_row(transaction))
                        }
                    }
                }
            }
        }
    }
}

/// One tab per account linking to `endpoint` for that account's bank.
pub(crate) fn bank_tabs(accounts: &[Account], selected: &Account, endpoint: &str) -> Markup {
    let tab_style = |is_selected: bool| {
        if is_selected {
            "inline-block px-4 py-2 border-b-2 border-blue-600 text-blue-600 \
            dark:text-blue-500 dark:border-blue-500"
        } else {
            "inline-block px-4 py-2 border-b-2 border-transparent \
            hover:text-gray-600 hover:border-gray-300 dark:hover:text-gray-300"
        }
    };

    html! {
        ul
            class="bank-tabs flex flex-wrap -mb-px text-sm font-medium text-center \
            text-gray-500 border-b border-gray-200 dark:text-gray-400 dark:border-gray-700"
        {
            @for account in accounts {
                @let is_selected = account.appwrite_item_id == selected.appwrite_item_id;
                li class="me-2"
                {
                    a
                        href=(endpoints::bank_endpoint(endpoint, &account.appwrite_item_id, None))
                        class=(tab_style(is_selected))
                        aria-current=[is_selected.then_some("page")]
                    {
                        (account.name)
                    }
                }
            }
        }
    }
}

/// Shown instead of bank data when the user has not linked a bank yet.
pub(crate) fn no_banks_view() -> Markup {
    html! {
        div class="no-banks py-8 text-gray-700 dark:text-gray-300"
        {
            p { "You have not linked any banks yet." }
            a href=(endpoints::CONNECT_BANK_VIEW) class=(LINK_STYLE) { "Connect a bank" }
        }
    }
}

fn transaction_history_view(content: Markup) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTION_HISTORY_VIEW).into_html();
    let content = html! {
        (nav_bar)

        main class="max-w-screen-xl mx-auto px-4 py-6 space-y-6 text-gray-900 dark:text-white"
        {
            header
            {
                h1 class="text-2xl font-semibold" { "Transaction History" }
                p class="text-gray-500 dark:text-gray-400"
                {
                    "See your bank details and transactions."
                }
            }

            (content)
        }
    };

    base("Transaction History", &[], &content)
}

/// Display the transactions of the bank in the `id` query parameter, or the
/// user's first bank.
///
/// Synced and transfer transactions are listed newest first, split into
/// pages of the configured size.
pub async fn get_transaction_history_page(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<BankQuery>,
) -> Result<Response, Error> {
    let services = &state.services;
    let summary = get_accounts(
        &user.id,
        services.documents.as_ref(),
        services.aggregator.as_ref(),
    )
    .await?;

    let Some(selected) = select_account(query.id.as_deref(), &summary)? else {
        return Ok(transaction_history_view(no_banks_view()).into_response());
    };

    let detail = get_account(
        selected.appwrite_item_id.as_str(),
        services.documents.as_ref(),
        services.aggregator.as_ref(),
    )
    .await?;

    let config = &state.pagination_config;
    let (current_page, page_count) = config.resolve_page(query.page, detail.transactions.len());
    let transactions = config.page_of(&detail.transactions, current_page);
    let indicators = create_pagination_indicators(current_page, page_count, config.max_pages);
    let bank_id = &detail.account.appwrite_item_id;

    let content = html! {
        (bank_tabs(&summary.accounts, selected, endpoints::TRANSACTION_HISTORY_VIEW))

        section
            class="account-detail flex flex-col gap-2 rounded-lg bg-blue-600 p-6 text-white \
            sm:flex-row sm:justify-between"
        {
            div
            {
                h2 class="text-xl font-bold" { (detail.account.name) }
                @if let Some(official_name) = &detail.account.official_name {
                    p class="text-sm" { (official_name) }
                }
                p class="text-sm tracking-widest" { "●●●● ●●●● ●●●● " (detail.account.mask) }
            }

            div class="text-right"
            {
                p class="text-sm" { "Current balance" }
                p class="current-balance text-2xl font-bold" {
                    (format_currency(detail.account.current_balance))
                }
            }
        }

        section class="space-y-4"
        {
            h2 class="text-lg font-semibold" { "Transactions" }
            (transactions_table(transactions))

            @if page_count > 1 {
                (pagination_view(&indicators, |page| {
                    endpoints::bank_endpoint(endpoints::TRANSACTION_HISTORY_VIEW, bank_id, Some(page))
                }))
            }
        }
    };

    Ok(transaction_history_view(content).into_response())
}
