//! The home page: a greeting, the total balance across all linked banks with
//! a doughnut chart of each bank's share, the recent transactions of one
//! bank and a sidebar with the user's profile and banks.

use axum::{
    Extension,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use charming::{
    Chart,
    component::Legend,
    element::{JsFunction, Tooltip, Trigger},
    series::Pie,
};
use maud::{Markup, PreEscaped, html};

use crate::{
    AccountDetail, AccountsSummary, AppState, Error, User, endpoints, get_account, get_accounts,
    html::{BUTTON_PRIMARY_STYLE, HeadElement, LINK_STYLE, base, format_currency},
    my_banks::bank_card,
    navigation::NavBar,
    transaction_history::{BankQuery, bank_tabs, no_banks_view, select_account, transactions_table},
};

/// The number of transactions shown in the recent transactions section.
const RECENT_TRANSACTION_COUNT: usize = 5;

/// The ID of the element the balance chart is drawn in.
const BALANCE_CHART_ID: &str = "balance-chart";

fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return currencyFormatter.format(number);",
    )
}

/// A doughnut chart of the current balance of each account.
fn balance_chart(summary: &AccountsSummary) -> Chart {
    let data = summary
        .accounts
        .iter()
        .map(|account| (account.current_balance, account.name.as_str()))
        .collect::<Vec<_>>();

    Chart::new()
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().show(false))
        .series(
            Pie::new()
                .name("Balance")
                .radius(vec!["60%", "80%"])
                .data(data),
        )
}

/// The script that draws `chart` into the element with the ID `chart_id`
/// once the page has loaded.
fn chart_script(chart_id: &str, chart: &Chart) -> HeadElement {
    let script = format!(
        r#"document.addEventListener('DOMContentLoaded', function() {{
            const chartDom = document.getElementById("{chart_id}");
            const chart = echarts.init(chartDom);
            chart.setOption({options});

            window.addEventListener('resize', chart.resize);

            const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
            const updateTheme = () => {{
                chart.setTheme(darkModeMediaQuery.matches ? 'dark' : 'default');
            }};
            darkModeMediaQuery.addEventListener('change', updateTheme);
            updateTheme();
        }});"#,
        options = chart
    );

    HeadElement::ScriptSource(PreEscaped(script))
}

fn total_balance_box(summary: &AccountsSummary) -> Markup {
    let bank_label = if summary.total_banks == 1 { "Bank Account" } else { "Bank Accounts" };

    html! {
        section
            id="total-balance"
            class="flex flex-col sm:flex-row items-center gap-6 rounded-xl border \
            border-gray-200 dark:border-gray-700 bg-white dark:bg-gray-800 p-6 shadow"
        {
            @if !summary.accounts.is_empty() {
                div id=(BALANCE_CHART_ID) class="h-40 w-40 shrink-0" {}
            }

            div class="flex flex-col gap-2"
            {
                h2 class="text-lg font-semibold" {
                    span class="total-banks" { (summary.total_banks) } " " (bank_label)
                }
                p class="text-sm text-gray-500 dark:text-gray-400" { "Total Current Balance" }
                p class="total-current-balance text-3xl font-bold" {
                    (format_currency(summary.total_current_balance))
                }
            }
        }
    }
}

fn recent_transactions_view(
    summary: &AccountsSummary,
    detail: &Result<AccountDetail, Error>,
) -> Markup {
    html! {
        section id="recent-transactions" class="space-y-4"
        {
            header class="flex items-center justify-between"
            {
                h2 class="text-xl font-semibold" { "Recent Transactions" }

                @if let Ok(detail) = detail {
                    a
                        href=(endpoints::bank_endpoint(
                            endpoints::TRANSACTION_HISTORY_VIEW,
                            &detail.account.appwrite_item_id,
                            None,
                        ))
                        class=(LINK_STYLE)
                    {
                        "View all"
                    }
                }
            }

            @match detail {
                Ok(detail) => {
                    (bank_tabs(&summary.accounts, &detail.account, endpoints::HOME_VIEW))
                    (transactions_table(
                        &detail.transactions[..detail.transactions.len().min(RECENT_TRANSACTION_COUNT)]
                    ))
                }
                Err(_) => {
                    p class="load-error text-red-600 dark:text-red-400"
                    {
                        "Could not load the transactions of this bank. Please try again later."
                    }
                }
            }
        }
    }
}

fn right_sidebar(user: &User, summary: Option<&AccountsSummary>) -> Markup {
    let initial = user.first_name.chars().next().unwrap_or('?');

    html! {
        aside id="right-sidebar" class="flex flex-col gap-6 lg:w-80 shrink-0"
        {
            section class="profile flex flex-col items-center gap-2 rounded-xl \
                bg-white dark:bg-gray-800 p-6 shadow"
            {
                div class="flex h-20 w-20 items-center justify-center rounded-full bg-gray-100 \
                    dark:bg-gray-700"
                {
                    span class="profile-initial text-5xl font-bold text-blue-500" { (initial) }
                }
                h2 class="text-lg font-semibold" { (user.full_name()) }
                p class="text-sm text-gray-500 dark:text-gray-400" { (user.email) }
            }

            section class="flex flex-col gap-4"
            {
                header class="flex items-center justify-between"
                {
                    h2 class="text-lg font-semibold" { "My Banks" }
                    a href=(endpoints::CONNECT_BANK_VIEW) class=(LINK_STYLE) { "+ Add Bank" }
                }

                @if let Some(summary) = summary {
                    @for account in &summary.accounts {
                        (bank_card(account, false))
                    }
                }
            }
        }
    }
}

fn accounts_error_view() -> Markup {
    html! {
        section class="load-error rounded-xl border border-red-300 bg-red-50 p-6 text-red-800 \
            dark:border-red-800 dark:bg-gray-800 dark:text-red-400"
        {
            h2 class="font-semibold" { "Could not load your accounts" }
            p { "One of your banks is not responding right now. Please try again later." }
        }
    }
}

/// Display the home page.
///
/// The recent transactions are those of the bank in the `id` query
/// parameter, or the user's first bank. If the accounts cannot be loaded the
/// page is still shown, with a message in place of the balances.
pub async fn get_home_page(
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
    .await
    .inspect_err(|error| tracing::error!("Could not load home page accounts: {error}"));

    let mut head_elements = Vec::new();

    let main_content = match &summary {
        Ok(summary) => {
            let detail = match select_account(query.id.as_deref(), summary)? {
                Some(selected) => Some(
                    get_account(
                        selected.appwrite_item_id.as_str(),
                        services.documents.as_ref(),
                        services.aggregator.as_ref(),
                    )
                    .await,
                ),
                None => None,
            };

            if !summary.accounts.is_empty() {
                head_elements.push(HeadElement::ScriptLink(
                    "/static/echarts.6.0.0.min.js".to_owned(),
                ));
                head_elements.push(chart_script(BALANCE_CHART_ID, &balance_chart(summary)));
            }

            html! {
                (total_balance_box(summary))

                @match &detail {
                    Some(detail) => (recent_transactions_view(summary, detail)),
                    None => {
                        (no_banks_view())
                        a href=(endpoints::CONNECT_BANK_VIEW) class={ "block max-w-xs " (BUTTON_PRIMARY_STYLE) }
                        {
                            "Connect Bank"
                        }
                    }
                }
            }
        }
        Err(_) => accounts_error_view(),
    };

    let nav_bar = NavBar::new(endpoints::HOME_VIEW).into_html();
    let content = html! {
        (nav_bar)

        div class="max-w-screen-xl mx-auto flex flex-col lg:flex-row gap-8 px-4 py-6 \
            text-gray-900 dark:text-white"
        {
            main class="flex-1 flex flex-col gap-6"
            {
                header
                {
                    h1 class="greeting text-3xl font-semibold"
                    {
                        "Welcome, "
                        span class="text-blue-600 dark:text-blue-500" { (user.first_name) }
                    }
                    p class="text-gray-500 dark:text-gray-400"
                    {
                        "Access and manage your account and transactions efficiently."
                    }
                }

                (main_content)
            }

            (right_sidebar(&user, summary.as_ref().ok()))
        }
    };

    Ok(base("Home", &head_elements, &content).into_response())
}
