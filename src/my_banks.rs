//! The page that lists every linked bank as a card.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    Account, AppState, Error, User, endpoints, get_accounts,
    html::{base, format_currency},
    navigation::NavBar,
    transaction_history::no_banks_view,
};

/// A card showing the name, masked number and balance of `account`.
///
/// The card links to the account's transaction history. If
/// `show_shareable_id` is set, the ID others use to send money to the
/// account is shown as well.
pub(crate) fn bank_card(account: &Account, show_shareable_id: bool) -> Markup {
    let history_url = endpoints::bank_endpoint(
        endpoints::TRANSACTION_HISTORY_VIEW,
        &account.appwrite_item_id,
        None,
    );

    html! {
        div class="bank-card flex flex-col gap-2"
        {
            a
                href=(history_url)
                class="flex flex-col justify-between min-h-[180px] rounded-xl p-5 text-white \
                shadow-lg bg-gradient-to-br from-blue-600 to-blue-800"
            {
                div
                {
                    h2 class="text-lg font-semibold" { (account.name) }
                    p class="account-balance text-xl font-bold" {
                        (format_currency(account.current_balance))
                    }
                }

                div class="flex justify-between text-sm"
                {
                    span { (account.subtype) }
                    span class="tracking-widest" { "●●●● " (account.mask) }
                }
            }

            @if show_shareable_id {
                div class="text-sm text-gray-600 dark:text-gray-300"
                {
                    label for={ "shareable-id-" (account.appwrite_item_id) } class="font-medium"
                    {
                        "Shareable ID"
                    }
                    input
                        id={ "shareable-id-" (account.appwrite_item_id) }
                        class="shareable-id block w-full mt-1 p-2 rounded text-xs \
                        bg-gray-100 dark:bg-gray-800 border border-gray-300 dark:border-gray-600"
                        type="text"
                        readonly
                        value=(account.shareable_id);
                }
            }
        }
    }
}

/// Display a card for each of the user's linked banks.
pub async fn get_my_banks_page(
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

    let nav_bar = NavBar::new(endpoints::MY_BANKS_VIEW).into_html();
    let content = html! {
        (nav_bar)

        main class="max-w-screen-xl mx-auto px-4 py-6 space-y-6 text-gray-900 dark:text-white"
        {
            header
            {
                h1 class="text-2xl font-semibold" { "My Bank Accounts" }
                p class="text-gray-500 dark:text-gray-400"
                {
                    "Effortlessly manage your banking activities. Share a bank's \
                    ID so others can send you money."
                }
            }

            @if summary.accounts.is_empty() {
                (no_banks_view())
            } @else {
                section class="grid grid-cols-1 md:grid-cols-2 xl:grid-cols-3 gap-6"
                {
                    @for account in &summary.accounts {
                        (bank_card(account, true))
                    }
                }
            }
        }
    };

    Ok(base("My Banks", &[], &content).into_response())
}

#[cfg(test)]
mod my_banks_page_tests {
    use axum::{Extension, Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use scraper::{Html, Selector};

    use crate::{
        AppState, PaginationConfig, User, endpoints,
        test_utils::{FakeAggregator, FakePayments, TestBackend, assert_valid_html},
    };

    use super::get_my_banks_page;

    fn get_test_server(backend: &TestBackend, aggregator: FakeAggregator, user: User) -> TestServer {
        let state = AppState::new(
            "foobar",
            PaginationConfig::default(),
            backend.services(aggregator, FakePayments::default()),
        );
        let app = Router::new()
            .route(endpoints::MY_BANKS_VIEW, get(get_my_banks_page))
            .layer(Extension(user))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn shows_card_per_bank_with_shareable_id() {
        let backend = TestBackend::new();
        let user = backend.create_user("jane@example.com").await;
        let first = backend.create_bank(&user, "acc1").await;
        let second = backend.create_bank(&user, "acc2").await;
        let aggregator = FakeAggregator::new()
            .with_item(&first.access_token, "acc1", 1250.25, "ins_1")
            .with_item(&second.access_token, "acc2", 10.0, "ins_2");
        let server = get_test_server(&backend, aggregator, user);

        let response = server.get(endpoints::MY_BANKS_VIEW).await;

        response.assert_status_ok();
        let html = Html::parse_document(&response.text());
        assert_valid_html(&html);
        let cards = html
            .select(&Selector::parse(".bank-card").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(cards.len(), 2);

        let shareable_ids = html
            .select(&Selector::parse("input.shareable-id").unwrap())
            .map(|input| input.value().attr("value"))
            .collect::<Vec<_>>();
        assert_eq!(
            shareable_ids,
            [
                Some(first.shareable_id.as_str()),
                Some(second.shareable_id.as_str())
            ]
        );

        let balance = cards[0]
            .select(&Selector::parse(".account-balance").unwrap())
            .next()
            .expect("No balance on card");
        assert_eq!(balance.text().collect::<String>().trim(), "$1,250.25");

        let link = cards[0]
            .select(&Selector::parse("a").unwrap())
            .next()
            .expect("No link on card");
        assert_eq!(
            link.value().attr("href"),
            Some(endpoints::bank_endpoint(endpoints::TRANSACTION_HISTORY_VIEW, &first.id, None).as_str())
        );
    }

    #[tokio::test]
    async fn no_banks_shows_connect_link() {
        let backend = TestBackend::new();
        let user = backend.create_user("jane@example.com").await;
        let server = get_test_server(&backend, FakeAggregator::new(), user);

        let response = server.get(endpoints::MY_BANKS_VIEW).await;

        response.assert_status_ok();
        let html = Html::parse_document(&response.text());
        assert_eq!(html.select(&Selector::parse(".bank-card").unwrap()).count(), 0);
        assert_eq!(html.select(&Selector::parse(".no-banks").unwrap()).count(), 1);
    }

    #[tokio::test]
    async fn failing_bank_shows_error_page() {
        let backend = TestBackend::new();
        let user = backend.create_user("jane@example.com").await;
        let bank = backend.create_bank(&user, "acc1").await;
        let aggregator = FakeAggregator::new().with_failing_token(&bank.access_token);
        let server = get_test_server(&backend, aggregator, user);

        server
            .get(endpoints::MY_BANKS_VIEW)
            .await
            .assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }
}
