//! The page that runs the bank linking widget and the endpoint that
//! finishes linking a bank with the widget's public token.

use axum::{
    Extension, Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{PreEscaped, html};
use serde::Deserialize;

use crate::{
    AppState, Error, User,
    alert::Alert,
    create_link_token, endpoints, exchange_public_token,
    html::{BUTTON_PRIMARY_STYLE, HeadElement, base, loading_spinner},
    navigation::NavBar,
};

/// The script that defines the `Plaid` global.
const LINK_SCRIPT_URL: &str = "https://cdn.plaid.com/link/v2/stable/link-initialize.js";

/// Opens the linking widget when the button is clicked and posts the public
/// token to the exchange endpoint once the user has linked a bank.
///
/// The link token is read from the button so it is escaped as an attribute.
fn link_script() -> HeadElement {
    let script = format!(
        r#"document.addEventListener('DOMContentLoaded', function() {{
            const button = document.getElementById('connect-bank-button');
            const handler = Plaid.create({{
                token: button.dataset.linkToken,
                onSuccess: function(publicToken) {{
                    htmx.ajax('POST', '{endpoint}', {{
                        source: button,
                        target: '#alert-container',
                        swap: 'outerHTML',
                        values: {{ public_token: publicToken }}
                    }});
                }}
            }});

            button.addEventListener('click', function() {{ handler.open(); }});
            button.disabled = false;
        }});"#,
        endpoint = endpoints::EXCHANGE_PUBLIC_TOKEN_API,
    );

    HeadElement::ScriptSource(PreEscaped(script))
}

/// Display the page for linking a new bank.
///
/// A fresh link token is created for every visit.
pub async fn get_connect_bank_page(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Response, Error> {
    let link_token = create_link_token(&user, state.services.aggregator.as_ref()).await?;

    let nav_bar = NavBar::new(endpoints::CONNECT_BANK_VIEW).into_html();
    let content = html! {
        (nav_bar)

        main class="max-w-md mx-auto px-4 py-12 space-y-6 text-gray-900 dark:text-white"
        {
            header
            {
                h1 class="text-2xl font-semibold" { "Connect a Bank" }
                p class="text-gray-500 dark:text-gray-400"
                {
                    "Link a bank account to see its balance and transactions \
                    and to send money from it."
                }
            }

            button
                id="connect-bank-button"
                type="button"
                class=(BUTTON_PRIMARY_STYLE)
                data-link-token=(link_token)
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                disabled
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Connect Bank"
            }
        }
    };

    let head_elements = [HeadElement::ScriptLink(LINK_SCRIPT_URL.to_owned()), link_script()];

    Ok(base("Connect Bank", &head_elements, &content).into_response())
}

/// The form the linking widget's success callback posts.
#[derive(Debug, Deserialize)]
pub struct ExchangeForm {
    /// The short-lived token the widget returns when a bank is linked.
    pub public_token: String,
}

/// Finish linking a bank and send the client back to the home page, which
/// then loads the new bank.
pub async fn post_exchange_public_token(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Form(form): Form<ExchangeForm>,
) -> Response {
    let public_token = form.public_token.trim();

    if public_token.is_empty() {
        return Alert::error("Could not link bank", "The linking widget did not return a token.")
            .into_response_with_status(StatusCode::BAD_REQUEST);
    }

    let services = &state.services;

    match exchange_public_token(
        public_token,
        &user,
        services.aggregator.as_ref(),
        services.payments.as_ref(),
        services.documents.as_ref(),
    )
    .await
    {
        Ok(_) => (HxRedirect(endpoints::HOME_VIEW.to_owned()), StatusCode::OK).into_response(),
        Err(Error::NoAccounts) => Alert::error(
            "No accounts found",
            "The bank you linked does not have any accounts. Try linking another bank.",
        )
        .into_response_with_status(StatusCode::UNPROCESSABLE_ENTITY),
        Err(error) => {
            tracing::error!("Could not link a bank for user {}: {error}", user.id);
            error.into_alert_response()
        }
    }
}


#[cfg(test)]
mod exchange_public_token_endpoint_tests {
    use axum::{Extension, Router, http::StatusCode, routing::post};
    use axum_test::TestServer;

    use crate::{
        AppState, PaginationConfig, User, endpoints,
        services::DocumentStore,
        test_utils::{FakeAggregator, FakePayments, TestBackend},
    };

    use super::post_exchange_public_token;

    fn get_test_server(
        backend: &TestBackend,
        aggregator: FakeAggregator,
        payments: FakePayments,
        user: User,
    ) -> TestServer {
        let state = AppState::new(
            "foobar",
            PaginationConfig::default(),
            backend.services(aggregator, payments),
        );
        let app = Router::new()
            .route(
                endpoints::EXCHANGE_PUBLIC_TOKEN_API,
                post(post_exchange_public_token),
            )
            .layer(Extension(user))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn linking_bank_redirects_home() {
        let backend = TestBackend::new();
        let user = backend.create_user("jane@example.com").await;
        let aggregator = FakeAggregator::new()
            .with_exchange("public-1", "access-1", "item-1")
            .with_item("access-1", "acc1", 100.0, "ins_1");
        let server = get_test_server(&backend, aggregator, FakePayments::default(), user.clone());

        let response = server
            .post(endpoints::EXCHANGE_PUBLIC_TOKEN_API)
            .form(&[("public_token", "public-1")])
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("hx-redirect"), endpoints::HOME_VIEW);
        let banks = backend.store.get_banks(&user.id).await.unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].account_id, "acc1");
    }

    #[tokio::test]
    async fn missing_funding_source_shows_alert() {
        let backend = TestBackend::new();
        let user = backend.create_user("jane@example.com").await;
        let aggregator = FakeAggregator::new()
            .with_exchange("public-1", "access-1", "item-1")
            .with_item("access-1", "acc1", 100.0, "ins_1");
        let server = get_test_server(
            &backend,
            aggregator,
            FakePayments::without_funding_source(),
            user.clone(),
        );

        let response = server
            .post(endpoints::EXCHANGE_PUBLIC_TOKEN_API)
            .form(&[("public_token", "public-1")])
            .await;

        response.assert_status(StatusCode::BAD_GATEWAY);
        assert!(response.text().contains("alert-container"));
        assert!(backend.store.get_banks(&user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let backend = TestBackend::new();
        let user = backend.create_user("jane@example.com").await;
        let server = get_test_server(
            &backend,
            FakeAggregator::new(),
            FakePayments::default(),
            user,
        );

        server
            .post(endpoints::EXCHANGE_PUBLIC_TOKEN_API)
            .form(&[("public_token", " ")])
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }
}
