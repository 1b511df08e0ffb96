//! The sign-in page and the handler that starts a session.

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    Error, Services,
    auth::{cookie::set_session_cookie, redirect::parse_redirect_url},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, LINK_STYLE, base, loading_spinner, log_in_register, password_input,
        text_input,
    },
};

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect email or password.";

fn sign_in_form(email: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::SIGN_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (text_input("email", "Email", "email", email, "jane@example.com"))
            (password_input("", 0, error_message))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Sign in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                a href=(endpoints::SIGN_UP_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Sign up"
                }
            }
        }
    }
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// Display the sign-in page.
pub async fn get_sign_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "sign-in query");
    let form = sign_in_form("", None, redirect_url.as_deref());
    let content = log_in_register("Sign in to your account", &form);

    base("Sign In", &[], &content).into_response()
}

/// The raw data entered by the user in the sign-in form.
#[derive(Clone, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    /// Optional URL to redirect to after signing in.
    pub redirect_url: Option<String>,
}

/// Handler for sign-in requests via the POST method.
///
/// On success the session cookie is set and the client is redirected to
/// the requested page or the home page. Otherwise, the form is returned
/// with an error message explaining the problem.
pub async fn post_sign_in(
    State(services): State<Services>,
    jar: PrivateCookieJar,
    Form(form): Form<SignInForm>,
) -> Response {
    let redirect_url = parse_redirect_url(form.redirect_url.as_deref(), "sign-in form");
    let redirect_url = redirect_url.as_deref();
    let email = form.email.trim();

    let session = match services.identity.create_session(email, &form.password).await {
        Ok(session) => session,
        Err(Error::InvalidCredentials) => {
            return sign_in_form(email, Some(INVALID_CREDENTIALS_ERROR_MSG), redirect_url)
                .into_response();
        }
        Err(error) => {
            tracing::error!("Unhandled error while signing in: {error}");
            return sign_in_form(
                email,
                Some("An internal error occurred. Please try again later."),
                redirect_url,
            )
            .into_response();
        }
    };

    tracing::info!("User {} signed in", session.user_id);

    (
        StatusCode::SEE_OTHER,
        HxRedirect(redirect_url.unwrap_or(endpoints::HOME_VIEW).to_owned()),
        set_session_cookie(jar, &session.secret),
    )
        .into_response()
}


#[cfg(test)]
mod sign_in_tests {
    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::TestServer;

    use crate::{
        AppState, PaginationConfig,
        auth::COOKIE_SESSION,
        endpoints,
        test_utils::{FakeAggregator, FakePayments, TEST_PASSWORD, TestBackend},
    };

    use super::{INVALID_CREDENTIALS_ERROR_MSG, post_sign_in};

    fn get_test_server(backend: &TestBackend) -> TestServer {
        let state = AppState::new(
            "foobar",
            PaginationConfig::default(),
            backend.services(FakeAggregator::new(), FakePayments::default()),
        );
        let app = Router::new()
            .route(endpoints::SIGN_IN_API, post(post_sign_in))
            .with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn sign_in_succeeds_with_valid_credentials() {
        let backend = TestBackend::new();
        backend.create_user("jane@example.com").await;
        let server = get_test_server(&backend);

        let response = server
            .post(endpoints::SIGN_IN_API)
            .form(&[("email", "jane@example.com"), ("password", TEST_PASSWORD)])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("hx-redirect"), endpoints::HOME_VIEW);
        let cookie = response.cookie(COOKIE_SESSION);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[tokio::test]
    async fn sign_in_redirects_to_requested_url() {
        let backend = TestBackend::new();
        backend.create_user("jane@example.com").await;
        let server = get_test_server(&backend);

        let response = server
            .post(endpoints::SIGN_IN_API)
            .form(&[
                ("email", "jane@example.com"),
                ("password", TEST_PASSWORD),
                ("redirect_url", "/my-banks"),
            ])
            .await;

        assert_eq!(response.header("hx-redirect"), endpoints::MY_BANKS_VIEW);
    }

    #[tokio::test]
    async fn sign_in_falls_back_on_external_redirect_url() {
        let backend = TestBackend::new();
        backend.create_user("jane@example.com").await;
        let server = get_test_server(&backend);

        let response = server
            .post(endpoints::SIGN_IN_API)
            .form(&[
                ("email", "jane@example.com"),
                ("password", TEST_PASSWORD),
                ("redirect_url", "https://example.com"),
            ])
            .await;

        assert_eq!(response.header("hx-redirect"), endpoints::HOME_VIEW);
    }

    #[tokio::test]
    async fn sign_in_fails_with_incorrect_password() {
        let backend = TestBackend::new();
        backend.create_user("jane@example.com").await;
        let server = get_test_server(&backend);

        let response = server
            .post(endpoints::SIGN_IN_API)
            .form(&[("email", "jane@example.com"), ("password", "wrongpassword")])
            .await;

        response.assert_status_ok();
        assert!(response.maybe_cookie(COOKIE_SESSION).is_none());
        assert!(response.text().contains(INVALID_CREDENTIALS_ERROR_MSG));
    }

    #[tokio::test]
    async fn sign_in_fails_with_missing_fields() {
        let backend = TestBackend::new();
        let server = get_test_server(&backend);

        server
            .post(endpoints::SIGN_IN_API)
            .content_type("application/x-www-form-urlencoded")
            .await
            .assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}
