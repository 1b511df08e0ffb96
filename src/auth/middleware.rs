//! Authentication middleware that resolves the session cookie to the
//! logged-in user and redirects to the sign-in page otherwise.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;

use crate::{
    AppState, Error, User,
    auth::{
        cookie::get_session_secret,
        redirect::{build_sign_in_redirect_url, build_sign_in_redirect_url_from_target},
    },
    endpoints,
    services::{DocumentStore, IdentityService},
};

/// Get the profile of the user that `session_secret` belongs to.
///
/// # Errors
///
/// Returns:
/// - [Error::InvalidCredentials] if the session is unknown or expired,
/// - [Error::NotFound] if the account has no profile document,
/// - an upstream error if either service fails.
pub async fn get_logged_in_user(
    session_secret: &str,
    identity: &dyn IdentityService,
    documents: &dyn DocumentStore,
) -> Result<User, Error> {
    let account = identity.get_account(session_secret).await?;

    documents.get_user(&account.id).await
}

/// Middleware function that checks for a valid session cookie.
/// The user is placed into the request and then the request executed
/// normally if the session is valid, otherwise the response from
/// `get_redirect` is returned.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(user): Extension<User>` to receive the logged-in user.
#[inline]
async fn auth_guard_internal(
    state: AppState,
    request: Request,
    next: Next,
    get_redirect: impl Fn(&str) -> Response,
) -> Response {
    let sign_in_redirect_url = build_sign_in_redirect_url(&request).unwrap_or_else(|| {
        if request.uri().path().starts_with("/api") {
            tracing::warn!(
                "Missing or invalid HTMX headers for /api request. Falling back to home page."
            );
        } else {
            tracing::warn!("Invalid redirect URL from request URI. Falling back to home page.");
        }

        build_sign_in_redirect_url_from_target(endpoints::HOME_VIEW)
            .unwrap_or_else(|| endpoints::SIGN_IN_VIEW.to_owned())
    });

    let (mut parts, body) = request.into_parts();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to sign in page.");
            return get_redirect(&sign_in_redirect_url);
        }
    };
    let Ok(session_secret) = get_session_secret(&jar) else {
        return get_redirect(&sign_in_redirect_url);
    };

    let services = &state.services;
    let user = match get_logged_in_user(
        &session_secret,
        services.identity.as_ref(),
        services.documents.as_ref(),
    )
    .await
    {
        Ok(user) => user,
        Err(Error::InvalidCredentials) => return get_redirect(&sign_in_redirect_url),
        Err(error) => {
            tracing::error!("Could not get the logged in user: {error}");
            return get_redirect(&sign_in_redirect_url);
        }
    };

    parts.extensions.insert(user);
    next.run(Request::from_parts(parts, body)).await
}

/// Middleware function that checks for a valid session cookie.
/// The user is placed into the request and then the request executed
/// normally if the session is valid, otherwise a redirect to the sign-in
/// page is returned.
pub async fn auth_guard(State(state): State<AppState>, request: Request, next: Next) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Middleware function that checks for a valid session cookie.
/// The user is placed into the request and then the request executed
/// normally if the session is valid, otherwise a HTMX redirect to the
/// sign-in page is returned.
pub async fn auth_guard_hx(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    auth_guard_internal(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
