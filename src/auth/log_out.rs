//! Log-out route handler that ends the session and redirects to sign-in.

use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    Services,
    auth::cookie::{get_session_secret, invalidate_session_cookie},
    endpoints,
};

/// Delete the current session, invalidate the session cookie and redirect
/// the client to the sign-in page.
///
/// The cookie is removed even if the identity service could not delete the
/// session.
pub async fn get_log_out(State(services): State<Services>, jar: PrivateCookieJar) -> Response {
    if let Ok(session_secret) = get_session_secret(&jar)
        && let Err(error) = services.identity.delete_session(&session_secret).await
    {
        tracing::warn!("Could not delete session during log out: {error}");
    }

    let jar = invalidate_session_cookie(jar);

    (jar, Redirect::to(endpoints::SIGN_IN_VIEW)).into_response()
}
