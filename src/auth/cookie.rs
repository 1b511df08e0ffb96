//! Defines functions for storing the identity service session in a cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::Error;

/// The name of the cookie that holds the session secret.
pub(crate) const COOKIE_SESSION: &str = "appwrite-session";

/// Add the session cookie to the cookie jar, indicating that a user is
/// logged in.
///
/// The cookie holds the session secret, so the jar must be private.
pub(crate) fn set_session_cookie(jar: PrivateCookieJar, session_secret: &str) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, session_secret.to_owned()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Set the session cookie to an invalid value and set its max age to zero,
/// which should delete the cookie on the client side.
pub(crate) fn invalidate_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_SESSION, "deleted"))
            .path("/")
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true),
    )
}

/// Get the session secret from the cookie jar.
///
/// # Errors
///
/// Returns [Error::SessionMissing] if there is no session cookie.
pub(crate) fn get_session_secret(jar: &PrivateCookieJar) -> Result<String, Error> {
    jar.get(COOKIE_SESSION)
        .map(|cookie| cookie.value_trimmed().to_owned())
        .filter(|secret| !secret.is_empty())
        .ok_or(Error::SessionMissing)
}
