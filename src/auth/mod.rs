//! Sign-up, sign-in and log-out, the session cookie and the route guards
//! that resolve the session to the logged-in [crate::User].

mod cookie;
mod log_out;
mod middleware;
mod password;
mod redirect;
mod sign_in;
mod sign_up;

pub use log_out::get_log_out;
pub use middleware::{auth_guard, auth_guard_hx, get_logged_in_user};
pub use password::ValidatedPassword;
pub use sign_in::{get_sign_in_page, post_sign_in};
pub use sign_up::{SignUpForm, get_sign_up_page, post_sign_up, sign_up};

#[cfg(test)]
pub(crate) use cookie::{COOKIE_SESSION, set_session_cookie};
