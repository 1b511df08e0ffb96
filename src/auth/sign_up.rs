//! The sign-up page and the flow that creates an account, a payments
//! customer and a user profile.

use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use serde::Deserialize;
use time::{Date, OffsetDateTime, macros::format_description};

use crate::{
    Error, NewUser, Services, User,
    auth::{ValidatedPassword, cookie::set_session_cookie},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, LINK_STYLE, base, loading_spinner, log_in_register, password_input,
        text_input,
    },
    services::{
        DocumentStore, IdentityService, NewUserRecord, PaymentsProcessor, Session,
        extract_customer_id_from_url,
    },
    user::validate_email,
};

/// The minimum number of characters the password should have to be
/// considered valid on the client side.
const PASSWORD_INPUT_MIN_LENGTH: u8 = 8;

/// The raw data entered by the user in the sign-up form.
#[derive(Clone, Default, Deserialize)]
pub struct SignUpForm {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    /// Two letter state code, e.g. "NY".
    pub state: String,
    pub postal_code: String,
    /// ISO 8601 date, e.g. "1990-01-31".
    pub date_of_birth: String,
    /// The last four digits of the user's SSN.
    pub ssn: String,
    pub email: String,
    pub password: String,
}

fn required(field: &'static str, value: &str) -> Result<String, Error> {
    let value = value.trim();

    if value.is_empty() {
        Err(Error::InvalidField(field, "this field is required".to_owned()))
    } else {
        Ok(value.to_owned())
    }
}

fn digits(field: &'static str, value: &str, lengths: &[usize]) -> Result<String, Error> {
    let value = value.trim();

    if lengths.contains(&value.len()) && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(value.to_owned())
    } else {
        let lengths = lengths
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(" or ");
        Err(Error::InvalidField(field, format!("must be {lengths} digits")))
    }
}

fn parse_date_of_birth(value: &str) -> Result<String, Error> {
    let value = value.trim();
    let invalid = |reason: &str| Error::InvalidField("date of birth", reason.to_owned());

    let date = Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map_err(|_| invalid("must be a date in the format YYYY-MM-DD"))?;

    if date >= OffsetDateTime::now_utc().date() {
        return Err(invalid("must be in the past"));
    }

    Ok(value.to_owned())
}

impl SignUpForm {
    /// Check every field and the password strength.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidField] for the first malformed field, or
    /// [Error::TooWeak] if the password is too easy to guess.
    pub fn validate(&self) -> Result<(NewUser, ValidatedPassword), Error> {
        let state = self.state.trim().to_ascii_uppercase();
        if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidField(
                "state",
                "must be a two letter code, e.g. NY".to_owned(),
            ));
        }

        let user = NewUser {
            first_name: required("first name", &self.first_name)?,
            last_name: required("last name", &self.last_name)?,
            address1: required("address", &self.address1)?,
            city: required("city", &self.city)?,
            state,
            postal_code: digits("postal code", &self.postal_code, &[5])?,
            date_of_birth: parse_date_of_birth(&self.date_of_birth)?,
            ssn: digits("SSN", &self.ssn, &[4])?,
            email: validate_email(&self.email)?.to_owned(),
        };

        let password = ValidatedPassword::new(
            &self.password,
            &[&user.first_name, &user.last_name, &user.email],
        )?;

        Ok((user, password))
    }
}

/// Create an account, a payments customer and a user profile, then start a
/// session for the new user.
///
/// The steps run in order and the first failure aborts the rest.
///
/// # Errors
///
/// Returns:
/// - a validation error if a field or the password is rejected,
/// - [Error::DuplicateEmail] if an account with the email already exists,
/// - an upstream error if any of the services fail.
pub async fn sign_up(
    form: &SignUpForm,
    identity: &dyn IdentityService,
    payments: &dyn PaymentsProcessor,
    documents: &dyn DocumentStore,
) -> Result<(User, Session), Error> {
    let (details, password) = form.validate()?;

    let account = identity
        .create_account(
            &details.email,
            password.as_str(),
            &format!("{} {}", details.first_name, details.last_name),
        )
        .await?;

    let dwolla_customer_url = payments.create_customer(&details).await?;
    let dwolla_customer_id = extract_customer_id_from_url(&dwolla_customer_url);

    let user = documents
        .create_user(&NewUserRecord {
            user_id: &account.id,
            details: &details,
            dwolla_customer_url: &dwolla_customer_url,
            dwolla_customer_id,
        })
        .await?;

    let session = identity
        .create_session(&details.email, password.as_str())
        .await?;

    tracing::info!("Created user {} for account {}", user.id, account.id);

    Ok((user, session))
}

fn sign_up_form(form: &SignUpForm, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::SIGN_UP_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            div class="grid grid-cols-2 gap-4"
            {
                (text_input("first_name", "First Name", "text", &form.first_name, "Jane"))
                (text_input("last_name", "Last Name", "text", &form.last_name, "Doe"))
            }

            (text_input("address1", "Address", "text", &form.address1, "1 Main St"))
            (text_input("city", "City", "text", &form.city, "Springfield"))

            div class="grid grid-cols-2 gap-4"
            {
                (text_input("state", "State", "text", &form.state, "NY"))
                (text_input("postal_code", "Postal Code", "text", &form.postal_code, "11101"))
            }

            div class="grid grid-cols-2 gap-4"
            {
                (text_input("date_of_birth", "Date of Birth", "date", &form.date_of_birth, "1990-01-31"))
                (text_input("ssn", "SSN (last 4 digits)", "text", &form.ssn, "1234"))
            }

            (text_input("email", "Email", "email", &form.email, "jane@example.com"))
            (password_input("", PASSWORD_INPUT_MIN_LENGTH, error_message))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Sign up"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                a href=(endpoints::SIGN_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Sign in"
                }
            }
        }
    }
}

/// Display the sign-up page.
pub async fn get_sign_up_page() -> Response {
    let form = sign_up_form(&SignUpForm::default(), None);
    let content = log_in_register("Create your account", &form);

    base("Sign Up", &[], &content).into_response()
}

/// Handler for sign-up requests via the POST method.
///
/// On success the session cookie is set and the client is redirected to the
/// home page. Otherwise the form is returned with the values the user typed,
/// except the password, and a message explaining the problem.
pub async fn post_sign_up(
    State(services): State<Services>,
    jar: PrivateCookieJar,
    Form(form): Form<SignUpForm>,
) -> Response {
    let result = sign_up(
        &form,
        services.identity.as_ref(),
        services.payments.as_ref(),
        services.documents.as_ref(),
    )
    .await;

    match result {
        Ok((_, session)) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::HOME_VIEW.to_owned()),
            set_session_cookie(jar, &session.secret),
        )
            .into_response(),
        Err(
            error @ (Error::InvalidField(..) | Error::TooWeak(_) | Error::DuplicateEmail(_)),
        ) => sign_up_form(&form, Some(&error.to_string())).into_response(),
        Err(error) => {
            tracing::error!("Could not sign up user: {error}");
            sign_up_form(
                &form,
                Some("An internal error occurred. Please try again later."),
            )
            .into_response()
        }
    }
}
