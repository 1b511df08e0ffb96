//! Success and error messages shown in the page's alert container.
//!
//! Alerts are returned from HTMX form endpoints and replace the
//! `#alert-container` element rendered by [crate::html::base]. Forms target
//! the container with `hx-swap="outerHTML"`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlertType {
    Success,
    Error,
}

/// A dismissable alert message.
#[derive(Debug, Clone)]
pub struct Alert<'a> {
    alert_type: AlertType,
    message: &'a str,
    details: &'a str,
}

impl<'a> Alert<'a> {
    /// Create a new success alert.
    pub fn success(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Success,
            message,
            details,
        }
    }

    /// Create a new error alert.
    pub fn error(message: &'a str, details: &'a str) -> Self {
        Self {
            alert_type: AlertType::Error,
            message,
            details,
        }
    }

    pub fn into_html(self) -> Markup {
        let style = match self.alert_type {
            AlertType::Success => {
                "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 \
                dark:bg-gray-800 dark:text-green-400 border border-green-300 dark:border-green-800"
            }
            AlertType::Error => {
                "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
                dark:bg-gray-800 dark:text-red-400 border border-red-300 dark:border-red-800"
            }
        };

        html! {
            div
                id="alert-container"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div class=(style) role="alert"
                {
                    div class="flex items-start justify-between gap-4"
                    {
                        div
                        {
                            span class="font-medium" { (self.message) }

                            @if !self.details.is_empty() {
                                p class="mt-1" { (self.details) }
                            }
                        }

                        button
                            type="button"
                            aria-label="Dismiss"
                            class="font-bold"
                            onclick="this.closest('#alert-container').classList.add('hidden')"
                        {
                            "×"
                        }
                    }
                }
            }
        }
    }

    /// Render the alert as an HTML fragment with the given status code.
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, self.into_html()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use scraper::Selector;

    use crate::test_utils::{assert_valid_html, parse_html_fragment};

    use super::Alert;

    #[tokio::test]
    async fn error_alert_replaces_container() {
        let response = Alert::error("Invalid amount", "Enter a positive amount.")
            .into_response_with_status(StatusCode::BAD_REQUEST);

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let container = html
            .select(&Selector::parse("#alert-container").unwrap())
            .next()
            .expect("No alert container");
        assert!(container.value().attr("class").is_some_and(|class| !class.contains("hidden")));
        let text = container.text().collect::<String>();
        assert!(text.contains("Invalid amount"), "got {text}");
        assert!(text.contains("Enter a positive amount."), "got {text}");
    }

    #[tokio::test]
    async fn success_alert_omits_empty_details() {
        let response = Alert::success("Transfer sent", "").into_response_with_status(StatusCode::OK);

        let html = parse_html_fragment(response).await;
        assert_eq!(html.select(&Selector::parse("p").unwrap()).count(), 0);
    }
}
