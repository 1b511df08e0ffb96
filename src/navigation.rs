//! The navigation bar shown at the top of every signed-in page.

use maud::{Markup, html};

use crate::endpoints;

const LINK_STYLE: &str = "block whitespace-nowrap rounded-lg px-3 py-2 text-sm font-medium \
    text-gray-700 hover:bg-gray-100 hover:text-blue-700 \
    dark:text-gray-200 dark:hover:bg-gray-800 dark:hover:text-blue-300";

const CURRENT_LINK_STYLE: &str = "block whitespace-nowrap rounded-lg px-3 py-2 text-sm \
    font-semibold bg-blue-50 text-blue-700 dark:bg-blue-900/30 dark:text-blue-200";

/// A page in the navigation bar. `is_current` marks the page being viewed.
struct Link<'a> {
    url: &'a str,
    title: &'a str,
    is_current: bool,
}

pub struct NavBar<'a> {
    links: Vec<Link<'a>>,
}

impl NavBar<'_> {
    /// Get the navigation bar with the link to `active_endpoint`, if any,
    /// marked as the current page.
    pub fn new(active_endpoint: &str) -> NavBar<'_> {
        let link = |url, title| Link {
            url,
            title,
            is_current: active_endpoint == url,
        };

        NavBar {
            links: vec![
                link(endpoints::HOME_VIEW, "Home"),
                link(endpoints::MY_BANKS_VIEW, "My Banks"),
                link(endpoints::TRANSACTION_HISTORY_VIEW, "Transaction History"),
                link(endpoints::PAYMENT_TRANSFER_VIEW, "Transfer Funds"),
                link(endpoints::CONNECT_BANK_VIEW, "Connect Bank"),
            ],
        }
    }

    pub fn into_html(self) -> Markup {
        html!(
            nav class="border-b border-gray-200 bg-white dark:border-gray-700 dark:bg-gray-900"
            {
                div class="mx-auto flex max-w-screen-xl items-center gap-6 px-4 py-3"
                {
                    a href=(endpoints::HOME_VIEW) class="flex shrink-0 items-center gap-2"
                    {
                        img src="/static/favicon-128x128.png" alt="Aurora Logo" class="h-8";
                        span class="text-2xl font-semibold dark:text-white" { "Aurora" }
                    }

                    // Scrolls sideways on narrow screens instead of wrapping.
                    ul class="flex flex-1 gap-1 overflow-x-auto"
                    {
                        @for link in &self.links {
                            li {
                                a
                                    href=(link.url)
                                    class=(if link.is_current { CURRENT_LINK_STYLE } else { LINK_STYLE })
                                    aria-current=[link.is_current.then_some("page")]
                                {
                                    (link.title)
                                }
                            }
                        }
                    }

                    a href=(endpoints::LOG_OUT) class=(LINK_STYLE) { "Log out" }
                }
            }
        )
    }
}

#[cfg(test)]
mod nav_bar_tests {
    use scraper::{Html, Selector};

    use crate::{endpoints, navigation::NavBar};

    #[test]
    fn marks_only_the_current_page() {
        for endpoint in [
            endpoints::HOME_VIEW,
            endpoints::MY_BANKS_VIEW,
            endpoints::TRANSACTION_HISTORY_VIEW,
            endpoints::PAYMENT_TRANSFER_VIEW,
            endpoints::CONNECT_BANK_VIEW,
        ] {
            let nav_bar = NavBar::new(endpoint);

            let current = nav_bar
                .links
                .iter()
                .filter(|link| link.is_current)
                .map(|link| link.url)
                .collect::<Vec<_>>();
            assert_eq!(current, [endpoint]);
        }
    }

    #[test]
    fn other_pages_mark_nothing() {
        for endpoint in [
            endpoints::SIGN_IN_VIEW,
            endpoints::LOG_OUT,
            endpoints::TRANSFERS_API,
        ] {
            let nav_bar = NavBar::new(endpoint);

            assert!(nav_bar.links.iter().all(|link| !link.is_current));
        }
    }

    #[test]
    fn renders_links_and_log_out() {
        let markup = NavBar::new(endpoints::MY_BANKS_VIEW).into_html();

        let html = Html::parse_fragment(&markup.into_string());

        let hrefs = html
            .select(&Selector::parse("a[href]").unwrap())
            .filter_map(|link| link.value().attr("href"))
            .collect::<Vec<_>>();
        assert!(hrefs.contains(&endpoints::CONNECT_BANK_VIEW));
        assert!(hrefs.contains(&endpoints::LOG_OUT));

        let current = html
            .select(&Selector::parse("a[aria-current=page]").unwrap())
            .filter_map(|link| link.value().attr("href"))
            .collect::<Vec<_>>();
        assert_eq!(current, [endpoints::MY_BANKS_VIEW]);
    }
}
