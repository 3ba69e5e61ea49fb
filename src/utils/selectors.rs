//! Selector catalogue for the storefront.
//!
//! Every ordered candidate list used by the page objects lives here as data.
//! Candidates are tried first to last; the first usable match wins. When the
//! site layout drifts, update these lists (or override them from the run
//! config file) rather than the page object code.

use serde::{Deserialize, Serialize};

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// All selector data, grouped per page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteSelectors {
    pub home: HomeSelectors,
    pub login: LoginSelectors,
    pub results: ResultsSelectors,
    pub product: ProductSelectors,
    pub cart: CartSelectors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HomeSelectors {
    pub search_input: String,
    pub search_buttons: Vec<String>,
    /// Cookie, region and security dialogs seen on the landing page
    pub popups: Vec<String>,
}

impl Default for HomeSelectors {
    fn default() -> Self {
        Self {
            search_input: "input#gh-ac".to_string(),
            search_buttons: list(&["input#gh-btn", "button#gh-btn", "button.btn-prim"]),
            popups: list(&[
                "button#gdpr-banner-accept",
                "button[aria-label='Accept all']",
                "button:has-text('Accept')",
                "button:has-text('Got it')",
                "button:has-text('הבנתי')",
                "button[aria-label='Close']",
                "button:has-text('Close')",
                "button#dialog-close",
                "button#siNoThrottle",
                "button[aria-label='No thanks']",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginSelectors {
    /// Field whose visibility means the sign-in form is shown
    pub ready_field: String,
    pub username_fields: Vec<String>,
    pub username_fallback: String,
    pub password_fields: Vec<String>,
    pub password_fallback: String,
    pub continue_buttons: Vec<String>,
    pub submit: String,
    pub skip_simplify: String,
    pub initial_popups: Vec<String>,
    /// "Continue" / "Not now" screens shown right after the password step
    pub post_login_buttons: Vec<String>,
    pub post_login_close: Vec<String>,
    /// Greeting or account controls only rendered for a signed-in user
    pub account_indicators: Vec<String>,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            ready_field: "input#userid".to_string(),
            username_fields: list(&[
                "input#userid",
                "input[name='userid']",
                "input#signin-username",
                "input[name='email']",
                "input#email",
                "input[type='email']",
            ]),
            username_fallback: "input".to_string(),
            password_fields: list(&[
                "input#pass",
                "input[name='pass']",
                "input[name='password']",
                "input#password",
                "input[type='password']",
            ]),
            password_fallback: "input[type='password']".to_string(),
            continue_buttons: list(&[
                "button#signin-continue-btn",
                "button[type='submit'][id*='signin-continue']",
                "button:has-text('Continue')",
                "button:has-text('המשך')",
            ]),
            submit: "button#sgnBt".to_string(),
            skip_simplify: "text=Skip for now".to_string(),
            initial_popups: list(&[
                "button#gdpr-banner-accept",
                "button[aria-label='Accept all']",
                "button:has-text('Accept')",
                "button:has-text('Got it')",
                "button:has-text('הבנתי')",
                "button[aria-label='Close']",
            ]),
            post_login_buttons: list(&[
                "button:has-text('Continue')",
                "button:has-text('Go to eBay')",
                "button:has-text('Not now')",
                "button:has-text('No thanks')",
                "button:has-text('המשך')",
            ]),
            post_login_close: list(&[
                "button[aria-label='Close']",
                "button[aria-label='Skip for now']",
                "button[title='Close']",
                "button#gdpr-banner-accept",
                "button:has-text('Close')",
                "button:has-text('Got it')",
                "button#dialog-close",
                "button#siNoThrottle",
                "button[aria-label='No thanks']",
            ]),
            account_indicators: list(&[
                "#gh-ug",
                "a[title*='My eBay']",
                "a[aria-label*='My eBay']",
                "button[aria-label*='My eBay']",
                "a[aria-label*='חשבון']",
                "button[aria-label*='חשבון']",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResultsSelectors {
    pub loaded: String,
    pub max_price_input: String,
    pub item_links: String,
    /// Regex an item href must match to count as a real listing
    pub item_href_pattern: String,
    /// Relative selector for the listing card wrapping an item link
    pub item_container: String,
    pub item_prices: Vec<String>,
    pub next_page: String,
}

impl Default for ResultsSelectors {
    fn default() -> Self {
        Self {
            loaded: "main, #mainContent, ul.srp-results".to_string(),
            max_price_input: "input[name='_udhi']".to_string(),
            item_links: "a[href*='/itm/']".to_string(),
            item_href_pattern: r"/itm/(\d{8,})".to_string(),
            item_container: "xpath=ancestor::li[contains(@class, 's-item')]".to_string(),
            item_prices: list(&[
                ".s-item__price",
                ".s-item__detail span.s-item__price",
                "span[aria-label*='Price']",
                "span[aria-label*='Current bid']",
                "span[aria-label*='Buy It Now']",
            ]),
            next_page: "a.pagination__next, a[aria-label^='Next']".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProductSelectors {
    pub title: String,
    /// Combined add-to-cart selector used by the loaded check
    pub add_to_cart_any: String,
    pub variation_selects: String,
    pub variation_options: String,
    pub variation_buttons: String,
    /// Candidates clicked by `click_add_to_cart`
    pub add_to_cart_buttons: Vec<String>,
    /// Candidates probed by `has_add_to_cart_button`
    pub add_to_cart_probes: Vec<String>,
    pub add_to_cart_label: String,
    /// Text-located control used by the full add-to-cart sequence
    pub add_to_cart_text: String,
    pub view_cart: String,
    pub add_failure_texts: Vec<String>,
    pub post_add_popups: Vec<String>,
}

impl Default for ProductSelectors {
    fn default() -> Self {
        Self {
            title: "h1[data-testid='x-item-title'], h1[itemprop='name']".to_string(),
            add_to_cart_any: "a:has-text('Add to cart'), button:has-text('Add to cart'), button[aria-label*='Add to cart']".to_string(),
            variation_selects: "select".to_string(),
            variation_options: "option:not([disabled]):not([value=''])".to_string(),
            variation_buttons: "button[role='radio'], li[role='radio'] button, li[role='button'] button".to_string(),
            add_to_cart_buttons: list(&[
                "button#atcBtn_btn",
                "button#atcRedesignId_btn",
                "button:has-text('Add to cart')",
                "a:has-text('Add to cart')",
                "button[aria-label*='Add to cart']",
                "button[data-test-id='x-atc-action']",
            ]),
            add_to_cart_probes: list(&[
                "button#atcRedesignId_btn",
                "a#isCartBtn_btn",
                "button#binBtn_btn",
                "button[data-testid='x-atc-action']",
                "button[aria-label*='Add to cart']",
                "button[aria-label*='Add to Cart']",
                "a[aria-label*='Add to cart']",
                "a[aria-label*='Add to Cart']",
                "button:has-text('Add to cart')",
                "a:has-text('Add to cart')",
            ]),
            add_to_cart_label: "Add to cart".to_string(),
            add_to_cart_text: "a:has-text('Add to cart'), button:has-text('Add to cart')".to_string(),
            view_cart: "a[href*='/cart'] >> text=View cart".to_string(),
            add_failure_texts: list(&[
                "text=\"This item cannot be added to your cart\"",
                "text=\"Add to cart failed\"",
                "text=\"Please select\"",
            ]),
            post_add_popups: list(&[
                "button#ADDON_0-cta",
                "button#addonSkipBtn",
                "button[aria-label='Close']",
                "button:has-text('No thanks')",
                "button:has-text('Continue shopping')",
                "button:has-text('Go to cart')",
                "button:has-text('View cart')",
            ]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CartSelectors {
    pub loaded: String,
    pub rows: String,
    pub row_title: String,
    pub row_price: String,
    /// Explicit subtotal elements, authoritative over the per-row sum
    pub subtotals: Vec<String>,
    pub empty_message: String,
}

impl Default for CartSelectors {
    fn default() -> Self {
        Self {
            loaded: "#Cart".to_string(),
            rows: "div.cart-bucket".to_string(),
            row_title: "a.item-title".to_string(),
            row_price: "span.item-price".to_string(),
            subtotals: list(&["span#SUBTOTAL", "span#total", "div#SUBTOTAL div"]),
            empty_message: "#Cart .empty-cart__title".to_string(),
        }
    }
}
