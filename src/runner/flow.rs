//! Shopping flow: sign in, search, add to cart, check the total
//!
//! Each step drives the page objects over the shared session page. Only the
//! login verdict and the cart total are gates; everything else in between is
//! logged and the flow moves on.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::context::RunContext;
use super::events::{EventEmitter, RunEvent};
use crate::driver::traits::PageDriver;
use crate::error::FlowError;
use crate::pages::{
    AddToCartOutcome, CartPage, CartState, HomePage, LoginPage, PageObject, ProductPage,
};
use crate::parser::types::Credential;
use crate::utils::config::RunConfig;

/// What happened to one collected product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub position: usize,
    pub url: String,
    pub screenshot: Option<PathBuf>,
    pub loaded: bool,
    pub has_add_to_cart: bool,
    /// `None` when no add-to-cart control was found
    pub add_to_cart: Option<AddToCartOutcome>,
    /// Driver failure raised during the add-to-cart attempt
    pub error: Option<String>,
}

impl ItemOutcome {
    pub fn is_confirmed(&self) -> bool {
        self.add_to_cart.map_or(false, |o| o.is_confirmed())
    }

    fn verdict(&self) -> String {
        match (&self.add_to_cart, &self.error) {
            (_, Some(_)) => "error".to_string(),
            (Some(AddToCartOutcome::Confirmed), _) => "added".to_string(),
            (Some(AddToCartOutcome::Failed(reason)), _) => format!("not added ({:?})", reason),
            (None, None) => "no add to cart button".to_string(),
        }
    }
}

/// Orchestrates page objects over one session
pub struct ShoppingFlow<'a> {
    driver: &'a dyn PageDriver,
    config: &'a RunConfig,
    context: &'a RunContext,
    events: &'a EventEmitter,
}

impl<'a> ShoppingFlow<'a> {
    pub fn new(
        driver: &'a dyn PageDriver,
        config: &'a RunConfig,
        context: &'a RunContext,
        events: &'a EventEmitter,
    ) -> Self {
        Self {
            driver,
            config,
            context,
            events,
        }
    }

    pub async fn login(&self, credential: &Credential) -> bool {
        LoginPage::new(self.driver, self.config)
            .login_sequence(&credential.username, &credential.password)
            .await
    }

    /// Search, filter by price, and collect up to `limit` item URLs
    pub async fn search_under_price(
        &self,
        query: &str,
        max_price: f64,
        limit: usize,
    ) -> Result<Vec<String>, FlowError> {
        let results = HomePage::new(self.driver, self.config).search(query).await?;

        results.is_loaded().await;
        results.apply_max_price_filter(max_price).await;
        let urls = results
            .collect_under_price_across_pages(max_price, limit)
            .await;

        info!(
            "query '{}' (limit={}, max_price={}): collected {} item URLs",
            query,
            limit,
            max_price,
            urls.len()
        );
        self.events
            .log(format!("Collected {} item URLs for '{}'", urls.len(), query));
        Ok(urls)
    }

    /// Visit each product in order, screenshot it and try to add it
    pub async fn add_items_to_cart(&self, urls: &[String]) -> Vec<ItemOutcome> {
        if urls.is_empty() {
            info!("add_items_to_cart called with no URLs, nothing to do");
            self.events.log("No items to add to cart");
            return Vec::new();
        }

        let product = ProductPage::new(self.driver, self.config);
        let total = urls.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, url) in urls.iter().enumerate() {
            let position = index + 1;
            info!("opening product {}/{}", position, total);
            product.open(url).await;

            let screenshot = self.capture_screenshot(position).await;

            let loaded = product.is_loaded().await;
            if !loaded {
                warn!("product page {}/{} did not fully load", position, total);
            }

            let mut outcome = ItemOutcome {
                position,
                url: url.clone(),
                screenshot,
                loaded,
                has_add_to_cart: product.has_add_to_cart_button().await,
                add_to_cart: None,
                error: None,
            };

            if outcome.has_add_to_cart {
                match product.add_to_cart_full_sequence(None).await {
                    Ok(result) => outcome.add_to_cart = Some(result),
                    Err(e) => {
                        warn!("add to cart raised for product {}: {}", position, e);
                        outcome.error = Some(e.to_string());
                    }
                }
                product.handle_post_add_popups().await;
            } else {
                info!("no add to cart button visible for product {}", position);
            }

            self.events.emit(RunEvent::ItemProcessed {
                position,
                total,
                url: url.clone(),
                verdict: outcome.verdict(),
            });
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Full-page screenshot, viewport as fallback; never fails the loop
    async fn capture_screenshot(&self, position: usize) -> Option<PathBuf> {
        let path = self.context.next_screenshot_path();
        if let Err(full) = self.driver.screenshot(&path, true).await {
            warn!("full-page screenshot failed for product {}: {}", position, full);
            if let Err(e) = self.driver.screenshot(&path, false).await {
                warn!("couldn't save screenshot for product {}: {}", position, e);
                return None;
            }
        }
        info!("saved screenshot: {}", path.display());
        Some(path)
    }

    /// Open the cart and fail if its total exceeds `max_total`
    pub async fn assert_cart_total_within_limit(&self, max_total: f64) -> Result<CartState, FlowError> {
        let cart = CartPage::new(self.driver, self.config);
        if !cart.open().await {
            warn!("cart page not confirmed loaded");
        }
        let state = cart.cart_state().await;
        info!(
            "cart total {} ({} rows, subtotal={}) against limit {}",
            state.total,
            state.prices.len(),
            state.from_subtotal,
            max_total
        );
        if state.total > max_total {
            return Err(FlowError::CartTotalExceeded {
                total: state.total,
                limit: max_total,
            });
        }
        Ok(state)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::driver::fake::{FakeDriver, FakeElement, FakePage};
    use crate::pages::AddFailure;
    use tempfile::TempDir;

    pub const HOME: &str = "https://www.ebay.com";
    pub const SIGN_IN: &str = "https://signin.ebay.com/";
    pub const CART: &str = "https://cart.ebay.com/";
    const LINKS: &str = "a[href*='/itm/']";
    const ADD: &str = "a:has-text('Add to cart'), button:has-text('Add to cart')";
    const VIEW_CART: &str = "a[href*='/cart'] >> text=View cart";
    const TITLE: &str = "h1[data-testid='x-item-title'], h1[itemprop='name']";

    pub fn item_url(n: usize) -> String {
        format!("https://www.ebay.com/itm/1000000{}", n)
    }

    /// A small storefront: signed-in home, four camera listings, addable
    /// products and a cart showing `cart_total`
    pub fn storefront(cart_total: &str) -> FakeDriver {
        let results_url = "https://www.ebay.com/sch/i.html?_nkw=vintage+camera";
        let urls: Vec<String> = (1..=4).map(item_url).collect();
        let hrefs: Vec<&str> = urls.iter().map(String::as_str).collect();

        let mut driver = FakeDriver::blank()
            .with_page(FakePage::new(SIGN_IN).with("#gh-ug", FakeElement::visible()))
            .with_page(
                FakePage::new(HOME)
                    .with("#gh-ug", FakeElement::visible())
                    .with("input#gh-ac", FakeElement::visible())
                    .with("input#gh-btn", FakeElement::visible().navigates_to(results_url)),
            )
            .with_page(
                FakePage::new(results_url)
                    .with("main, #mainContent, ul.srp-results", FakeElement::visible())
                    .with_links(LINKS, &hrefs),
            )
            .with_page(
                FakePage::new(CART)
                    .with("#Cart", FakeElement::visible())
                    .with("span#SUBTOTAL", FakeElement::visible().text(cart_total)),
            );
        for url in &urls {
            driver = driver.with_page(
                FakePage::new(url)
                    .with(TITLE, FakeElement::visible())
                    .with("button#binBtn_btn", FakeElement::visible())
                    .with(ADD, FakeElement::visible().reveals(VIEW_CART)),
            );
        }
        driver
    }

    fn flow_parts(dir: &TempDir) -> (RunConfig, RunContext, EventEmitter) {
        let context = RunContext::new(&dir.path().join("photos"), &dir.path().join("results"));
        context.reset_photos_dir();
        (RunConfig::default(), context, EventEmitter::default())
    }

    #[tokio::test]
    async fn test_vintage_camera_scenario_within_budget() {
        let dir = TempDir::new().unwrap();
        let (config, context, events) = flow_parts(&dir);
        let driver = storefront("US $95.00");
        let flow = ShoppingFlow::new(&driver, &config, &context, &events);
        let credential = Credential {
            username: "alice".into(),
            password: "secret".into(),
        };

        assert!(flow.login(&credential).await);
        assert!(driver.fills().is_empty());

        let urls = flow.search_under_price("vintage camera", 50.0, 3).await.unwrap();
        assert_eq!(urls, vec![item_url(1), item_url(2), item_url(3)]);

        let outcomes = flow.add_items_to_cart(&urls).await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.loaded && o.is_confirmed()));
        let visited: Vec<String> = driver
            .navigations()
            .into_iter()
            .filter(|u| u.contains("/itm/"))
            .collect();
        assert_eq!(visited, urls);
        assert_eq!(context.existing_screenshots().len(), 3);

        let cart = flow.assert_cart_total_within_limit(120.0).await.unwrap();
        assert_eq!(cart.total, 95.0);
    }

    #[tokio::test]
    async fn test_cart_over_budget_names_total_and_limit() {
        let dir = TempDir::new().unwrap();
        let (config, context, events) = flow_parts(&dir);
        let driver = storefront("US $150.00");
        let flow = ShoppingFlow::new(&driver, &config, &context, &events);

        let err = flow.assert_cart_total_within_limit(120.0).await.unwrap_err();

        assert!(matches!(
            err,
            FlowError::CartTotalExceeded { total, limit } if total == 150.0 && limit == 120.0
        ));
        let message = err.to_string();
        assert!(message.contains("150") && message.contains("120"));
    }

    #[tokio::test]
    async fn test_screenshot_falls_back_to_viewport() {
        let dir = TempDir::new().unwrap();
        let (config, context, events) = flow_parts(&dir);
        let driver = storefront("US $10.00").failing_full_page_screenshots();
        let flow = ShoppingFlow::new(&driver, &config, &context, &events);

        let outcomes = flow.add_items_to_cart(&[item_url(1)]).await;

        assert!(outcomes[0].screenshot.is_some());
        assert_eq!(
            driver.screenshots().iter().map(|(_, full)| *full).collect::<Vec<_>>(),
            vec![true, false]
        );
    }

    #[tokio::test]
    async fn test_screenshot_failure_does_not_stop_loop() {
        let dir = TempDir::new().unwrap();
        let (config, context, events) = flow_parts(&dir);
        let driver = storefront("US $10.00").failing_screenshots();
        let flow = ShoppingFlow::new(&driver, &config, &context, &events);

        let outcomes = flow.add_items_to_cart(&[item_url(1), item_url(2)]).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.screenshot.is_none() && o.is_confirmed()));
    }

    #[tokio::test]
    async fn test_item_without_button_is_skipped() {
        let dir = TempDir::new().unwrap();
        let (config, context, events) = flow_parts(&dir);
        let bare = "https://www.ebay.com/itm/99999999";
        let driver = storefront("US $10.00").with_page(FakePage::new(bare));
        let flow = ShoppingFlow::new(&driver, &config, &context, &events);

        let outcomes = flow.add_items_to_cart(&[bare.to_string(), item_url(1)]).await;

        assert!(!outcomes[0].has_add_to_cart);
        assert!(!outcomes[0].loaded);
        assert_eq!(outcomes[0].add_to_cart, None);
        assert!(outcomes[1].is_confirmed());
    }

    #[tokio::test]
    async fn test_unconfirmed_add_is_recorded_not_fatal() {
        let dir = TempDir::new().unwrap();
        let (config, context, events) = flow_parts(&dir);
        let silent = "https://www.ebay.com/itm/88888888";
        let driver = storefront("US $10.00").with_page(
            FakePage::new(silent)
                .with("button#binBtn_btn", FakeElement::visible())
                .with(ADD, FakeElement::visible()),
        );
        let flow = ShoppingFlow::new(&driver, &config, &context, &events);

        let outcomes = flow.add_items_to_cart(&[silent.to_string()]).await;

        assert_eq!(
            outcomes[0].add_to_cart,
            Some(AddToCartOutcome::Failed(AddFailure::NoConfirmation))
        );
    }

    #[tokio::test]
    async fn test_empty_url_list_is_noop() {
        let dir = TempDir::new().unwrap();
        let (config, context, events) = flow_parts(&dir);
        let driver = FakeDriver::blank();
        let flow = ShoppingFlow::new(&driver, &config, &context, &events);

        assert!(flow.add_items_to_cart(&[]).await.is_empty());
        assert!(driver.calls().is_empty());
    }
}
