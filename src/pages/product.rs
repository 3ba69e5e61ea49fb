use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::{dismiss_one, navigate_or_stay, visible_within, PageObject};
use crate::driver::common::{first_visible, is_present_and_visible, probe};
use crate::driver::traits::{DriverResult, LoadState, PageDriver, Selector};
use crate::utils::config::RunConfig;
use crate::utils::selectors::ProductSelectors;

/// Result of one variation auto-selection pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariationOutcome {
    /// A dropdown was set to this value or label
    Selected(String),
    /// The n-th variation button was clicked
    Clicked(usize),
    /// Nothing needed (or nothing could be) chosen
    NotNeeded,
}

/// Why an add-to-cart attempt was not confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AddFailure {
    /// No visible add-to-cart control
    NoButton,
    /// The site showed a known failure message
    ErrorTextShown,
    /// Nothing appeared within the timeout
    NoConfirmation,
    /// The page went away mid-wait
    Interrupted,
}

/// Verdict of the add-to-cart confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "camelCase")]
pub enum AddToCartOutcome {
    Confirmed,
    Failed(AddFailure),
}

impl AddToCartOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, AddToCartOutcome::Confirmed)
    }
}

/// Product detail page
pub struct ProductPage<'a> {
    driver: &'a dyn PageDriver,
    config: &'a RunConfig,
}

impl<'a> ProductPage<'a> {
    pub fn new(driver: &'a dyn PageDriver, config: &'a RunConfig) -> Self {
        Self { driver, config }
    }

    fn selectors(&self) -> &'a ProductSelectors {
        &self.config.selectors.product
    }

    /// Navigate to a product and wait (best-effort) for its title
    pub async fn open(&self, url: &str) {
        if !navigate_or_stay(self.driver, self.name(), url).await {
            return;
        }
        let title = Selector::css(self.selectors().title.as_str());
        if !visible_within(self.driver, &title, self.config.timings.product_load_ms).await {
            debug!("product title not visible on {}", url);
        }
    }

    /// Title or add-to-cart control visible within `timeout_ms`
    pub async fn is_loaded_within(&self, timeout_ms: u64) -> bool {
        let selectors = self.selectors();
        visible_within(self.driver, &Selector::css(selectors.title.as_str()), timeout_ms).await
            || visible_within(
                self.driver,
                &Selector::css(selectors.add_to_cart_any.as_str()),
                timeout_ms,
            )
            .await
    }

    /// Resolve one mandatory variant picker, dropdowns first
    pub async fn select_default_variation(&self) -> VariationOutcome {
        if let Some(value) = self.select_first_dropdown_option().await {
            debug!("selected variation option {:?}", value);
            return VariationOutcome::Selected(value);
        }
        if let Some(index) = self.click_first_variation_button().await {
            debug!("clicked variation button #{}", index);
            return VariationOutcome::Clicked(index);
        }
        VariationOutcome::NotNeeded
    }

    async fn select_first_dropdown_option(&self) -> Option<String> {
        let selectors = self.selectors();
        let selects = Selector::css(selectors.variation_selects.as_str());
        let count = probe(self.driver.count(&selects)).await.unwrap_or(0);

        for index in 0..count {
            let select = selects.nth(index);
            if !probe(self.driver.is_visible(&select)).await.unwrap_or(false) {
                continue;
            }
            let options = select.within(Selector::css(selectors.variation_options.as_str()));
            if probe(self.driver.count(&options)).await.unwrap_or(0) == 0 {
                continue;
            }
            let current = probe(self.driver.input_value(&select))
                .await
                .unwrap_or_default();
            if !current.is_empty() {
                continue;
            }

            let first = options.first();
            let value = probe(self.driver.read_attribute(&first, "value"))
                .await
                .flatten()
                .unwrap_or_default();
            let choice = if !value.is_empty() {
                value
            } else {
                probe(self.driver.read_text(&first)).await.unwrap_or_default()
            };
            if choice.is_empty() {
                continue;
            }

            match self.driver.select_option(&select, &choice).await {
                Ok(()) => return Some(choice),
                Err(e) => debug!("could not select {:?} on {}: {}", choice, select, e),
            }
        }
        None
    }

    async fn click_first_variation_button(&self) -> Option<usize> {
        let buttons = Selector::css(self.selectors().variation_buttons.as_str());
        let count = probe(self.driver.count(&buttons)).await.unwrap_or(0);

        for index in 0..count {
            let button = buttons.nth(index);
            if !probe(self.driver.is_visible(&button)).await.unwrap_or(false)
                || !probe(self.driver.is_enabled(&button)).await.unwrap_or(false)
            {
                continue;
            }
            let pressed = self.attribute_or_empty(&button, "aria-pressed").await;
            let checked = self.attribute_or_empty(&button, "aria-checked").await;
            if pressed == "true" || pressed == "mixed" || checked == "true" {
                continue;
            }

            match self.driver.click(&button).await {
                Ok(()) => return Some(index),
                Err(e) => debug!("variation button {} not clickable: {}", button, e),
            }
        }
        None
    }

    async fn attribute_or_empty(&self, selector: &Selector, name: &str) -> String {
        probe(self.driver.read_attribute(selector, name))
            .await
            .flatten()
            .unwrap_or_default()
    }

    /// Click the first visible add-to-cart candidate
    pub async fn click_add_to_cart(&self) -> bool {
        let timings = &self.config.timings;
        if let Err(e) = self
            .driver
            .wait_for_load_state(LoadState::DomContentLoaded, timings.dom_ready_ms)
            .await
        {
            debug!("product page not DOM-ready: {}", e);
        }
        self.driver.pause(timings.add_to_cart_settle_ms).await;

        for candidate in &self.selectors().add_to_cart_buttons {
            let button = Selector::css(candidate.as_str()).first();
            if !is_present_and_visible(self.driver, &button).await {
                continue;
            }
            match self.driver.click(&button).await {
                Ok(()) => {
                    info!("clicked add to cart via {}", candidate);
                    probe(
                        self.driver
                            .wait_for_load_state(LoadState::NetworkIdle, timings.network_idle_ms),
                    )
                    .await;
                    return true;
                }
                Err(e) => debug!("add to cart candidate {} failed: {}", candidate, e),
            }
        }
        info!("no add to cart button visible");
        false
    }

    /// Probe for any add-to-cart control without touching it
    pub async fn has_add_to_cart_button(&self) -> bool {
        let selectors = self.selectors();
        if let Some(found) = first_visible(self.driver, &selectors.add_to_cart_probes).await {
            debug!("add to cart found via {}", found);
            return true;
        }
        let label = selectors.add_to_cart_label.as_str();
        is_present_and_visible(self.driver, &Selector::role("button", label)).await
            || is_present_and_visible(self.driver, &Selector::text(label)).await
    }

    /// Watch for the "view cart" affordance after clicking add to cart
    ///
    /// Network idle is awaited best-effort. The failure-text probe only picks
    /// the reason; any outcome other than the affordance is a failure.
    pub async fn wait_for_add_to_cart_confirmation(&self, timeout_ms: u64) -> AddToCartOutcome {
        if let Err(e) = self
            .driver
            .wait_for_load_state(LoadState::NetworkIdle, timeout_ms)
            .await
        {
            if e.is_session_lost() {
                warn!("page closed while waiting for cart confirmation: {}", e);
                return AddToCartOutcome::Failed(AddFailure::Interrupted);
            }
            debug!("network did not settle: {}", e);
        }

        let view_cart = Selector::css(self.selectors().view_cart.as_str());
        match self.driver.wait_visible(&view_cart, timeout_ms).await {
            Ok(()) => {
                debug!("view cart confirmation detected");
                AddToCartOutcome::Confirmed
            }
            Err(e) if e.is_absence() => {
                if first_visible(self.driver, &self.selectors().add_failure_texts)
                    .await
                    .is_some()
                {
                    info!("add to cart failed, error message visible");
                    AddToCartOutcome::Failed(AddFailure::ErrorTextShown)
                } else {
                    info!("no cart confirmation found, assuming add to cart failed");
                    AddToCartOutcome::Failed(AddFailure::NoConfirmation)
                }
            }
            Err(e) => {
                warn!("page closed while waiting for cart confirmation: {}", e);
                AddToCartOutcome::Failed(AddFailure::Interrupted)
            }
        }
    }

    /// Variation, add to cart, confirmation; on `url` or the current page
    ///
    /// Navigation and click failures are returned to the caller.
    pub async fn add_to_cart_full_sequence(&self, url: Option<&str>) -> DriverResult<AddToCartOutcome> {
        let product_url = match url {
            Some(url) => {
                self.driver.navigate(url).await?;
                probe(
                    self.driver
                        .wait_for_load_state(LoadState::NetworkIdle, self.config.timings.network_idle_ms),
                )
                .await;
                url.to_string()
            }
            None => {
                let current = probe(self.driver.current_url()).await.unwrap_or_default();
                debug!("add to cart on current page {}", current);
                current
            }
        };

        self.select_default_variation().await;

        let add = Selector::css(self.selectors().add_to_cart_text.as_str()).first();
        if !probe(self.driver.is_visible(&add)).await.unwrap_or(false) {
            warn!("no visible 'Add to cart' button for {}", product_url);
            return Ok(AddToCartOutcome::Failed(AddFailure::NoButton));
        }
        self.driver.click(&add).await?;

        let outcome = self
            .wait_for_add_to_cart_confirmation(self.config.timings.confirmation_ms)
            .await;
        if outcome.is_confirmed() {
            info!("added to cart (confirmed): {}", product_url);
        } else {
            warn!("not confirmed in cart (maybe needs a variation): {}", product_url);
        }
        Ok(outcome)
    }

    /// Dismiss one upsell / add-on / "continue" dialog left after adding
    pub async fn handle_post_add_popups(&self) -> bool {
        dismiss_one(
            self.driver,
            self.name(),
            &self.selectors().post_add_popups,
            self.config.timings.dismiss_pause_ms,
        )
        .await
    }
}

#[async_trait]
impl PageObject for ProductPage<'_> {
    fn name(&self) -> &'static str {
        "product"
    }

    async fn is_loaded(&self) -> bool {
        self.is_loaded_within(self.config.timings.product_load_ms).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{Call, FakeDriver, FakeElement, FakePage};

    const ITEM: &str = "https://www.ebay.com/itm/12345678";
    const ADD: &str = "a:has-text('Add to cart'), button:has-text('Add to cart')";
    const VIEW_CART: &str = "a[href*='/cart'] >> text=View cart";

    fn product(extra: impl FnOnce(FakePage) -> FakePage) -> FakeDriver {
        FakeDriver::blank().with_page(extra(FakePage::new(ITEM)))
    }

    #[tokio::test]
    async fn test_confirmed_when_view_cart_appears() {
        let driver = product(|p| p.with(ADD, FakeElement::visible().reveals(VIEW_CART)));
        let config = RunConfig::default();

        let outcome = ProductPage::new(&driver, &config)
            .add_to_cart_full_sequence(Some(ITEM))
            .await
            .unwrap();

        assert_eq!(outcome, AddToCartOutcome::Confirmed);
        assert_eq!(driver.clicks(), vec![format!("{} >> nth=0", ADD)]);
    }

    #[tokio::test]
    async fn test_timeout_is_failed_regardless_of_error_text() {
        let config = RunConfig::default();

        let silent = product(|p| p.with(ADD, FakeElement::visible()));
        let outcome = ProductPage::new(&silent, &config)
            .add_to_cart_full_sequence(Some(ITEM))
            .await
            .unwrap();
        assert_eq!(outcome, AddToCartOutcome::Failed(AddFailure::NoConfirmation));

        let with_error = product(|p| {
            p.with(ADD, FakeElement::visible().reveals("text=\"Please select\""))
        });
        let outcome = ProductPage::new(&with_error, &config)
            .add_to_cart_full_sequence(Some(ITEM))
            .await
            .unwrap();
        assert_eq!(outcome, AddToCartOutcome::Failed(AddFailure::ErrorTextShown));
        assert!(!outcome.is_confirmed());
    }

    #[tokio::test]
    async fn test_teardown_mid_wait_is_failed() {
        let driver = product(|p| {
            p.with(ADD, FakeElement::visible())
                .with(VIEW_CART, FakeElement::hidden().closes_session_on_wait())
        });
        let config = RunConfig::default();

        let outcome = ProductPage::new(&driver, &config)
            .add_to_cart_full_sequence(Some(ITEM))
            .await
            .unwrap();

        assert_eq!(outcome, AddToCartOutcome::Failed(AddFailure::Interrupted));
        assert!(driver.is_closed());
    }

    #[tokio::test]
    async fn test_missing_button_is_failed_without_click() {
        let driver = product(|p| p);
        let config = RunConfig::default();

        let outcome = ProductPage::new(&driver, &config)
            .add_to_cart_full_sequence(Some(ITEM))
            .await
            .unwrap();

        assert_eq!(outcome, AddToCartOutcome::Failed(AddFailure::NoButton));
        assert!(driver.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_navigation_failure_propagates() {
        let driver = product(|p| p).failing_navigation(ITEM);
        let config = RunConfig::default();

        let result = ProductPage::new(&driver, &config)
            .add_to_cart_full_sequence(Some(ITEM))
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_dropdown_variation_selected_once() {
        let driver = product(|p| {
            p.with("select", FakeElement::visible().count(2))
                .with(
                    "select >> nth=0 >> option:not([disabled]):not([value=''])",
                    FakeElement::visible().count(3),
                )
                .with(
                    "select >> nth=0 >> option:not([disabled]):not([value='']) >> nth=0",
                    FakeElement::visible().attr("value", "M").text("Medium"),
                )
        });
        let config = RunConfig::default();
        driver.navigate(ITEM).await.unwrap();

        let outcome = ProductPage::new(&driver, &config)
            .select_default_variation()
            .await;

        assert_eq!(outcome, VariationOutcome::Selected("M".into()));
        assert!(driver.clicks().is_empty());
    }

    #[tokio::test]
    async fn test_dropdown_with_value_left_alone() {
        let driver = product(|p| {
            p.with("select", FakeElement::visible().value("M"))
                .with(
                    "select >> nth=0 >> option:not([disabled]):not([value=''])",
                    FakeElement::visible().count(3),
                )
        });
        let config = RunConfig::default();
        driver.navigate(ITEM).await.unwrap();

        let outcome = ProductPage::new(&driver, &config)
            .select_default_variation()
            .await;

        assert_eq!(outcome, VariationOutcome::NotNeeded);
        assert!(!driver
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Select(..))));
    }

    #[tokio::test]
    async fn test_variation_button_skips_pressed() {
        let buttons = "button[role='radio'], li[role='radio'] button, li[role='button'] button";
        let driver = product(|p| {
            p.with(buttons, FakeElement::visible().count(2))
                .with(
                    &format!("{} >> nth=0", buttons),
                    FakeElement::visible().attr("aria-checked", "true"),
                )
                .with(&format!("{} >> nth=1", buttons), FakeElement::visible())
        });
        let config = RunConfig::default();
        driver.navigate(ITEM).await.unwrap();

        let outcome = ProductPage::new(&driver, &config)
            .select_default_variation()
            .await;

        assert_eq!(outcome, VariationOutcome::Clicked(1));
        assert_eq!(driver.clicks(), vec![format!("{} >> nth=1", buttons)]);
    }

    #[tokio::test]
    async fn test_has_add_to_cart_button_role_fallback() {
        let config = RunConfig::default();

        let by_role = product(|p| {
            p.with("role=button[name=\"Add to cart\"]", FakeElement::visible())
        });
        by_role.navigate(ITEM).await.unwrap();
        assert!(ProductPage::new(&by_role, &config).has_add_to_cart_button().await);

        let none = product(|p| p.with("button#binBtn_btn", FakeElement::hidden()));
        none.navigate(ITEM).await.unwrap();
        assert!(!ProductPage::new(&none, &config).has_add_to_cart_button().await);
    }

    #[tokio::test]
    async fn test_click_add_to_cart_uses_first_visible_candidate() {
        let driver = product(|p| {
            p.with("button#atcBtn_btn", FakeElement::hidden())
                .with("button#atcRedesignId_btn", FakeElement::visible())
        });
        let config = RunConfig::default();
        driver.navigate(ITEM).await.unwrap();

        assert!(ProductPage::new(&driver, &config).click_add_to_cart().await);
        assert_eq!(
            driver.clicks(),
            vec!["button#atcRedesignId_btn >> nth=0".to_string()]
        );
        assert_eq!(driver.pauses(), vec![300]);
    }

    #[test]
    fn test_outcome_serializes_with_reason() {
        let json = serde_json::to_string(&AddToCartOutcome::Failed(AddFailure::NoConfirmation)).unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"noConfirmation"}"#);
    }
}
