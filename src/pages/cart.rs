use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{navigate_or_stay, visible_within, PageObject};
use crate::driver::common::probe;
use crate::driver::traits::{PageDriver, Selector};
use crate::utils::config::RunConfig;
use crate::utils::price::normalize_price;
use crate::utils::selectors::CartSelectors;

/// Read-only snapshot of the cart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub titles: Vec<String>,
    pub prices: Vec<f64>,
    pub total: f64,
    /// The total came from the page's subtotal rather than the row sum
    pub from_subtotal: bool,
}

/// Shopping cart page
pub struct CartPage<'a> {
    driver: &'a dyn PageDriver,
    config: &'a RunConfig,
}

impl<'a> CartPage<'a> {
    pub fn new(driver: &'a dyn PageDriver, config: &'a RunConfig) -> Self {
        Self { driver, config }
    }

    fn selectors(&self) -> &'a CartSelectors {
        &self.config.selectors.cart
    }

    pub async fn open(&self) -> bool {
        navigate_or_stay(self.driver, self.name(), &self.config.cart_url).await;
        self.is_loaded().await
    }

    /// One selector per cart line item
    pub async fn item_rows(&self) -> Vec<Selector> {
        let rows = Selector::css(self.selectors().rows.as_str());
        let count = probe(self.driver.count(&rows)).await.unwrap_or(0);
        (0..count).map(|i| rows.nth(i)).collect()
    }

    pub async fn item_titles(&self) -> Vec<String> {
        let title = Selector::css(self.selectors().row_title.as_str());
        let mut titles = Vec::new();
        for row in self.item_rows().await {
            if let Some(text) = probe(self.driver.read_text(&row.within(title.clone()))).await {
                titles.push(text);
            }
        }
        titles
    }

    pub async fn item_prices(&self) -> Vec<f64> {
        let price = Selector::css(self.selectors().row_price.as_str());
        let mut prices = Vec::new();
        for row in self.item_rows().await {
            match probe(self.driver.read_text(&row.within(price.clone()))).await {
                Some(text) => prices.push(normalize_price(&text)),
                None => debug!("cart row {} has no readable price", row),
            }
        }
        prices
    }

    /// Explicit subtotal if one is visible
    async fn subtotal(&self) -> Option<f64> {
        for candidate in &self.selectors().subtotals {
            let selector = Selector::css(candidate.as_str());
            if !probe(self.driver.is_visible(&selector)).await.unwrap_or(false) {
                continue;
            }
            if let Some(text) = probe(self.driver.read_text(&selector)).await {
                return Some(normalize_price(&text));
            }
        }
        None
    }

    /// Cart total: the subtotal element if shown, otherwise the row sum
    pub async fn total(&self) -> f64 {
        match self.subtotal().await {
            Some(total) => total,
            None => self.item_prices().await.iter().sum(),
        }
    }

    pub async fn cart_state(&self) -> CartState {
        let titles = self.item_titles().await;
        let prices = self.item_prices().await;
        let (total, from_subtotal) = match self.subtotal().await {
            Some(total) => (total, true),
            None => (prices.iter().sum(), false),
        };
        CartState {
            titles,
            prices,
            total,
            from_subtotal,
        }
    }

    pub async fn is_cart_empty(&self) -> bool {
        let empty = Selector::css(self.selectors().empty_message.as_str());
        probe(self.driver.is_visible(&empty)).await.unwrap_or(false)
    }
}

#[async_trait]
impl PageObject for CartPage<'_> {
    fn name(&self) -> &'static str {
        "cart"
    }

    async fn is_loaded(&self) -> bool {
        let loaded = Selector::css(self.selectors().loaded.as_str());
        visible_within(self.driver, &loaded, self.config.timings.load_check_ms).await
    }
}
