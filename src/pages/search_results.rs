use async_trait::async_trait;
use log::{debug, info, warn};
use regex::Regex;
use std::collections::HashSet;

use super::{visible_within, PageObject};
use crate::driver::common::{is_present_and_enabled, probe};
use crate::driver::traits::{DriverResult, PageDriver, Selector};
use crate::utils::config::RunConfig;
use crate::utils::price::normalize_price;
use crate::utils::selectors::ResultsSelectors;

/// Handle to one item anchor on the current results page
///
/// Points at the n-th item link of the page it was read from. Once the page
/// navigates, the handle refers to whatever sits at that position now, so
/// read what you need before moving on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRef {
    selector: Selector,
}

impl ItemRef {
    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// Ordered, de-duplicated URL accumulator capped at `limit`
#[derive(Debug, Default)]
pub struct UrlCollector {
    limit: usize,
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl UrlCollector {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            urls: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Add URLs not seen before, stopping at the cap; returns how many were added
    pub fn extend<I>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = 0;
        for url in urls {
            if self.is_full() {
                break;
            }
            if self.seen.insert(url.clone()) {
                self.urls.push(url);
                added += 1;
            }
        }
        added
    }

    pub fn is_full(&self) -> bool {
        self.urls.len() >= self.limit
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.urls.len())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

/// Search results listing
pub struct SearchResultsPage<'a> {
    driver: &'a dyn PageDriver,
    config: &'a RunConfig,
    item_pattern: Option<Regex>,
}

impl<'a> SearchResultsPage<'a> {
    pub fn new(driver: &'a dyn PageDriver, config: &'a RunConfig) -> Self {
        let pattern = &config.selectors.results.item_href_pattern;
        let item_pattern = match Regex::new(pattern) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("invalid item href pattern '{}': {}", pattern, e);
                None
            }
        };
        Self {
            driver,
            config,
            item_pattern,
        }
    }

    fn selectors(&self) -> &'a ResultsSelectors {
        &self.config.selectors.results
    }

    fn next_button(&self) -> Selector {
        Selector::css(self.selectors().next_page.as_str())
    }

    /// Best-effort max price filter; the site may not offer it
    pub async fn apply_max_price_filter(&self, max_price: f64) -> bool {
        let input = Selector::css(self.selectors().max_price_input.as_str());
        if probe(self.driver.count(&input)).await.unwrap_or(0) == 0 {
            debug!("no max price input on results page");
            return false;
        }
        let first = input.first();
        let value = format!("{}", max_price.trunc() as i64);
        if probe(self.driver.fill(&first, &value)).await.is_none()
            || probe(self.driver.press(&first, "Enter")).await.is_none()
        {
            debug!("max price filter could not be applied");
            return false;
        }
        self.is_loaded().await;
        true
    }

    /// Item anchors whose href looks like a real listing
    pub async fn get_item_cards(&self) -> Vec<ItemRef> {
        let Some(pattern) = &self.item_pattern else {
            return Vec::new();
        };
        let links = Selector::css(self.selectors().item_links.as_str());
        let count = probe(self.driver.count(&links)).await.unwrap_or(0);

        let mut items = Vec::new();
        for index in 0..count {
            let link = links.nth(index);
            let href = probe(self.driver.read_attribute(&link, "href"))
                .await
                .flatten();
            match href {
                Some(href) if pattern.is_match(&href) => items.push(ItemRef { selector: link }),
                _ => continue,
            }
        }
        debug!("{} of {} item links look like listings", items.len(), count);
        items
    }

    /// First strictly positive price near the item, if any
    pub async fn extract_price(&self, item: &ItemRef) -> Option<f64> {
        let selectors = self.selectors();
        let container = item
            .selector
            .within(Selector::css(selectors.item_container.as_str()));
        let root = if probe(self.driver.count(&container)).await.unwrap_or(0) > 0 {
            container
        } else {
            item.selector.clone()
        };

        for candidate in &selectors.item_prices {
            let price = root.within(Selector::css(candidate.as_str()));
            let Some(text) = probe(self.driver.read_text(&price)).await else {
                continue;
            };
            let value = normalize_price(&text);
            if value > 0.0 {
                return Some(value);
            }
        }
        None
    }

    pub async fn extract_url(&self, item: &ItemRef) -> Option<String> {
        probe(self.driver.read_attribute(&item.selector, "href"))
            .await
            .flatten()
            .filter(|href| !href.is_empty())
    }

    /// Up to `limit` item URLs on this page, prices ignored
    pub async fn any_item_urls_on_page(&self, limit: usize) -> Vec<String> {
        let mut urls = Vec::new();
        for item in self.get_item_cards().await {
            if urls.len() >= limit {
                break;
            }
            if let Some(url) = self.extract_url(&item).await {
                urls.push(url);
            }
        }
        debug!("{} fallback URLs (limit={})", urls.len(), limit);
        urls
    }

    /// Item URLs on this page priced at or below `max_price`
    ///
    /// Unlike the fallback in [`Self::any_item_urls_on_page`], this pass
    /// enforces the price: items priced above `max_price` are dropped.
    /// Items without a readable price are kept.
    pub async fn items_under_price_on_page(&self, max_price: f64) -> Vec<String> {
        let mut urls = Vec::new();
        for item in self.get_item_cards().await {
            if let Some(price) = self.extract_price(&item).await {
                if price > max_price {
                    debug!("skipping {} priced {} over {}", item.selector, price, max_price);
                    continue;
                }
            }
            if let Some(url) = self.extract_url(&item).await {
                urls.push(url);
            }
        }
        urls
    }

    pub async fn has_next_page(&self) -> bool {
        is_present_and_enabled(self.driver, &self.next_button()).await
    }

    pub async fn go_to_next_page(&self) -> DriverResult<()> {
        self.driver.click(&self.next_button().first()).await?;
        if !self.is_loaded().await {
            debug!("next results page not confirmed loaded");
        }
        Ok(())
    }

    /// Collect up to `limit` distinct item URLs, paging forward as needed
    ///
    /// Falls back to unfiltered items on a page that yields nothing under the
    /// price. Visits at most `timings.max_pages` pages and never fails; a
    /// driver error while paging just ends the walk.
    pub async fn collect_under_price_across_pages(&self, max_price: f64, limit: usize) -> Vec<String> {
        let mut collected = UrlCollector::new(limit);
        if limit == 0 {
            return collected.into_urls();
        }

        collected.extend(self.items_under_price_on_page(max_price).await);
        if collected.is_empty() {
            info!(
                "no items under {} on first page, falling back to first results",
                max_price
            );
            collected.extend(self.any_item_urls_on_page(limit).await);
        }

        let max_pages = self.config.timings.max_pages;
        let mut pages_visited = 1;
        while !collected.is_full() && pages_visited < max_pages && self.has_next_page().await {
            if let Err(e) = self.go_to_next_page().await {
                warn!("stopping pagination: {}", e);
                break;
            }
            pages_visited += 1;

            let page_urls = self.items_under_price_on_page(max_price).await;
            let found_on_page = !page_urls.is_empty();
            collected.extend(page_urls);
            if collected.is_full() {
                break;
            }
            if !found_on_page {
                let remaining = collected.remaining();
                collected.extend(self.any_item_urls_on_page(remaining).await);
            }
        }

        info!(
            "collected {} item URLs over {} page(s) (limit={})",
            collected.len(),
            pages_visited,
            limit
        );
        collected.into_urls()
    }
}

#[async_trait]
impl PageObject for SearchResultsPage<'_> {
    fn name(&self) -> &'static str {
        "search results"
    }

    async fn is_loaded(&self) -> bool {
        let loaded = Selector::css(self.selectors().loaded.as_str());
        visible_within(self.driver, &loaded, self.config.timings.load_check_ms).await
    }
}
