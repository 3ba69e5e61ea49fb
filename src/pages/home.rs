use async_trait::async_trait;
use log::{debug, info};

use super::search_results::SearchResultsPage;
use super::{dismiss_one, navigate_or_stay, visible_within, PageObject};
use crate::driver::common::{is_present_and_enabled, probe};
use crate::driver::traits::{PageDriver, Selector};
use crate::error::FlowError;
use crate::utils::config::RunConfig;
use crate::utils::selectors::HomeSelectors;

/// Landing page with the search box
pub struct HomePage<'a> {
    driver: &'a dyn PageDriver,
    config: &'a RunConfig,
}

impl<'a> HomePage<'a> {
    pub fn new(driver: &'a dyn PageDriver, config: &'a RunConfig) -> Self {
        Self { driver, config }
    }

    fn selectors(&self) -> &'a HomeSelectors {
        &self.config.selectors.home
    }

    fn search_input(&self) -> Selector {
        Selector::css(self.selectors().search_input.as_str())
    }

    /// Dismiss one cookie / region / security dialog if shown
    pub async fn dismiss_popups(&self) -> bool {
        dismiss_one(
            self.driver,
            self.name(),
            &self.selectors().popups,
            self.config.timings.dismiss_pause_ms,
        )
        .await
    }

    pub async fn enter_search_term(&self, query: &str) -> Result<(), FlowError> {
        self.driver
            .fill(&self.search_input().first(), query)
            .await
            .map_err(|e| FlowError::SearchUnavailable(format!("search input not usable: {}", e)))
    }

    /// Submit the search form
    ///
    /// Button candidates first, then Enter on the search input, then Enter on
    /// whatever has focus.
    pub async fn submit_search(&self) -> Result<(), FlowError> {
        for candidate in &self.selectors().search_buttons {
            let button = Selector::css(candidate.as_str());
            if !is_present_and_enabled(self.driver, &button).await {
                continue;
            }
            if probe(self.driver.click(&button.first())).await.is_some() {
                debug!("search submitted via {}", candidate);
                return Ok(());
            }
        }

        let input = self.search_input();
        let pressed = if is_present_and_enabled(self.driver, &input).await {
            self.driver.press(&input.first(), "Enter").await
        } else {
            self.driver.press_global("Enter").await
        };
        pressed.map_err(|e| {
            FlowError::SearchUnavailable(format!(
                "search button not found or not clickable: {}",
                e
            ))
        })
    }

    /// Run a search from the landing page and hand over the results page
    pub async fn search(&self, query: &str) -> Result<SearchResultsPage<'a>, FlowError> {
        navigate_or_stay(self.driver, self.name(), &self.config.base_url).await;
        self.dismiss_popups().await;
        if !self.is_loaded().await {
            debug!("search input not visible yet, trying anyway");
        }
        self.enter_search_term(query).await?;
        self.dismiss_popups().await;
        self.submit_search().await?;
        info!("searched for '{}'", query);
        Ok(SearchResultsPage::new(self.driver, self.config))
    }
}

#[async_trait]
impl PageObject for HomePage<'_> {
    fn name(&self) -> &'static str {
        "home"
    }

    async fn is_loaded(&self) -> bool {
        visible_within(
            self.driver,
            &self.search_input(),
            self.config.timings.load_check_ms,
        )
        .await
    }
}
