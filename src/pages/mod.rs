//! Page objects for the storefront
//!
//! Each page object borrows the session's [`PageDriver`] and the run
//! configuration; it keeps no state of its own, so constructing one is free
//! and two objects over the same page never disagree.

pub mod cart;
pub mod home;
pub mod login;
pub mod product;
pub mod search_results;

use async_trait::async_trait;
use log::debug;

use crate::driver::common::{click_first_visible, probe};
use crate::driver::traits::{PageDriver, Selector};

pub use cart::{CartPage, CartState};
pub use home::HomePage;
pub use login::LoginPage;
pub use product::{AddFailure, AddToCartOutcome, ProductPage, VariationOutcome};
pub use search_results::{ItemRef, SearchResultsPage, UrlCollector};

/// Common surface of every page object
#[async_trait]
pub trait PageObject: Send + Sync {
    fn name(&self) -> &'static str;

    /// Non-throwing loaded check; a short visibility wait folded to `bool`
    async fn is_loaded(&self) -> bool;
}

/// Whether the first match of `selector` becomes visible within `timeout_ms`
pub(crate) async fn visible_within(
    driver: &dyn PageDriver,
    selector: &Selector,
    timeout_ms: u64,
) -> bool {
    probe(driver.wait_visible(&selector.first(), timeout_ms))
        .await
        .is_some()
}

/// Click away at most one dialog from `candidates`
///
/// Stacked dialogs need repeated calls. With nothing to dismiss this is a
/// no-op.
pub(crate) async fn dismiss_one(
    driver: &dyn PageDriver,
    page: &str,
    candidates: &[String],
    pause_ms: u64,
) -> bool {
    match click_first_visible(driver, candidates, pause_ms).await {
        Some(selector) => {
            debug!("{}: dismissed dialog via {}", page, selector);
            true
        }
        None => false,
    }
}

/// Navigate, logging instead of failing when the site refuses
pub(crate) async fn navigate_or_stay(driver: &dyn PageDriver, page: &str, url: &str) -> bool {
    match driver.navigate(url).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("{}: navigation to {} failed, staying on current page: {}", page, url, e);
            false
        }
    }
}
