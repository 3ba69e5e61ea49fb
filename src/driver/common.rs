//! Absence-tolerant helpers shared by all page objects
//!
//! Selector probing treats "element absent / not interactable" as a normal
//! outcome. [`probe`] is the single place where a driver failure is folded
//! into "absent"; the candidate-list helpers below are built on it and walk
//! an ordered list, short-circuiting on the first usable match.

use log::trace;
use std::future::Future;
use std::time::{Duration, Instant};

use super::traits::{DriverResult, PageDriver, Selector};

/// Run a driver operation, treating any failure as "absent"
pub async fn probe<T, F>(operation: F) -> Option<T>
where
    F: Future<Output = DriverResult<T>>,
{
    match operation.await {
        Ok(value) => Some(value),
        Err(e) => {
            trace!("probe treated as absent: {}", e);
            None
        }
    }
}

/// At least one match exists and the first one is visible
pub async fn is_present_and_visible(driver: &dyn PageDriver, selector: &Selector) -> bool {
    probe(driver.count(selector)).await.unwrap_or(0) > 0
        && probe(driver.is_visible(selector)).await.unwrap_or(false)
}

/// At least one match exists and the first one is enabled
pub async fn is_present_and_enabled(driver: &dyn PageDriver, selector: &Selector) -> bool {
    probe(driver.count(selector)).await.unwrap_or(0) > 0
        && probe(driver.is_enabled(selector)).await.unwrap_or(false)
}

/// First candidate that is present and visible
pub async fn first_visible<'a>(driver: &dyn PageDriver, candidates: &'a [String]) -> Option<&'a str> {
    for candidate in candidates {
        if is_present_and_visible(driver, &Selector::css(candidate.as_str())).await {
            return Some(candidate.as_str());
        }
    }
    None
}

/// First candidate that is present and enabled
pub async fn first_enabled<'a>(driver: &dyn PageDriver, candidates: &'a [String]) -> Option<&'a str> {
    for candidate in candidates {
        if is_present_and_enabled(driver, &Selector::css(candidate.as_str())).await {
            return Some(candidate.as_str());
        }
    }
    None
}

/// Click the first present-and-visible candidate, then pause
///
/// At most one candidate is clicked per call. A candidate whose click fails
/// is skipped and the next one is tried.
pub async fn click_first_visible<'a>(
    driver: &dyn PageDriver,
    candidates: &'a [String],
    pause_ms: u64,
) -> Option<&'a str> {
    for candidate in candidates {
        let selector = Selector::css(candidate.as_str());
        if !is_present_and_visible(driver, &selector).await {
            continue;
        }
        if probe(driver.click(&selector.first())).await.is_some() {
            driver.pause(pause_ms).await;
            return Some(candidate.as_str());
        }
    }
    None
}

/// Fill the first present-and-enabled candidate
pub async fn fill_first_enabled<'a>(
    driver: &dyn PageDriver,
    candidates: &'a [String],
    text: &str,
) -> Option<&'a str> {
    for candidate in candidates {
        let selector = Selector::css(candidate.as_str());
        if !is_present_and_enabled(driver, &selector).await {
            continue;
        }
        if probe(driver.fill(&selector.first(), text)).await.is_some() {
            return Some(candidate.as_str());
        }
    }
    None
}

/// Configuration for polling operations
#[derive(Clone)]
pub struct PollConfig {
    pub timeout_ms: u64,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub use_exponential_backoff: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10000,
            initial_interval_ms: 100,
            max_interval_ms: 500,
            use_exponential_backoff: true,
        }
    }
}

/// Generic polling function with optional exponential backoff
///
/// Calls `check_fn` repeatedly until it returns `true` or timeout is reached.
/// Returns `true` if condition was met, `false` if timed out.
pub async fn wait_until<F, Fut>(check_fn: F, config: PollConfig) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    let timeout = Duration::from_millis(config.timeout_ms);
    let mut interval = config.initial_interval_ms;

    loop {
        if check_fn().await {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }

        tokio::time::sleep(Duration::from_millis(interval)).await;

        if config.use_exponential_backoff {
            interval = (interval * 3 / 2).min(config.max_interval_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{FakeDriver, FakeElement, FakePage};
    use crate::driver::traits::DriverError;

    fn candidates(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_probe_folds_errors() {
        let ok: Option<u32> = probe(async { Ok::<_, DriverError>(3) }).await;
        assert_eq!(ok, Some(3));
        let absent: Option<u32> = probe(async {
            Err(DriverError::NotFound {
                selector: "#x".into(),
            })
        })
        .await;
        assert_eq!(absent, None);
    }

    #[tokio::test]
    async fn test_click_first_visible_skips_hidden() {
        let page = FakePage::new("https://shop.test/")
            .with("#hidden", FakeElement::hidden())
            .with("#shown", FakeElement::visible());
        let driver = FakeDriver::new(page);

        let list = candidates(&["#missing", "#hidden", "#shown", "#later"]);
        let clicked = click_first_visible(&driver, &list, 500).await;

        assert_eq!(clicked, Some("#shown"));
        assert_eq!(driver.clicks(), vec!["#shown >> nth=0".to_string()]);
        assert_eq!(driver.pauses(), vec![500]);
    }

    #[tokio::test]
    async fn test_click_failure_moves_to_next_candidate() {
        let page = FakePage::new("https://shop.test/")
            .with("#broken", FakeElement::visible().failing_click())
            .with("#works", FakeElement::visible());
        let driver = FakeDriver::new(page);

        let list = candidates(&["#broken", "#works"]);
        assert_eq!(click_first_visible(&driver, &list, 0).await, Some("#works"));
    }

    #[tokio::test]
    async fn test_no_candidates_is_noop() {
        let driver = FakeDriver::new(FakePage::new("https://shop.test/"));
        let list = candidates(&["#a", "#b"]);
        assert_eq!(click_first_visible(&driver, &list, 500).await, None);
        assert!(driver.clicks().is_empty());
        assert!(driver.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_wait_until_times_out() {
        let config = PollConfig {
            timeout_ms: 30,
            initial_interval_ms: 5,
            max_interval_ms: 10,
            use_exponential_backoff: true,
        };
        assert!(!wait_until(|| async { false }, config.clone()).await);
        assert!(wait_until(|| async { true }, config).await);
    }
}
