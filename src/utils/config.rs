use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::selectors::SiteSelectors;
use crate::driver::web::BrowserType;

/// Errors raised while loading the run configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("invalid item href pattern '{pattern}': {source}")]
    ItemPattern {
        pattern: String,
        source: regex::Error,
    },

    #[error("timing '{0}' must be greater than zero")]
    ZeroTiming(&'static str),
}

/// Wait budgets and pauses, all in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Timings {
    /// Default timeout for element actions
    pub default_timeout_ms: u64,

    /// Short visibility wait behind every `is_loaded` check
    pub load_check_ms: u64,

    /// Pause after clicking a dialog away
    pub dismiss_pause_ms: u64,

    pub post_login_pause_ms: u64,
    pub settle_pause_ms: u64,
    pub password_wait_ms: u64,
    pub product_load_ms: u64,
    pub confirmation_ms: u64,
    pub network_idle_ms: u64,
    pub dom_ready_ms: u64,
    pub add_to_cart_settle_ms: u64,

    /// Upper bound on result pages visited while collecting items
    pub max_pages: usize,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            default_timeout_ms: 20_000,
            load_check_ms: 5_000,
            dismiss_pause_ms: 500,
            post_login_pause_ms: 1_000,
            settle_pause_ms: 2_000,
            password_wait_ms: 10_000,
            product_load_ms: 10_000,
            confirmation_ms: 8_000,
            network_idle_ms: 10_000,
            dom_ready_ms: 10_000,
            add_to_cart_settle_ms: 300,
            max_pages: 5,
        }
    }
}

/// Run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunConfig {
    pub base_url: String,
    pub sign_in_url: String,
    /// A current URL starting with this prefix means we are still on sign-in
    pub sign_in_domain_prefix: String,
    pub cart_url: String,

    pub browser: BrowserType,
    pub headless: bool,
    pub slow_mo_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,

    pub scenarios_path: PathBuf,
    pub users_path: PathBuf,
    pub results_dir: PathBuf,
    pub photos_dir: PathBuf,

    pub timings: Timings,
    pub selectors: SiteSelectors,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ebay.com".to_string(),
            sign_in_url: "https://signin.ebay.com/".to_string(),
            sign_in_domain_prefix: "https://signin.ebay.".to_string(),
            cart_url: "https://cart.ebay.com/".to_string(),
            browser: BrowserType::Chromium,
            headless: false,
            slow_mo_ms: 1_000,
            viewport_width: 1920,
            viewport_height: 1080,
            scenarios_path: PathBuf::from("data/test_scenarios.json"),
            users_path: PathBuf::from("data/users.json"),
            results_dir: PathBuf::from("results"),
            photos_dir: PathBuf::from("photos"),
            timings: Timings::default(),
            selectors: SiteSelectors::default(),
        }
    }
}

impl RunConfig {
    /// Load configuration from an optional YAML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document means "all defaults"
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("CART_TESTER_HEADLESS") {
            self.headless = v == "true" || v == "1";
        }
        if let Ok(url) = std::env::var("CART_TESTER_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pattern = &self.selectors.results.item_href_pattern;
        regex::Regex::new(pattern).map_err(|source| ConfigError::ItemPattern {
            pattern: pattern.clone(),
            source,
        })?;

        let t = &self.timings;
        let checks = [
            ("defaultTimeoutMs", t.default_timeout_ms),
            ("loadCheckMs", t.load_check_ms),
            ("productLoadMs", t.product_load_ms),
            ("confirmationMs", t.confirmation_ms),
            ("maxPages", t.max_pages as u64),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ConfigError::ZeroTiming(name));
            }
        }
        Ok(())
    }
}
