//! Web Driver implementation using Playwright
//!
//! One browser, one isolated context, one page. Every page object in the
//! crate drives this page through the [`PageDriver`] facade.

use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::Colorize;
use log::{debug, info, warn};
use playwright::api::{Browser, BrowserContext, Page, Viewport};
use playwright::Playwright;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::driver::common::{wait_until, PollConfig};
use crate::driver::traits::{DriverError, DriverResult, LoadState, PageDriver, Selector};
use crate::utils::config::RunConfig;

/// Quiet period without new resource entries that counts as network idle
const NETWORK_QUIET_MS: u64 = 500;

/// Flags that keep platform authentication prompts (security keys,
/// Windows Hello) from blocking a fresh session
const CHROMIUM_ARGS: [&str; 7] = [
    "--disable-features=WebAuthentication",
    "--disable-webauthn",
    "--disable-usb-keyboard-detect",
    "--disable-extensions",
    "--disable-logging",
    "--disable-infobars",
    "--start-maximized",
];

/// Web browser type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserType::Chromium => "chromium",
            BrowserType::Firefox => "firefox",
            BrowserType::Webkit => "webkit",
        }
    }
}

/// Web Driver configuration
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    pub browser_type: BrowserType,
    pub headless: bool,
    /// Pacing inserted by the engine between actions
    pub slow_mo_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Timeout applied to clicks and fills
    pub action_timeout_ms: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self::from(&RunConfig::default())
    }
}

impl From<&RunConfig> for WebDriverConfig {
    fn from(config: &RunConfig) -> Self {
        Self {
            browser_type: config.browser,
            headless: config.headless,
            slow_mo_ms: config.slow_mo_ms,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            action_timeout_ms: config.timings.default_timeout_ms,
        }
    }
}

/// Web Driver using Playwright
pub struct WebDriver {
    #[allow(dead_code)]
    playwright: Arc<Playwright>,
    browser: Arc<Browser>,
    context: Arc<BrowserContext>,
    page: Arc<Mutex<Page>>,
    config: WebDriverConfig,
    closed: AtomicBool,
}

impl WebDriver {
    /// Launch a browser session
    pub async fn launch(config: WebDriverConfig) -> Result<Self> {
        let playwright = Playwright::initialize()
            .await
            .context("Failed to initialize Playwright")?;

        let browser = match config.browser_type {
            BrowserType::Chromium => launch_chromium_browser(&playwright.chromium(), &config).await?,
            BrowserType::Firefox => {
                playwright
                    .firefox()
                    .launcher()
                    .headless(config.headless)
                    .slowmo(config.slow_mo_ms as f64)
                    .launch()
                    .await?
            }
            BrowserType::Webkit => {
                playwright
                    .webkit()
                    .launcher()
                    .headless(config.headless)
                    .slowmo(config.slow_mo_ms as f64)
                    .launch()
                    .await?
            }
        };

        let context = browser
            .context_builder()
            .build()
            .await
            .context("Failed to create browser context")?;
        let page = context.new_page().await.context("Failed to open page")?;

        // Not fatal: some engines reject a viewport on maximized windows
        if let Err(e) = page
            .set_viewport_size(Viewport {
                width: config.viewport_width as i32,
                height: config.viewport_height as i32,
            })
            .await
        {
            warn!("could not set viewport size: {:?}", e);
        }

        info!(
            "{} browser session ready (headless={}, slow_mo={}ms)",
            config.browser_type.as_str(),
            config.headless,
            config.slow_mo_ms
        );

        Ok(Self {
            playwright: Arc::new(playwright),
            browser: Arc::new(browser),
            context: Arc::new(context),
            page: Arc::new(Mutex::new(page)),
            config,
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(DriverError::SessionClosed("session already closed".into()))
        } else {
            Ok(())
        }
    }

    async fn ready_state(&self) -> DriverResult<String> {
        self.ensure_open()?;
        let page = self.page.lock().await;
        page.evaluate::<(), String>("() => document.readyState", ())
            .await
            .map_err(|e| classify("document.readyState", 0, e))
    }

    async fn resource_count(&self) -> DriverResult<f64> {
        self.ensure_open()?;
        let page = self.page.lock().await;
        page.evaluate::<(), f64>(
            "() => performance.getEntriesByType('resource').length",
            (),
        )
        .await
        .map_err(|e| classify("performance entries", 0, e))
    }

    async fn wait_ready_state(&self, accept: fn(&str) -> bool, timeout_ms: u64) -> DriverResult<()> {
        let reached = wait_until(
            || async {
                self.ready_state()
                    .await
                    .map(|state| accept(&state))
                    .unwrap_or(false)
            },
            PollConfig {
                timeout_ms,
                ..PollConfig::default()
            },
        )
        .await;

        if reached {
            return Ok(());
        }
        // Surface a dead session instead of a plain timeout
        self.ready_state().await?;
        Err(DriverError::Timeout {
            selector: "document.readyState".into(),
            timeout_ms,
        })
    }

    async fn wait_network_idle(&self, timeout_ms: u64) -> DriverResult<()> {
        let start = std::time::Instant::now();
        self.wait_ready_state(|s| s == "complete", timeout_ms).await?;

        let mut last = self.resource_count().await?;
        let mut quiet_since = std::time::Instant::now();
        while start.elapsed().as_millis() < timeout_ms as u128 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            let current = self.resource_count().await?;
            if (current - last).abs() > f64::EPSILON {
                last = current;
                quiet_since = std::time::Instant::now();
            } else if quiet_since.elapsed().as_millis() >= NETWORK_QUIET_MS as u128 {
                return Ok(());
            }
        }
        Err(DriverError::Timeout {
            selector: "networkidle".into(),
            timeout_ms,
        })
    }
}

#[async_trait]
impl PageDriver for WebDriver {
    fn engine_name(&self) -> &str {
        self.config.browser_type.as_str()
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.ensure_open()?;
        let page = self.page.lock().await;
        page.goto_builder(url)
            .goto()
            .await
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                reason: format!("{:?}", e),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.ensure_open()?;
        let page = self.page.lock().await;
        page.evaluate::<(), String>("() => window.location.href", ())
            .await
            .map_err(|e| classify("window.location", 0, e))
    }

    async fn count(&self, selector: &Selector) -> DriverResult<usize> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        page.query_selector_all(&sel)
            .await
            .map(|elements| elements.len())
            .map_err(|e| classify(&sel, 0, e))
    }

    async fn is_visible(&self, selector: &Selector) -> DriverResult<bool> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        match page.query_selector(&sel).await.map_err(|e| classify(&sel, 0, e))? {
            Some(el) => el.is_visible().await.map_err(|e| classify(&sel, 0, e)),
            None => Ok(false),
        }
    }

    async fn is_enabled(&self, selector: &Selector) -> DriverResult<bool> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        match page.query_selector(&sel).await.map_err(|e| classify(&sel, 0, e))? {
            Some(el) => el.is_enabled().await.map_err(|e| classify(&sel, 0, e)),
            None => Err(DriverError::NotFound { selector: sel }),
        }
    }

    async fn wait_visible(&self, selector: &Selector, timeout_ms: u64) -> DriverResult<()> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        page.wait_for_selector_builder(&sel)
            .timeout(timeout_ms as f64)
            .wait_for_selector()
            .await
            .map(|_| ())
            .map_err(|e| classify(&sel, timeout_ms, e))
    }

    async fn click(&self, selector: &Selector) -> DriverResult<()> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        debug!("click {}", sel);
        page.click_builder(&sel)
            .timeout(self.config.action_timeout_ms as f64)
            .click()
            .await
            .map_err(|e| classify(&sel, self.config.action_timeout_ms, e))
    }

    async fn fill(&self, selector: &Selector, text: &str) -> DriverResult<()> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        page.fill_builder(&sel, text)
            .timeout(self.config.action_timeout_ms as f64)
            .fill()
            .await
            .map_err(|e| classify(&sel, self.config.action_timeout_ms, e))
    }

    async fn press(&self, selector: &Selector, key: &str) -> DriverResult<()> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        page.press_builder(&sel, key)
            .timeout(self.config.action_timeout_ms as f64)
            .press()
            .await
            .map_err(|e| classify(&sel, self.config.action_timeout_ms, e))
    }

    async fn press_global(&self, key: &str) -> DriverResult<()> {
        self.ensure_open()?;
        let page = self.page.lock().await;
        // Workaround for potential binding issue with press()
        page.keyboard
            .down(key)
            .await
            .map_err(|e| classify("keyboard", 0, e))?;
        page.keyboard
            .up(key)
            .await
            .map_err(|e| classify("keyboard", 0, e))
    }

    async fn read_attribute(
        &self,
        selector: &Selector,
        name: &str,
    ) -> DriverResult<Option<String>> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        match page.query_selector(&sel).await.map_err(|e| classify(&sel, 0, e))? {
            Some(el) => el.get_attribute(name).await.map_err(|e| classify(&sel, 0, e)),
            None => Err(DriverError::NotFound { selector: sel }),
        }
    }

    async fn read_text(&self, selector: &Selector) -> DriverResult<String> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        match page.query_selector(&sel).await.map_err(|e| classify(&sel, 0, e))? {
            Some(el) => el
                .inner_text()
                .await
                .map(|text| text.trim().to_string())
                .map_err(|e| classify(&sel, 0, e)),
            None => Err(DriverError::NotFound { selector: sel }),
        }
    }

    async fn input_value(&self, selector: &Selector) -> DriverResult<String> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        page.evaluate_on_selector::<String, _>(&sel, "el => el.value || ''", None::<String>)
            .await
            .map_err(|e| classify(&sel, 0, e))
    }

    async fn select_option(&self, selector: &Selector, value_or_label: &str) -> DriverResult<()> {
        self.ensure_open()?;
        let sel = selector.to_playwright();
        let page = self.page.lock().await;
        let js = r#"(el, wanted) => {
            const option = Array.from(el.options).find(
                o => o.value === wanted || o.textContent.trim() === wanted
            );
            if (!option) return '';
            el.value = option.value;
            el.dispatchEvent(new Event('input', { bubbles: true }));
            el.dispatchEvent(new Event('change', { bubbles: true }));
            return option.value;
        }"#;
        let chosen: String = page
            .evaluate_on_selector::<String, _>(&sel, js, Some(value_or_label.to_string()))
            .await
            .map_err(|e| classify(&sel, 0, e))?;
        if chosen.is_empty() {
            return Err(DriverError::NotFound {
                selector: format!("{} option '{}'", sel, value_or_label),
            });
        }
        Ok(())
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout_ms: u64) -> DriverResult<()> {
        match state {
            LoadState::DomContentLoaded => {
                self.wait_ready_state(|s| s != "loading", timeout_ms).await
            }
            LoadState::Load => self.wait_ready_state(|s| s == "complete", timeout_ms).await,
            LoadState::NetworkIdle => self.wait_network_idle(timeout_ms).await,
        }
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> DriverResult<()> {
        self.ensure_open()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DriverError::Driver(e.to_string()))?;
        }
        let page = self.page.lock().await;
        page.screenshot_builder()
            .path(path.to_path_buf())
            .full_page(full_page)
            .screenshot()
            .await
            .map(|_| ())
            .map_err(|e| classify("screenshot", 0, e))
    }

    async fn close(&self) -> DriverResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // Reverse acquisition order; a part that is already gone is fine
        {
            let page = self.page.lock().await;
            if let Err(e) = page.close(None).await {
                debug!("page close: {:?}", e);
            }
        }
        if let Err(e) = self.context.close().await {
            debug!("context close: {:?}", e);
        }
        if let Err(e) = self.browser.close().await {
            debug!("browser close: {:?}", e);
        }
        info!("browser session closed");
        Ok(())
    }
}

/// Map an engine error onto the driver taxonomy
fn classify<E: std::fmt::Debug>(selector: &str, timeout_ms: u64, err: E) -> DriverError {
    let message = format!("{:?}", err);
    let lower = message.to_lowercase();
    if lower.contains("timeout") {
        DriverError::Timeout {
            selector: selector.to_string(),
            timeout_ms,
        }
    } else if lower.contains("closed") || lower.contains("receiverclosed") {
        DriverError::SessionClosed(message)
    } else {
        DriverError::Driver(message)
    }
}

/// Launch a new Chromium browser with the anti-prompt flags
async fn launch_chromium_browser(
    chromium: &playwright::api::BrowserType,
    config: &WebDriverConfig,
) -> Result<playwright::api::Browser> {
    let mut launcher = chromium
        .launcher()
        .headless(config.headless)
        .slowmo(config.slow_mo_ms as f64);

    let env_path = std::env::var("PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH")
        .ok()
        .map(std::path::PathBuf::from);
    let executable = env_path.or_else(find_system_browser);

    if let Some(ref path) = executable {
        println!("{} Using browser: {}", "🌐".blue(), path.display());
        launcher = launcher.executable(path);
    } else {
        println!(
            "{} No browser executable found. Attempting default launch...",
            "ℹ".blue()
        );
    }

    let args: Vec<String> = CHROMIUM_ARGS.iter().map(|s| s.to_string()).collect();
    launcher = launcher.args(&args);

    Ok(launcher.launch().await?)
}

fn find_system_browser() -> Option<std::path::PathBuf> {
    let common_paths = [
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
    ];

    common_paths
        .iter()
        .map(std::path::Path::new)
        .find(|p| p.exists())
        .map(|p| p.to_path_buf())
}
