use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Element selector understood by the page driver
///
/// Raw selectors are passed to the browser engine as-is; the structured
/// variants compose them into engine selector chains.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Engine selector string (CSS, `text=`, `xpath=` or a `>>` chain)
    Css(String),
    /// Accessible role with accessible name
    Role { role: String, name: String },
    /// Visible text, substring match unless `exact`
    Text { text: String, exact: bool },
    /// The `index`-th (0-based) match of `base`
    Nth { base: Box<Selector>, index: usize },
    /// `inner` resolved relative to the first match of `scope`
    Within {
        scope: Box<Selector>,
        inner: Box<Selector>,
    },
}

impl Selector {
    pub fn css(selector: impl Into<String>) -> Self {
        Selector::Css(selector.into())
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Selector::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Selector::Text {
            text: text.into(),
            exact: false,
        }
    }

    pub fn nth(&self, index: usize) -> Self {
        Selector::Nth {
            base: Box::new(self.clone()),
            index,
        }
    }

    pub fn first(&self) -> Self {
        self.nth(0)
    }

    pub fn within(&self, inner: Selector) -> Self {
        Selector::Within {
            scope: Box::new(self.clone()),
            inner: Box::new(inner),
        }
    }

    /// Render as a Playwright selector string
    pub fn to_playwright(&self) -> String {
        match self {
            Selector::Css(css) => css.clone(),
            Selector::Role { role, name } => {
                format!("role={}[name=\"{}\"]", role, name.replace('"', "\\\""))
            }
            Selector::Text { text, exact } => {
                if *exact {
                    format!("text=\"{}\"", text.replace('"', "\\\""))
                } else {
                    format!("text={}", text)
                }
            }
            Selector::Nth { base, index } => format!("{} >> nth={}", base.to_playwright(), index),
            Selector::Within { scope, inner } => {
                format!("{} >> {}", scope.to_playwright(), inner.to_playwright())
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_playwright())
    }
}

impl From<&str> for Selector {
    fn from(s: &str) -> Self {
        Selector::css(s)
    }
}

impl From<&String> for Selector {
    fn from(s: &String) -> Self {
        Selector::css(s.as_str())
    }
}

/// Document lifecycle states a page can be waited on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    DomContentLoaded,
    Load,
    NetworkIdle,
}

/// Failure conditions reported by a page driver
#[derive(Debug, Clone, Error)]
pub enum DriverError {
    #[error("element not found: {selector}")]
    NotFound { selector: String },

    #[error("timed out after {timeout_ms}ms waiting for {selector}")]
    Timeout { selector: String, timeout_ms: u64 },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("browser session closed: {0}")]
    SessionClosed(String),

    #[error("driver error: {0}")]
    Driver(String),
}

impl DriverError {
    /// The element simply was not there (or not in time)
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            DriverError::NotFound { .. } | DriverError::Timeout { .. }
        )
    }

    pub fn is_session_lost(&self) -> bool {
        matches!(self, DriverError::SessionClosed(_))
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Capability facade over one browser page
///
/// Every element operation acts on the first element matching the selector.
/// Page objects are written against this trait only, so a scripted fake can
/// stand in for the browser in tests.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Engine name (e.g. "chromium")
    fn engine_name(&self) -> &str;

    /// Navigate the page to `url`
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// URL currently shown by the page
    async fn current_url(&self) -> DriverResult<String>;

    /// Number of elements matching the selector
    async fn count(&self, selector: &Selector) -> DriverResult<usize>;

    /// Whether the first match is visible. A missing element is not visible.
    async fn is_visible(&self, selector: &Selector) -> DriverResult<bool>;

    /// Whether the first match is enabled. A missing element is `NotFound`.
    async fn is_enabled(&self, selector: &Selector) -> DriverResult<bool>;

    /// Wait until the first match becomes visible
    async fn wait_visible(&self, selector: &Selector, timeout_ms: u64) -> DriverResult<()>;

    async fn click(&self, selector: &Selector) -> DriverResult<()>;

    /// Replace the value of an input
    async fn fill(&self, selector: &Selector, text: &str) -> DriverResult<()>;

    /// Press a key with the element focused
    async fn press(&self, selector: &Selector, key: &str) -> DriverResult<()>;

    /// Press a key on whatever currently has focus
    async fn press_global(&self, key: &str) -> DriverResult<()>;

    /// Attribute value of the first match, `None` if the attribute is absent
    async fn read_attribute(&self, selector: &Selector, name: &str)
        -> DriverResult<Option<String>>;

    /// Trimmed inner text of the first match
    async fn read_text(&self, selector: &Selector) -> DriverResult<String>;

    /// Current value of an input or select control
    async fn input_value(&self, selector: &Selector) -> DriverResult<String>;

    /// Choose the option whose value or label equals `value_or_label`
    async fn select_option(&self, selector: &Selector, value_or_label: &str) -> DriverResult<()>;

    /// Wait for the page to reach a lifecycle state
    async fn wait_for_load_state(&self, state: LoadState, timeout_ms: u64) -> DriverResult<()>;

    /// Save a PNG screenshot of the page (or only the viewport)
    async fn screenshot(&self, path: &Path, full_page: bool) -> DriverResult<()>;

    /// Fixed pause between actions
    async fn pause(&self, ms: u64) {
        tokio::time::sleep(tokio::time::Duration::from_millis(ms)).await;
    }

    /// Release page, context and browser. Safe to call more than once.
    async fn close(&self) -> DriverResult<()>;
}
