//! Scripted in-memory page driver for tests
//!
//! Pages are keyed by URL; navigating to a registered URL loads a fresh copy
//! of that page, anything else yields a blank page. Element state is looked
//! up by the rendered selector string, with `nth=` of a registered list
//! falling back to the list's own state.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::{DriverError, DriverResult, LoadState, PageDriver, Selector};

#[derive(Debug, Clone, PartialEq)]
pub enum ClickEffect {
    Nothing,
    /// Load another registered page
    Navigate(String),
    /// Make an element on the current page visible
    Reveal(String),
    Fail,
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub count: usize,
    pub visible: bool,
    pub enabled: bool,
    pub text: String,
    pub value: String,
    pub attributes: HashMap<String, String>,
    pub on_click: ClickEffect,
    /// Waiting on this element tears the session down
    pub closes_session_on_wait: bool,
}

impl FakeElement {
    pub fn visible() -> Self {
        Self {
            count: 1,
            visible: true,
            enabled: true,
            text: String::new(),
            value: String::new(),
            attributes: HashMap::new(),
            on_click: ClickEffect::Nothing,
            closes_session_on_wait: false,
        }
    }

    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::visible()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn navigates_to(mut self, url: &str) -> Self {
        self.on_click = ClickEffect::Navigate(url.to_string());
        self
    }

    pub fn reveals(mut self, selector: &str) -> Self {
        self.on_click = ClickEffect::Reveal(selector.to_string());
        self
    }

    pub fn failing_click(mut self) -> Self {
        self.on_click = ClickEffect::Fail;
        self
    }

    pub fn closes_session_on_wait(mut self) -> Self {
        self.closes_session_on_wait = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakePage {
    pub url: String,
    pub elements: HashMap<String, FakeElement>,
}

impl FakePage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            elements: HashMap::new(),
        }
    }

    pub fn with(mut self, selector: &str, element: FakeElement) -> Self {
        self.elements.insert(selector.to_string(), element);
        self
    }

    /// Register a list of links, each carrying its href
    pub fn with_links(mut self, selector: &str, hrefs: &[&str]) -> Self {
        self.elements.insert(
            selector.to_string(),
            FakeElement::visible().count(hrefs.len()),
        );
        let base = Selector::css(selector);
        for (i, href) in hrefs.iter().enumerate() {
            self.elements.insert(
                base.nth(i).to_playwright(),
                FakeElement::visible().attr("href", href),
            );
        }
        self
    }

    fn resolve(&self, selector: &Selector) -> Option<FakeElement> {
        if let Some(el) = self.elements.get(&selector.to_playwright()) {
            return Some(el.clone());
        }
        match selector {
            Selector::Nth { base, index } => {
                let list = self.resolve(base)?;
                (*index < list.count).then(|| FakeElement { count: 1, ..list })
            }
            _ => None,
        }
    }
}

/// Interactions recorded by the fake
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Navigate(String),
    Click(String),
    Fill(String, String),
    Press(String, String),
    PressGlobal(String),
    Select(String, String),
    Wait(String),
    Pause(u64),
    Screenshot(PathBuf, bool),
    Close,
}

struct FakeState {
    pages: HashMap<String, FakePage>,
    current: FakePage,
    closed: bool,
    failing_navigation: HashSet<String>,
    full_page_screenshot_fails: bool,
    screenshot_fails: bool,
    calls: Vec<Call>,
}

pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub fn new(start: FakePage) -> Self {
        Self {
            state: Mutex::new(FakeState {
                pages: HashMap::new(),
                current: start,
                closed: false,
                failing_navigation: HashSet::new(),
                full_page_screenshot_fails: false,
                screenshot_fails: false,
                calls: Vec::new(),
            }),
        }
    }

    /// Blank page on about:blank
    pub fn blank() -> Self {
        Self::new(FakePage::new("about:blank"))
    }

    pub fn with_page(self, page: FakePage) -> Self {
        self.lock().pages.insert(page.url.clone(), page);
        self
    }

    pub fn failing_navigation(self, url: &str) -> Self {
        self.lock().failing_navigation.insert(url.to_string());
        self
    }

    pub fn failing_full_page_screenshots(self) -> Self {
        self.lock().full_page_screenshot_fails = true;
        self
    }

    pub fn failing_screenshots(self) -> Self {
        {
            let mut state = self.lock();
            state.full_page_screenshot_fails = true;
            state.screenshot_fails = true;
        }
        self
    }

    pub fn tear_down(&self) {
        self.lock().closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.filter_calls(|c| match c {
            Call::Click(s) => Some(s.clone()),
            _ => None,
        })
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.filter_calls(|c| match c {
            Call::Fill(s, v) => Some((s.clone(), v.clone())),
            _ => None,
        })
    }

    pub fn navigations(&self) -> Vec<String> {
        self.filter_calls(|c| match c {
            Call::Navigate(u) => Some(u.clone()),
            _ => None,
        })
    }

    pub fn pauses(&self) -> Vec<u64> {
        self.filter_calls(|c| match c {
            Call::Pause(ms) => Some(*ms),
            _ => None,
        })
    }

    pub fn screenshots(&self) -> Vec<(PathBuf, bool)> {
        self.filter_calls(|c| match c {
            Call::Screenshot(p, full) => Some((p.clone(), *full)),
            _ => None,
        })
    }

    fn filter_calls<T>(&self, f: impl Fn(&Call) -> Option<T>) -> Vec<T> {
        self.lock().calls.iter().filter_map(f).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve an element, failing when the session is gone
    fn element(&self, selector: &Selector) -> DriverResult<Option<FakeElement>> {
        let state = self.lock();
        if state.closed {
            return Err(DriverError::SessionClosed("fake session torn down".into()));
        }
        Ok(state.current.resolve(selector))
    }

    fn require(&self, selector: &Selector) -> DriverResult<FakeElement> {
        self.element(selector)?.ok_or_else(|| DriverError::NotFound {
            selector: selector.to_playwright(),
        })
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl PageDriver for FakeDriver {
    fn engine_name(&self) -> &str {
        "fake"
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.record(Call::Navigate(url.to_string()));
        let mut state = self.lock();
        if state.closed {
            return Err(DriverError::SessionClosed("fake session torn down".into()));
        }
        if state.failing_navigation.contains(url) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                reason: "scripted failure".into(),
            });
        }
        state.current = state
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| FakePage::new(url));
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        let state = self.lock();
        if state.closed {
            return Err(DriverError::SessionClosed("fake session torn down".into()));
        }
        Ok(state.current.url.clone())
    }

    async fn count(&self, selector: &Selector) -> DriverResult<usize> {
        Ok(self.element(selector)?.map_or(0, |el| el.count))
    }

    async fn is_visible(&self, selector: &Selector) -> DriverResult<bool> {
        Ok(self
            .element(selector)?
            .map_or(false, |el| el.count > 0 && el.visible))
    }

    async fn is_enabled(&self, selector: &Selector) -> DriverResult<bool> {
        Ok(self.require(selector)?.enabled)
    }

    async fn wait_visible(&self, selector: &Selector, timeout_ms: u64) -> DriverResult<()> {
        self.record(Call::Wait(selector.to_playwright()));
        let element = self.element(selector)?;
        match element {
            Some(el) if el.closes_session_on_wait => {
                self.tear_down();
                Err(DriverError::SessionClosed("page closed while waiting".into()))
            }
            Some(el) if el.count > 0 && el.visible => Ok(()),
            _ => Err(DriverError::Timeout {
                selector: selector.to_playwright(),
                timeout_ms,
            }),
        }
    }

    async fn click(&self, selector: &Selector) -> DriverResult<()> {
        self.record(Call::Click(selector.to_playwright()));
        let el = self.require(selector)?;
        if !el.visible {
            return Err(DriverError::Timeout {
                selector: selector.to_playwright(),
                timeout_ms: 0,
            });
        }
        match el.on_click {
            ClickEffect::Nothing => Ok(()),
            ClickEffect::Fail => Err(DriverError::Driver("element not clickable".into())),
            ClickEffect::Navigate(url) => {
                let mut state = self.lock();
                state.current = state
                    .pages
                    .get(&url)
                    .cloned()
                    .unwrap_or_else(|| FakePage::new(&url));
                Ok(())
            }
            ClickEffect::Reveal(target) => {
                let mut state = self.lock();
                let entry = state
                    .current
                    .elements
                    .entry(target)
                    .or_insert_with(FakeElement::hidden);
                entry.visible = true;
                entry.count = entry.count.max(1);
                Ok(())
            }
        }
    }

    async fn fill(&self, selector: &Selector, text: &str) -> DriverResult<()> {
        self.record(Call::Fill(selector.to_playwright(), text.to_string()));
        let el = self.require(selector)?;
        if !el.visible || !el.enabled {
            return Err(DriverError::Timeout {
                selector: selector.to_playwright(),
                timeout_ms: 0,
            });
        }
        Ok(())
    }

    async fn press(&self, selector: &Selector, key: &str) -> DriverResult<()> {
        self.record(Call::Press(selector.to_playwright(), key.to_string()));
        self.require(selector).map(|_| ())
    }

    async fn press_global(&self, key: &str) -> DriverResult<()> {
        self.record(Call::PressGlobal(key.to_string()));
        self.element(&Selector::css("body")).map(|_| ())
    }

    async fn read_attribute(
        &self,
        selector: &Selector,
        name: &str,
    ) -> DriverResult<Option<String>> {
        Ok(self.require(selector)?.attributes.get(name).cloned())
    }

    async fn read_text(&self, selector: &Selector) -> DriverResult<String> {
        Ok(self.require(selector)?.text.trim().to_string())
    }

    async fn input_value(&self, selector: &Selector) -> DriverResult<String> {
        Ok(self.require(selector)?.value)
    }

    async fn select_option(&self, selector: &Selector, value_or_label: &str) -> DriverResult<()> {
        self.record(Call::Select(
            selector.to_playwright(),
            value_or_label.to_string(),
        ));
        self.require(selector)?;
        let mut state = self.lock();
        if let Some(el) = state.current.elements.get_mut(&selector.to_playwright()) {
            el.value = value_or_label.to_string();
        }
        Ok(())
    }

    async fn wait_for_load_state(&self, _state: LoadState, _timeout_ms: u64) -> DriverResult<()> {
        self.element(&Selector::css("html")).map(|_| ())
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> DriverResult<()> {
        self.record(Call::Screenshot(path.to_path_buf(), full_page));
        let (full_fails, any_fails) = {
            let state = self.lock();
            (state.full_page_screenshot_fails, state.screenshot_fails)
        };
        if any_fails || (full_page && full_fails) {
            return Err(DriverError::Driver("screenshot failed".into()));
        }
        std::fs::write(path, b"fake-png").map_err(|e| DriverError::Driver(e.to_string()))
    }

    async fn pause(&self, ms: u64) {
        self.record(Call::Pause(ms));
    }

    async fn close(&self) -> DriverResult<()> {
        self.record(Call::Close);
        self.tear_down();
        Ok(())
    }
}
