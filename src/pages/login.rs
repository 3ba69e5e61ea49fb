use async_trait::async_trait;
use log::{debug, info, warn};

use super::{dismiss_one, navigate_or_stay, visible_within, PageObject};
use crate::driver::common::{
    click_first_visible, fill_first_enabled, first_visible, is_present_and_visible, probe,
};
use crate::driver::traits::{PageDriver, Selector};
use crate::utils::config::RunConfig;
use crate::utils::selectors::LoginSelectors;

/// Sign-in page and the screens that follow it
pub struct LoginPage<'a> {
    driver: &'a dyn PageDriver,
    config: &'a RunConfig,
}

impl<'a> LoginPage<'a> {
    pub fn new(driver: &'a dyn PageDriver, config: &'a RunConfig) -> Self {
        Self { driver, config }
    }

    fn selectors(&self) -> &'a LoginSelectors {
        &self.config.selectors.login
    }

    fn on_sign_in_domain(&self, url: &str) -> bool {
        url.starts_with(&self.config.sign_in_domain_prefix)
    }

    pub async fn open(&self) -> bool {
        navigate_or_stay(self.driver, self.name(), &self.config.sign_in_url).await;
        self.is_loaded().await
    }

    pub async fn dismiss_initial_popups(&self) -> bool {
        dismiss_one(
            self.driver,
            self.name(),
            &self.selectors().initial_popups,
            self.config.timings.dismiss_pause_ms,
        )
        .await
    }

    /// Fill the username, with "first input on the page" as last resort
    pub async fn enter_username(&self, username: &str) -> bool {
        let selectors = self.selectors();
        if let Some(used) = fill_first_enabled(self.driver, &selectors.username_fields, username).await {
            debug!("username entered via {}", used);
            return true;
        }
        self.fill_fallback(&selectors.username_fallback, username).await
    }

    pub async fn enter_password(&self, password: &str) -> bool {
        let selectors = self.selectors();
        if let Some(used) = fill_first_enabled(self.driver, &selectors.password_fields, password).await {
            debug!("password entered via {}", used);
            return true;
        }
        self.fill_fallback(&selectors.password_fallback, password).await
    }

    async fn fill_fallback(&self, fallback: &str, text: &str) -> bool {
        let selector = Selector::css(fallback);
        if probe(self.driver.count(&selector)).await.unwrap_or(0) == 0 {
            warn!("no field found for fallback selector {}", fallback);
            return false;
        }
        probe(self.driver.fill(&selector.first(), text)).await.is_some()
    }

    /// Two-step sign-in: click "continue" and wait for the password field
    pub async fn click_continue(&self) -> bool {
        let selectors = self.selectors();
        let Some(used) = first_visible(self.driver, &selectors.continue_buttons).await else {
            return false;
        };
        if probe(self.driver.click(&Selector::css(used).first())).await.is_none() {
            return false;
        }
        let password_any = Selector::css(selectors.password_fields.join(", "));
        if !visible_within(self.driver, &password_any, self.config.timings.password_wait_ms).await {
            debug!("password field did not appear after continue");
        }
        true
    }

    pub async fn submit_login(&self) -> bool {
        let submit = Selector::css(self.selectors().submit.as_str());
        match self.driver.click(&submit).await {
            Ok(()) => true,
            Err(e) => {
                warn!("could not submit sign-in form: {}", e);
                false
            }
        }
    }

    /// "Simplify your sign-in" prompt
    pub async fn skip_simplify_prompt(&self) -> bool {
        let skip = std::slice::from_ref(&self.selectors().skip_simplify);
        click_first_visible(self.driver, skip, self.config.timings.post_login_pause_ms)
            .await
            .is_some()
    }

    /// Screens shown right after the password step, first visible wins
    pub async fn handle_post_login_flow(&self) -> bool {
        click_first_visible(
            self.driver,
            &self.selectors().post_login_buttons,
            self.config.timings.post_login_pause_ms,
        )
        .await
        .is_some()
    }

    pub async fn close_post_login_popups(&self) -> bool {
        dismiss_one(
            self.driver,
            self.name(),
            &self.selectors().post_login_close,
            self.config.timings.dismiss_pause_ms,
        )
        .await
    }

    /// Whether the session looks signed in
    ///
    /// A visible account control is a positive signal; the sign-in domain or
    /// a username field is a negative one. With neither, the answer is `true`.
    pub async fn is_logged_in(&self) -> bool {
        let selectors = self.selectors();
        for candidate in &selectors.account_indicators {
            if is_present_and_visible(self.driver, &Selector::css(candidate.as_str())).await {
                debug!("signed-in indicator visible: {}", candidate);
                return true;
            }
        }

        let Some(url) = probe(self.driver.current_url()).await else {
            return false;
        };
        if self.on_sign_in_domain(&url) {
            return false;
        }
        let ready = Selector::css(selectors.ready_field.as_str());
        if probe(self.driver.count(&ready)).await.unwrap_or(0) > 0 {
            return false;
        }

        warn!("no sign-in signal either way on {}, assuming signed in", url);
        true
    }

    /// Full sign-in; returns the final verdict
    pub async fn login_sequence(&self, username: &str, password: &str) -> bool {
        self.open().await;
        self.dismiss_initial_popups().await;

        if self.is_logged_in().await {
            info!("session already signed in, skipping credentials");
            self.return_to_home().await;
            return true;
        }

        self.enter_username(username).await;
        self.click_continue().await;
        self.enter_password(password).await;
        self.submit_login().await;

        self.skip_simplify_prompt().await;
        self.handle_post_login_flow().await;
        self.close_post_login_popups().await;

        self.driver.pause(self.config.timings.settle_pause_ms).await;
        self.return_to_home().await;

        match probe(self.driver.current_url()).await {
            Some(url) if self.on_sign_in_domain(&url) => {
                warn!("still on sign-in page after login: {}", url);
                false
            }
            _ => self.is_logged_in().await,
        }
    }

    async fn return_to_home(&self) {
        if navigate_or_stay(self.driver, self.name(), &self.config.base_url).await {
            self.dismiss_initial_popups().await;
            self.close_post_login_popups().await;
        }
    }
}

#[async_trait]
impl PageObject for LoginPage<'_> {
    fn name(&self) -> &'static str {
        "login"
    }

    async fn is_loaded(&self) -> bool {
        let ready = Selector::css(self.selectors().ready_field.as_str());
        visible_within(self.driver, &ready, self.config.timings.load_check_ms).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::fake::{FakeDriver, FakeElement, FakePage};

    const SIGN_IN: &str = "https://signin.ebay.com/";
    const HOME: &str = "https://www.ebay.com";

    #[tokio::test]
    async fn test_already_signed_in_skips_credentials() {
        let driver = FakeDriver::blank()
            .with_page(FakePage::new(SIGN_IN).with("#gh-ug", FakeElement::visible()))
            .with_page(FakePage::new(HOME).with("#gh-ug", FakeElement::visible()));
        let config = RunConfig::default();

        let ok = LoginPage::new(&driver, &config)
            .login_sequence("alice", "secret")
            .await;

        assert!(ok);
        assert!(driver.fills().is_empty());
        assert_eq!(driver.navigations(), vec![SIGN_IN.to_string(), HOME.to_string()]);
    }

    #[tokio::test]
    async fn test_two_step_sign_in() {
        let sign_in = FakePage::new(SIGN_IN)
            .with("input#userid", FakeElement::visible())
            .with(
                "button#signin-continue-btn",
                FakeElement::visible().reveals("input#pass"),
            )
            .with("input#pass", FakeElement::hidden())
            .with("button#sgnBt", FakeElement::visible().navigates_to(HOME));
        let driver = FakeDriver::blank()
            .with_page(sign_in)
            .with_page(FakePage::new(HOME).with("#gh-ug", FakeElement::visible()));
        let config = RunConfig::default();

        let ok = LoginPage::new(&driver, &config)
            .login_sequence("alice", "secret")
            .await;

        assert!(ok);
        assert_eq!(
            driver.fills(),
            vec![
                ("input#userid >> nth=0".to_string(), "alice".to_string()),
                ("input#pass >> nth=0".to_string(), "secret".to_string()),
            ]
        );
        assert!(driver.clicks().contains(&"button#sgnBt".to_string()));
        assert!(driver.pauses().contains(&2_000));
    }

    #[tokio::test]
    async fn test_still_on_sign_in_domain_fails() {
        let sign_in = FakePage::new(SIGN_IN)
            .with("input#userid", FakeElement::visible())
            .with("input#pass", FakeElement::visible())
            .with("button#sgnBt", FakeElement::visible());
        let driver = FakeDriver::blank()
            .with_page(sign_in)
            .failing_navigation(HOME);
        let config = RunConfig::default();

        let ok = LoginPage::new(&driver, &config)
            .login_sequence("alice", "wrong")
            .await;

        assert!(!ok);
    }

    #[tokio::test]
    async fn test_username_fallback_fills_first_input() {
        let page = FakePage::new(SIGN_IN).with("input", FakeElement::visible().count(3));
        let driver = FakeDriver::new(page);
        let config = RunConfig::default();

        assert!(LoginPage::new(&driver, &config).enter_username("bob").await);
        assert_eq!(
            driver.fills(),
            vec![("input >> nth=0".to_string(), "bob".to_string())]
        );
    }

    #[tokio::test]
    async fn test_is_logged_in_signals() {
        let config = RunConfig::default();

        let on_sign_in = FakeDriver::new(FakePage::new("https://signin.ebay.co.uk/x"));
        assert!(!LoginPage::new(&on_sign_in, &config).is_logged_in().await);

        let form_shown = FakeDriver::new(
            FakePage::new("https://www.ebay.com/").with("input#userid", FakeElement::visible()),
        );
        assert!(!LoginPage::new(&form_shown, &config).is_logged_in().await);

        let no_signal = FakeDriver::new(FakePage::new("https://www.ebay.com/"));
        assert!(LoginPage::new(&no_signal, &config).is_logged_in().await);
    }

    #[tokio::test]
    async fn test_post_login_flow_clicks_once() {
        let page = FakePage::new(HOME)
            .with("button:has-text('Continue')", FakeElement::visible())
            .with("button:has-text('Not now')", FakeElement::visible());
        let driver = FakeDriver::new(page);
        let config = RunConfig::default();

        assert!(LoginPage::new(&driver, &config).handle_post_login_flow().await);
        assert_eq!(
            driver.clicks(),
            vec!["button:has-text('Continue') >> nth=0".to_string()]
        );
        assert_eq!(driver.pauses(), vec![1_000]);
    }
}
