//! Browser session handle.
//!
//! A [`Browser`] pairs a [`WebDriver`] with its session state: the
//! immutable [`Config`], the shared wait [`Timer`], and the current
//! browsing-context flag. Handles are cheap `Arc` clones; element
//! handles created from a browser keep the session alive.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::driver::{ScriptArg, WebDriver};
use crate::element::{Element, ElementKind, Scope};
use crate::error::{Error, Result};
use crate::selector::Selector;
use crate::wait::Timer;

// ============================================================================
// Browser
// ============================================================================

struct BrowserInner {
    driver: Arc<dyn WebDriver>,
    config: Config,
    timer: Timer,
    /// Whether the driver is known to be in the top-level context.
    default_context: Mutex<bool>,
    closed: Mutex<bool>,
}

/// A handle to one browser session.
#[derive(Clone)]
pub struct Browser {
    inner: Arc<BrowserInner>,
}

impl Browser {
    /// Wraps a driver with the given session configuration.
    pub fn new(driver: Arc<dyn WebDriver>, config: Config) -> Self {
        Browser {
            inner: Arc::new(BrowserInner {
                driver,
                config,
                timer: Timer::new(),
                default_context: Mutex::new(true),
                closed: Mutex::new(false),
            }),
        }
    }

    /// Wraps a driver with default configuration.
    pub fn with_defaults(driver: Arc<dyn WebDriver>) -> Self {
        Self::new(driver, Config::default())
    }

    pub fn config(&self) -> Config {
        self.inner.config
    }

    pub fn driver(&self) -> Arc<dyn WebDriver> {
        self.inner.driver.clone()
    }

    pub fn timer(&self) -> &Timer {
        &self.inner.timer
    }

    // ------------------------------------------------------------------
    // Context bookkeeping
    // ------------------------------------------------------------------

    pub(crate) fn in_default_context(&self) -> bool {
        *self.inner.default_context.lock()
    }

    pub(crate) fn set_default_context(&self, value: bool) {
        *self.inner.default_context.lock() = value;
    }

    /// Switches the driver back to the top-level document when some
    /// frame context is active.
    pub(crate) async fn ensure_default_context(&self) -> Result<()> {
        self.assert_open()?;
        if self.in_default_context() {
            return Ok(());
        }
        self.inner
            .driver
            .switch_to_default_content()
            .await
            .map_err(Error::Driver)?;
        self.set_default_context(true);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Session state
    // ------------------------------------------------------------------

    /// Marks the session closed; further operations fail fast.
    pub fn close(&self) {
        *self.inner.closed.lock() = true;
    }

    pub(crate) fn assert_open(&self) -> Result<()> {
        if *self.inner.closed.lock() {
            return Err(Error::no_matching_window("browser window was closed"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Navigation and page state
    // ------------------------------------------------------------------

    /// Navigates to `url`, defaulting the scheme to `http://` for bare
    /// host names.
    pub async fn goto(&self, url: impl AsRef<str>) -> Result<()> {
        self.assert_open()?;
        let url = url.as_ref();
        let resolved = match Url::parse(url) {
            Ok(parsed) => parsed.to_string(),
            Err(_) => format!("http://{url}"),
        };
        debug!(url = %resolved, "navigating");
        self.inner
            .driver
            .navigate(&resolved)
            .await
            .map_err(Error::Driver)
    }

    pub async fn url(&self) -> Result<String> {
        self.assert_open()?;
        self.inner.driver.current_url().await.map_err(Error::Driver)
    }

    pub async fn title(&self) -> Result<String> {
        self.assert_open()?;
        self.inner.driver.title().await.map_err(Error::Driver)
    }

    /// Visible text of the page body.
    pub async fn text(&self) -> Result<String> {
        self.element(Selector::new().tag_name("body")).text().await
    }

    /// The document's `readyState`.
    pub async fn ready_state(&self) -> Result<String> {
        let value = self.execute_script("return document.readyState").await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Waits until the document reports `complete`.
    pub async fn wait_for_ready(&self) -> Result<()> {
        self.wait_until(Some("waiting for the page to load"), || async {
            Ok(self.ready_state().await? == "complete")
        })
        .await
    }

    /// Runs a script in the page, without element arguments.
    pub async fn execute_script(&self, script: impl AsRef<str>) -> Result<Value> {
        self.assert_open()?;
        self.ensure_default_context().await?;
        self.inner
            .driver
            .execute_script(script.as_ref(), &[] as &[ScriptArg])
            .await
            .map_err(Error::Driver)
    }

    // ------------------------------------------------------------------
    // Waits
    // ------------------------------------------------------------------

    /// Polls `condition` until true, on the session budget.
    pub async fn wait_until<F, Fut>(&self, message: Option<&str>, condition: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        crate::wait::until(
            &self.inner.timer,
            self.inner.config.timeout,
            self.inner.config.poll_interval,
            message,
            condition,
        )
        .await
    }

    /// Polls `condition` until false, on the session budget.
    pub async fn wait_while<F, Fut>(&self, message: Option<&str>, condition: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        crate::wait::while_(
            &self.inner.timer,
            self.inner.config.timeout,
            self.inner.config.poll_interval,
            message,
            condition,
        )
        .await
    }

    // ------------------------------------------------------------------
    // Element handles
    // ------------------------------------------------------------------

    fn handle(&self, selector: Selector, kind: ElementKind) -> Element {
        Element::new(Scope::Browser(self.clone()), selector, kind)
    }

    pub fn element(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::Generic)
    }

    pub fn button(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::Button)
    }

    pub fn link(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::Link)
    }

    pub fn text_field(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::TextField)
    }

    pub fn text_area(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::TextArea)
    }

    pub fn select(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::Select)
    }

    pub fn option(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::SelectOption)
    }

    pub fn checkbox(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::Checkbox)
    }

    pub fn radio(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::Radio)
    }

    pub fn iframe(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::IFrame)
    }

    pub fn row(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::Row)
    }

    pub fn cell(&self, selector: Selector) -> Element {
        self.handle(selector, ElementKind::Cell)
    }

    /// All matches for a selector, as independent handles pinned by
    /// index.
    pub async fn elements(&self, selector: Selector) -> Result<Vec<Element>> {
        self.ensure_default_context().await?;
        let found = crate::locator::locate_all(
            self.inner.driver.as_ref(),
            None,
            None,
            &selector,
            ElementKind::Generic,
        )
        .await?;
        Ok((0..found.len() as i64)
            .map(|i| self.element(selector.clone().index(i)))
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use std::time::Duration;

    fn fast(driver: MockDriver) -> Browser {
        Browser::new(
            Arc::new(driver),
            Config::default()
                .timeout(Duration::from_secs(1))
                .poll_interval(Duration::from_millis(100)),
        )
    }

    #[tokio::test]
    async fn test_goto_defaults_scheme() {
        let driver = MockDriver::new();
        let browser = fast(driver.clone());
        browser.goto("example.com").await.unwrap();
        assert_eq!(driver.last_url().unwrap(), "http://example.com");
    }

    #[tokio::test]
    async fn test_goto_keeps_explicit_scheme() {
        let driver = MockDriver::new();
        let browser = fast(driver.clone());
        browser.goto("https://example.com/a").await.unwrap();
        assert_eq!(driver.last_url().unwrap(), "https://example.com/a");
    }

    #[tokio::test]
    async fn test_closed_browser_fails_fast() {
        let driver = MockDriver::new();
        let browser = fast(driver);
        browser.close();
        let err = browser.url().await.unwrap_err();
        assert!(matches!(err, Error::NoMatchingWindow { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_uses_session_budget() {
        let driver = MockDriver::new();
        let browser = fast(driver);
        let err = browser
            .wait_until(Some("waiting for nothing"), || async { Ok(false) })
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(err.to_string().contains("waiting for nothing"));
    }

    #[tokio::test]
    async fn test_elements_pin_by_index() {
        let driver = MockDriver::new();
        let a = driver.insert_node("li");
        let b = driver.insert_node("li");
        driver.stub_query(".//*[local-name()='li']", vec![a, b]);
        let browser = fast(driver);

        let handles = browser
            .elements(Selector::new().tag_name("li"))
            .await
            .unwrap();
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[1].selector().index_value(), Some(1));
    }
}
