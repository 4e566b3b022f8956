//! Lazy element handles.
//!
//! An [`Element`] wraps a selector, not a node. Nothing touches the
//! driver until an operation needs a node, and every handle can be
//! re-located after going stale. Handles are cheap `Arc` clones and can
//! be created before their target exists.
//!
//! | Piece        | Role                                             |
//! |--------------|--------------------------------------------------|
//! | [`Element`]  | Re-locatable handle, actions and state queries   |
//! | `call`       | Wait/retry engine behind every action            |
//! | [`kind`]     | Element kinds and their locator rules            |
//! | [`present`]  | Explicit wait-then-act proxy                     |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::browser::Browser;
use crate::context::BrowsingContext;
use crate::driver::{DriverError, NodeRef, Query, ScriptArg, WebDriver};
use crate::error::{Error, Result};
use crate::locator;
use crate::selector::Selector;

pub(crate) mod call;
pub mod kind;
pub mod present;

pub use call::Precondition;
pub use kind::ElementKind;
pub use present::WhenPresent;

// ============================================================================
// Scope
// ============================================================================

/// What an element is located relative to.
#[derive(Clone)]
pub(crate) enum Scope {
    /// The top-level document of a browser session.
    Browser(Browser),
    /// Another element; iframes switch context, others narrow the search.
    Element(Element),
}

// ============================================================================
// Element
// ============================================================================

pub(crate) struct ElementInner {
    pub(crate) browser: Browser,
    pub(crate) scope: Scope,
    pub(crate) selector: Selector,
    pub(crate) kind: ElementKind,
    /// Last located node, cleared on reset or staleness.
    pub(crate) cache: Mutex<Option<NodeRef>>,
    /// Node inside this frame's document, used to detect context loss.
    pub(crate) frame_probe: Mutex<Option<NodeRef>>,
}

/// A lazy, re-locatable handle to a DOM element.
#[derive(Clone)]
pub struct Element {
    pub(crate) inner: Arc<ElementInner>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("kind", &self.inner.kind)
            .field("selector", &self.inner.selector.to_string())
            .field("located", &self.located())
            .finish()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<{:?} {}>", self.inner.kind, self.inner.selector)
    }
}

impl Element {
    pub(crate) fn new(scope: Scope, selector: Selector, kind: ElementKind) -> Self {
        let browser = match &scope {
            Scope::Browser(b) => b.clone(),
            Scope::Element(e) => e.inner.browser.clone(),
        };
        Element {
            inner: Arc::new(ElementInner {
                browser,
                scope,
                selector,
                kind,
                cache: Mutex::new(None),
                frame_probe: Mutex::new(None),
            }),
        }
    }

    // ------------------------------------------------------------------
    // Handle state
    // ------------------------------------------------------------------

    /// The selector this handle locates with.
    pub fn selector(&self) -> &Selector {
        &self.inner.selector
    }

    pub fn kind(&self) -> ElementKind {
        self.inner.kind
    }

    /// Whether a node is currently cached. Says nothing about staleness.
    pub fn located(&self) -> bool {
        self.inner.cache.lock().is_some()
    }

    /// Drops the cached node; the next operation re-locates from scratch.
    pub fn reset(&self) {
        *self.inner.cache.lock() = None;
        *self.inner.frame_probe.lock() = None;
    }

    fn driver(&self) -> Arc<dyn WebDriver> {
        self.inner.browser.driver()
    }

    // ------------------------------------------------------------------
    // Location
    // ------------------------------------------------------------------

    /// Resolves the scope and locates this element once, caching on
    /// success. Boxed because scopes recurse through parent elements.
    pub(crate) fn locate_now(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<Option<NodeRef>>> + Send + '_>> {
        Box::pin(async move {
            let (scope_node, scope_tag) = self.resolve_scope().await?;
            let driver = self.driver();
            let found = locator::locate_first(
                driver.as_ref(),
                scope_node.as_ref(),
                scope_tag.as_deref(),
                &self.inner.selector,
                self.inner.kind,
            )
            .await?;
            if let Some(node) = &found {
                debug!(element = %self, node = %node, "located");
                *self.inner.cache.lock() = Some(node.clone());
            }
            Ok(found)
        })
    }

    /// Ensures the frame or document this element lives in is current,
    /// and returns the scoping node for the search.
    async fn resolve_scope(&self) -> Result<(Option<NodeRef>, Option<String>)> {
        match &self.inner.scope {
            Scope::Browser(browser) => {
                browser.ensure_default_context().await?;
                Ok((None, None))
            }
            Scope::Element(parent) if parent.inner.kind == ElementKind::IFrame => {
                BrowsingContext::frame(parent.clone()).switch_to().await?;
                Ok((None, None))
            }
            Scope::Element(parent) => {
                let node = parent.assert_exists().await?;
                // Row queries branch on the scoping tag.
                let tag = if self.inner.kind == ElementKind::Row {
                    Some(
                        self.driver()
                            .tag_name(&node)
                            .await
                            .map_err(Error::Driver)?,
                    )
                } else {
                    None
                };
                Ok((Some(node), tag))
            }
        }
    }

    /// Returns the cached node, locating if necessary; absent is an
    /// error here.
    pub(crate) async fn assert_exists(&self) -> Result<NodeRef> {
        if let Some(node) = self.inner.cache.lock().clone() {
            return Ok(node);
        }
        match self.locate_now().await? {
            Some(node) => Ok(node),
            None => Err(Error::unknown_object(format!(
                "unable to locate element: {self}"
            ))),
        }
    }

    // ------------------------------------------------------------------
    // State queries
    // ------------------------------------------------------------------

    /// Whether the element can be found right now. Never waits; a stale
    /// cache resets and reports `false`. Selector errors still surface.
    pub async fn exists(&self) -> Result<bool> {
        let cached = self.inner.cache.lock().clone();
        if let Some(node) = cached {
            match self.driver().tag_name(&node).await {
                Ok(_) => return Ok(true),
                Err(DriverError::Stale) => self.reset(),
                Err(e) => return Err(Error::Driver(e)),
            }
        }
        match self.locate_now().await {
            Ok(found) => Ok(found.is_some()),
            Err(Error::Driver(DriverError::Stale)) => {
                self.reset();
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Exists and is displayed. Never waits.
    pub async fn present(&self) -> Result<bool> {
        if !self.exists().await? {
            return Ok(false);
        }
        Ok(self.displayed_quiet().await?.unwrap_or(false))
    }

    /// Displayed state, waiting for the element to exist first.
    pub async fn visible(&self) -> Result<bool> {
        self.element_call(Precondition::None, "visible", |driver, node| async move {
            driver.is_displayed(&node).await
        })
        .await
    }

    /// Enabled state, waiting for the element to exist first.
    pub async fn enabled(&self) -> Result<bool> {
        self.element_call(Precondition::None, "enabled", |driver, node| async move {
            driver.is_enabled(&node).await
        })
        .await
    }

    /// Enabled and not readonly.
    pub async fn writable(&self) -> Result<bool> {
        if !self.enabled().await? {
            return Ok(false);
        }
        Ok(self.attribute("readonly").await?.is_none())
    }

    /// Displayed state without waiting; `None` when not located, stale
    /// resets and reports `None`.
    pub(crate) async fn displayed_quiet(&self) -> Result<Option<bool>> {
        let Some(node) = self.inner.cache.lock().clone() else {
            return Ok(None);
        };
        match self.driver().is_displayed(&node).await {
            Ok(displayed) => Ok(Some(displayed)),
            Err(DriverError::Stale) => {
                self.reset();
                Ok(None)
            }
            Err(e) => Err(Error::Driver(e)),
        }
    }

    pub(crate) async fn enabled_quiet(&self) -> Result<Option<bool>> {
        let Some(node) = self.inner.cache.lock().clone() else {
            return Ok(None);
        };
        match self.driver().is_enabled(&node).await {
            Ok(enabled) => Ok(Some(enabled)),
            Err(DriverError::Stale) => {
                self.reset();
                Ok(None)
            }
            Err(e) => Err(Error::Driver(e)),
        }
    }

    pub(crate) async fn readonly_quiet(&self) -> Result<Option<bool>> {
        let Some(node) = self.inner.cache.lock().clone() else {
            return Ok(None);
        };
        match self.driver().attribute(&node, "readonly").await {
            Ok(value) => Ok(Some(value.is_some())),
            Err(DriverError::Stale) => {
                self.reset();
                Ok(None)
            }
            Err(e) => Err(Error::Driver(e)),
        }
    }

    // ------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------

    /// Clicks the element, waiting for it to be enabled.
    pub async fn click(&self) -> Result<()> {
        self.element_call(Precondition::Enabled, "click", |driver, node| async move {
            driver.click(&node).await
        })
        .await
    }

    /// Double-clicks the element, waiting for it to be enabled.
    pub async fn double_click(&self) -> Result<()> {
        self.element_call(Precondition::Enabled, "double_click", |driver, node| async move {
            driver.double_click(&node).await
        })
        .await
    }

    /// Replaces the field content, waiting for it to be writable.
    pub async fn set(&self, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.element_call(Precondition::Writable, "set", move |driver, node| {
            let value = value.clone();
            async move {
                driver.clear(&node).await?;
                driver.send_keys(&node, &value).await
            }
        })
        .await
    }

    /// Appends keys without clearing first.
    pub async fn append(&self, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.element_call(Precondition::Writable, "append", move |driver, node| {
            let value = value.clone();
            async move { driver.send_keys(&node, &value).await }
        })
        .await
    }

    /// Clears the field, waiting for it to be writable.
    pub async fn clear(&self) -> Result<()> {
        self.element_call(Precondition::Writable, "clear", |driver, node| async move {
            driver.clear(&node).await
        })
        .await
    }

    /// Sends keys to the element, waiting for it to be writable.
    pub async fn send_keys(&self, keys: impl Into<String>) -> Result<()> {
        let keys = keys.into();
        self.element_call(Precondition::Writable, "send_keys", move |driver, node| {
            let keys = keys.clone();
            async move { driver.send_keys(&node, &keys).await }
        })
        .await
    }

    /// Visible text content.
    pub async fn text(&self) -> Result<String> {
        self.element_call(Precondition::Exists, "text", |driver, node| async move {
            driver.text(&node).await
        })
        .await
    }

    /// Attribute value, `None` when absent.
    pub async fn attribute(&self, name: impl Into<String>) -> Result<Option<String>> {
        let name = name.into();
        self.element_call(Precondition::Exists, "attribute", move |driver, node| {
            let name = name.clone();
            async move { driver.attribute(&node, &name).await }
        })
        .await
    }

    /// The `value` attribute, empty string when absent.
    pub async fn value(&self) -> Result<String> {
        Ok(self.attribute("value").await?.unwrap_or_default())
    }

    /// Lowercased tag name.
    pub async fn tag_name(&self) -> Result<String> {
        self.element_call(Precondition::Exists, "tag_name", |driver, node| async move {
            driver.tag_name(&node).await.map(|t| t.to_ascii_lowercase())
        })
        .await
    }

    /// Moves keyboard focus to the element.
    pub async fn focus(&self) -> Result<()> {
        self.element_call(Precondition::Exists, "focus", |driver, node| async move {
            driver
                .execute_script("arguments[0].focus()", &[ScriptArg::Node(node)])
                .await
                .map(|_| ())
        })
        .await
    }

    /// Selects the option with the given visible text. The element must
    /// be a select list.
    pub async fn select_by_text(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.element_call(Precondition::Enabled, "select_by_text", move |driver, node| {
            let text = text.clone();
            async move {
                let query = Query::xpath(format!(
                    ".//*[local-name()='option'][normalize-space()={}]",
                    crate::locator::xpath::escape(&text)
                ));
                let option = driver.find_element(Some(&node), &query).await?;
                driver.click(&option).await
            }
        })
        .await
    }

    /// Selects the option with the given `value` attribute.
    pub async fn select_by_value(&self, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.element_call(Precondition::Enabled, "select_by_value", move |driver, node| {
            let value = value.clone();
            async move {
                let query = Query::xpath(format!(
                    ".//*[local-name()='option'][@value={}]",
                    crate::locator::xpath::escape(&value)
                ));
                let option = driver.find_element(Some(&node), &query).await?;
                driver.click(&option).await
            }
        })
        .await
    }

    /// Current checked state of a checkbox or radio button.
    pub async fn checked(&self) -> Result<bool> {
        self.element_call(Precondition::Exists, "checked", |driver, node| async move {
            let value = driver
                .execute_script("return arguments[0].checked", &[ScriptArg::Node(node)])
                .await?;
            Ok(value.as_bool().unwrap_or(false))
        })
        .await
    }

    /// Clicks until the checked state matches `checked`.
    pub async fn set_checked(&self, checked: bool) -> Result<()> {
        if self.checked().await? != checked {
            self.click().await?;
        }
        Ok(())
    }

    /// Runs a script with this element as `arguments[0]`.
    pub async fn execute_script(&self, script: impl Into<String>) -> Result<Value> {
        let script = script.into();
        self.element_call(Precondition::Exists, "execute_script", move |driver, node| {
            let script = script.clone();
            async move { driver.execute_script(&script, &[ScriptArg::Node(node)]).await }
        })
        .await
    }

    // ------------------------------------------------------------------
    // Waits
    // ------------------------------------------------------------------

    /// Blocks until the element is present, with the session timeout.
    pub async fn wait_until_present(&self) -> Result<()> {
        let config = self.inner.browser.config();
        let message = format!("waiting for {self} to be present");
        crate::wait::until(
            self.inner.browser.timer(),
            config.timeout,
            config.poll_interval,
            Some(message.as_str()),
            || async { self.present().await },
        )
        .await
    }

    /// Blocks until the element is gone or hidden. A stale node counts
    /// as gone.
    pub async fn wait_while_present(&self) -> Result<()> {
        let config = self.inner.browser.config();
        let message = format!("waiting for {self} to disappear");
        crate::wait::while_(
            self.inner.browser.timer(),
            config.timeout,
            config.poll_interval,
            Some(message.as_str()),
            || async {
                self.reset();
                self.present().await
            },
        )
        .await
    }

    /// A proxy that waits for presence before each action.
    pub fn when_present(&self) -> WhenPresent {
        WhenPresent::new(self.clone())
    }

    // ------------------------------------------------------------------
    // Child handles
    // ------------------------------------------------------------------

    fn child(&self, selector: Selector, kind: ElementKind) -> Element {
        Element::new(Scope::Element(self.clone()), selector, kind)
    }

    pub fn element(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::Generic)
    }

    pub fn button(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::Button)
    }

    pub fn link(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::Link)
    }

    pub fn text_field(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::TextField)
    }

    pub fn text_area(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::TextArea)
    }

    pub fn select(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::Select)
    }

    pub fn option(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::SelectOption)
    }

    pub fn checkbox(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::Checkbox)
    }

    pub fn radio(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::Radio)
    }

    pub fn iframe(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::IFrame)
    }

    pub fn row(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::Row)
    }

    pub fn cell(&self, selector: Selector) -> Element {
        self.child(selector, ElementKind::Cell)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Browser;
    use crate::config::Config;
    use crate::mock::MockDriver;

    fn browser(driver: MockDriver) -> Browser {
        Browser::new(Arc::new(driver), Config::default())
    }

    #[tokio::test]
    async fn test_handle_is_lazy() {
        let driver = MockDriver::new();
        let calls = driver.query_count();
        let browser = browser(driver);
        let el = browser.element(Selector::new().id("x"));
        // Constructing a handle never queries the driver.
        assert!(!el.located());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
        drop(el);
    }

    #[tokio::test]
    async fn test_exists_caches_node() {
        let driver = MockDriver::new();
        let node = driver.insert_node("div");
        driver.set_attribute(&node, "id", "x");
        driver.stub_query(".//*[@id='x']", vec![node]);
        let browser = browser(driver);

        let el = browser.element(Selector::new().id("x"));
        assert!(el.exists().await.unwrap());
        assert!(el.located());
    }

    #[tokio::test]
    async fn test_exists_false_on_stale_cache() {
        let driver = MockDriver::new();
        let node = driver.insert_node("div");
        driver.set_attribute(&node, "id", "x");
        driver.stub_query(".//*[@id='x']", vec![node.clone()]);
        let browser = browser(driver.clone());

        let el = browser.element(Selector::new().id("x"));
        assert!(el.exists().await.unwrap());

        driver.make_stale(&node);
        driver.stub_query(".//*[@id='x']", vec![]);
        assert!(!el.exists().await.unwrap());
        assert!(!el.located());
    }

    #[tokio::test]
    async fn test_present_requires_displayed() {
        let driver = MockDriver::new();
        let node = driver.insert_node("div");
        driver.set_attribute(&node, "id", "x");
        driver.set_displayed(&node, false);
        driver.stub_query(".//*[@id='x']", vec![node]);
        let browser = browser(driver);

        let el = browser.element(Selector::new().id("x"));
        assert!(el.exists().await.unwrap());
        assert!(!el.present().await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_selector_propagates_from_exists() {
        let driver = MockDriver::new();
        let browser = browser(driver);
        let el = browser.element(Selector::new().xpath(".//a").css("a"));
        assert!(el.exists().await.unwrap_err().is_usage());
    }

    #[tokio::test]
    async fn test_display_format() {
        let driver = MockDriver::new();
        let browser = browser(driver);
        let el = browser.button(Selector::new().id("go"));
        assert_eq!(el.to_string(), "#<Button {id: \"go\"}>");
    }

    #[tokio::test]
    async fn test_double_click_is_not_a_click() {
        let driver = MockDriver::new();
        let node = driver.insert_node("div");
        driver.set_attribute(&node, "id", "x");
        driver.stub_query(".//*[@id='x']", vec![node.clone()]);
        let browser = browser(driver.clone());

        let el = browser.element(Selector::new().id("x"));
        el.double_click().await.unwrap();
        assert_eq!(driver.double_clicks(&node), 1);
        assert_eq!(driver.clicks(&node), 0);
    }

    #[tokio::test]
    async fn test_set_checked_idempotent() {
        let driver = MockDriver::new();
        let node = driver.insert_node("input");
        driver.set_attribute(&node, "type", "checkbox");
        driver.stub_query(
            ".//*[local-name()='input'][@id='c'][translate(@type,'ABCDEFGHIJKLMNOPQRSTUVWXYZ','abcdefghijklmnopqrstuvwxyz')='checkbox']",
            vec![node.clone()],
        );
        driver.script_result("return arguments[0].checked", serde_json::json!(true));
        let browser = browser(driver.clone());

        let el = browser.checkbox(Selector::new().id("c"));
        el.set_checked(true).await.unwrap();
        assert_eq!(driver.clicks(&node), 0);
    }
}
