//! Wait-then-act proxy.
//!
//! [`WhenPresent`] wraps an [`Element`] and waits for presence before
//! each forwarded action, optionally with its own timeout and failure
//! message. Useful when a test wants an explicit presence gate rather
//! than the implicit per-action preconditions.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::element::Element;
use crate::error::Result;

// ============================================================================
// WhenPresent
// ============================================================================

/// Forwards actions to an element after waiting for it to be present.
#[derive(Clone)]
pub struct WhenPresent {
    element: Element,
    timeout: Option<Duration>,
    message: Option<String>,
}

impl WhenPresent {
    pub(crate) fn new(element: Element) -> Self {
        WhenPresent {
            element,
            timeout: None,
            message: None,
        }
    }

    /// Overrides the session timeout for the presence wait.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Appends a custom message to the timeout error.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    async fn wait(&self) -> Result<()> {
        let config = self.element.inner.browser.config();
        let timeout = self.timeout.unwrap_or(config.timeout);
        let default_message = format!("waiting for {} to be present", self.element);
        let message = self.message.as_deref().unwrap_or(&default_message);
        crate::wait::until(
            self.element.inner.browser.timer(),
            timeout,
            config.poll_interval,
            Some(message),
            || async { self.element.present().await },
        )
        .await
    }

    // ------------------------------------------------------------------
    // Forwarded actions
    // ------------------------------------------------------------------

    pub async fn click(&self) -> Result<()> {
        self.wait().await?;
        self.element.click().await
    }

    pub async fn set(&self, value: impl Into<String>) -> Result<()> {
        self.wait().await?;
        self.element.set(value).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.wait().await?;
        self.element.clear().await
    }

    pub async fn send_keys(&self, keys: impl Into<String>) -> Result<()> {
        self.wait().await?;
        self.element.send_keys(keys).await
    }

    pub async fn text(&self) -> Result<String> {
        self.wait().await?;
        self.element.text().await
    }

    pub async fn attribute(&self, name: impl Into<String>) -> Result<Option<String>> {
        self.wait().await?;
        self.element.attribute(name).await
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
    use crate::selector::Selector;
    use std::sync::Arc;

    /// The exact expression the locator will issue for a button selector.
    fn button_query(selector: &Selector) -> String {
        let kind = crate::element::kind::ElementKind::Button;
        let normalized = crate::locator::normalizer::normalize(selector, kind).unwrap();
        crate::locator::xpath::build(&normalized, kind, None)
            .unwrap()
            .query
            .expression
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_then_forwards() {
        let driver = MockDriver::new();
        let node = driver.insert_node("button");
        driver.stub_query_after(&button_query(&Selector::new().id("go")), 2, vec![node.clone()]);
        let browser = Browser::new(Arc::new(driver.clone()), Config::default());

        browser
            .button(Selector::new().id("go"))
            .when_present()
            .click()
            .await
            .unwrap();
        assert_eq!(driver.clicks(&node), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_timeout_and_message() {
        let driver = MockDriver::new();
        let browser = Browser::new(Arc::new(driver), Config::default());

        let err = browser
            .button(Selector::new().id("go"))
            .when_present()
            .timeout(Duration::from_secs(1))
            .message("waiting for the go button")
            .click()
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "timed out after 1 seconds, waiting for the go button"
        );
    }
}
