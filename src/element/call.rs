//! The wait/retry engine behind element actions.
//!
//! Every action routes through [`Element::element_call`] with a
//! precondition. In relaxed mode the call waits for the precondition,
//! runs the operation, and retries transient failures until the shared
//! timer budget runs out:
//!
//! * stale node: reset and re-locate
//! * not interactable / invalid state: retry under a presence-style
//!   precondition; otherwise report immediately
//! * closed window: report immediately
//!
//! In strict mode (relaxed locate disabled) nothing waits and transient
//! failures surface as-is.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::driver::{DriverError, DriverResult, NodeRef, Query, WebDriver};
use crate::element::{Element, Scope};
use crate::error::{Error, Result, format_secs};

// ============================================================================
// Precondition
// ============================================================================

/// What must hold before an operation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// The element must exist; reads use this.
    None,
    /// Explicitly wait for existence.
    Exists,
    /// Exists and displayed.
    Present,
    /// Present and enabled; clicks use this.
    Enabled,
    /// Enabled and not readonly; text entry uses this.
    Writable,
}

impl Precondition {
    /// Whether a transient interaction failure is worth retrying: only
    /// when the precondition already guarantees presence.
    fn retries_interaction(self) -> bool {
        matches!(self, Self::Present | Self::Enabled | Self::Writable)
    }
}

// ============================================================================
// element_call
// ============================================================================

impl Element {
    /// Runs `op` against the located node under `precondition`,
    /// retrying per the session's relaxed-locate setting. The shared
    /// timer bounds the whole call, nested waits included.
    pub(crate) async fn element_call<T, F, Fut>(
        &self,
        precondition: Precondition,
        label: &'static str,
        op: F,
    ) -> Result<T>
    where
        F: Fn(Arc<dyn WebDriver>, NodeRef) -> Fut,
        Fut: Future<Output = DriverResult<T>>,
    {
        let config = self.inner.browser.config();
        let timer = self.inner.browser.timer().clone();
        let guard = timer.acquire(config.timeout);

        if !config.relaxed_locate {
            let node = self.assert_exists().await.map_err(map_window)?;
            return op(self.driver_arc(), node)
                .await
                .map_err(|e| self.map_strict(e));
        }

        loop {
            self.check_precondition(precondition, &guard)
                .await
                .map_err(map_window)?;
            let node = self.assert_exists().await.map_err(map_window)?;

            match op(self.driver_arc(), node).await {
                Ok(value) => return Ok(value),
                Err(DriverError::Stale) => {
                    debug!(element = %self, op = label, "stale, re-locating");
                    self.reset();
                    if guard.expired() {
                        return Err(Error::unknown_object(format!(
                            "unable to locate element: {self}"
                        )));
                    }
                }
                Err(DriverError::NotInteractable(reason)) => {
                    if precondition.retries_interaction() && !guard.expired() {
                        debug!(element = %self, op = label, %reason, "not interactable, retrying");
                        sleep(config.poll_interval.min(guard.remaining())).await;
                    } else {
                        return Err(self.raise_present());
                    }
                }
                Err(DriverError::InvalidState(reason)) => {
                    if precondition.retries_interaction() && !guard.expired() {
                        debug!(element = %self, op = label, %reason, "invalid state, retrying");
                        sleep(config.poll_interval.min(guard.remaining())).await;
                    } else {
                        return Err(Error::object_disabled(format!(
                            "element found, but in an invalid state for {label}: {reason} ({self})"
                        )));
                    }
                }
                Err(DriverError::NoSuchWindow) => {
                    return Err(Error::no_matching_window("browser window was closed"));
                }
                Err(DriverError::NotFound(what)) => {
                    return Err(Error::unknown_object(format!(
                        "unable to locate: {what} ({self})"
                    )));
                }
                Err(e) => return Err(Error::Driver(e)),
            }
        }
    }

    fn driver_arc(&self) -> Arc<dyn WebDriver> {
        self.inner.browser.driver()
    }

    fn map_strict(&self, e: DriverError) -> Error {
        match e {
            DriverError::NoSuchWindow => Error::no_matching_window("browser window was closed"),
            other => Error::Driver(other),
        }
    }
}

fn map_window(e: Error) -> Error {
    match e {
        Error::Driver(DriverError::NoSuchWindow) => {
            Error::no_matching_window("browser window was closed")
        }
        other => other,
    }
}

impl Element {
    fn raise_present(&self) -> Error {
        let timeout = self.inner.browser.config().timeout;
        Error::unknown_object(format!(
            "element located, but timed out after {} seconds, waiting for {self} to be present",
            format_secs(timeout)
        ))
    }

    // ------------------------------------------------------------------
    // Precondition waits
    // ------------------------------------------------------------------

    async fn check_precondition(
        &self,
        precondition: Precondition,
        guard: &crate::wait::TimerGuard,
    ) -> Result<()> {
        match precondition {
            Precondition::None => match self.assert_exists().await {
                Ok(_) => Ok(()),
                // Reads escalate to a wait rather than failing on first
                // absence.
                Err(Error::UnknownObject { .. }) => self.wait_for_exists(guard).await,
                Err(e) => Err(e),
            },
            Precondition::Exists => self.wait_for_exists(guard).await,
            Precondition::Present => self.wait_for_present(guard).await,
            Precondition::Enabled => self.wait_for_enabled(guard).await,
            Precondition::Writable => self.wait_for_writable(guard).await,
        }
    }

    // Boxed so the ancestor recursion has a nameable future type.
    fn wait_for_exists<'a>(
        &'a self,
        guard: &'a crate::wait::TimerGuard,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if self.located() {
                return Ok(());
            }

            // Ancestors must resolve root-first so scope errors name the
            // ancestor that actually failed.
            if let Scope::Element(parent) = &self.inner.scope {
                parent.wait_for_exists(guard).await?;
            }

            let poll = self.inner.browser.config().poll_interval;
            loop {
                self.reset();
                if self.exists().await? {
                    return Ok(());
                }
                let remaining = guard.remaining();
                if remaining.is_zero() {
                    return Err(self.locate_timeout_error().await);
                }
                sleep(poll.min(remaining)).await;
            }
        })
    }

    async fn wait_for_present(&self, guard: &crate::wait::TimerGuard) -> Result<()> {
        self.wait_for_exists(guard).await?;
        let poll = self.inner.browser.config().poll_interval;
        loop {
            if self.present().await? {
                return Ok(());
            }
            let remaining = guard.remaining();
            if remaining.is_zero() {
                return Err(self.raise_present());
            }
            sleep(poll.min(remaining)).await;
        }
    }

    async fn wait_for_enabled(&self, guard: &crate::wait::TimerGuard) -> Result<()> {
        self.wait_for_present(guard).await?;
        if !self.inner.kind.interactable() {
            return Ok(());
        }
        let poll = self.inner.browser.config().poll_interval;
        loop {
            if self.enabled_quiet().await?.unwrap_or(false) {
                return Ok(());
            }
            let remaining = guard.remaining();
            if remaining.is_zero() {
                let timeout = self.inner.browser.config().timeout;
                return Err(Error::object_disabled(format!(
                    "element present, but timed out after {} seconds, waiting for {self} to be enabled",
                    format_secs(timeout)
                )));
            }
            sleep(poll.min(remaining)).await;
        }
    }

    async fn wait_for_writable(&self, guard: &crate::wait::TimerGuard) -> Result<()> {
        self.wait_for_enabled(guard).await?;
        if !self.inner.kind.editable() {
            return Ok(());
        }
        let poll = self.inner.browser.config().poll_interval;
        loop {
            if !self.readonly_quiet().await?.unwrap_or(false) {
                return Ok(());
            }
            let remaining = guard.remaining();
            if remaining.is_zero() {
                let timeout = self.inner.browser.config().timeout;
                return Err(Error::object_read_only(format!(
                    "element present and enabled, but timed out after {} seconds, \
                     waiting for {self} to not be readonly",
                    format_secs(timeout)
                )));
            }
            sleep(poll.min(remaining)).await;
        }
    }

    // ------------------------------------------------------------------
    // Timeout diagnostics
    // ------------------------------------------------------------------

    /// Builds the locate-timeout error, with hints for the two most
    /// common causes: the element living in an iframe, and a typoed
    /// attribute key.
    async fn locate_timeout_error(&self) -> Error {
        let timeout = self.inner.browser.config().timeout;
        let mut message = format!(
            "timed out after {} seconds, waiting for {self} to be located",
            format_secs(timeout)
        );

        if self.page_has_iframes().await {
            message.push_str("; maybe look in an iframe?");
        }

        if let Ok(normalized) =
            crate::locator::normalizer::normalize(&self.inner.selector, self.inner.kind)
        {
            if !normalized.custom_attributes.is_empty() {
                warn!(
                    element = %self,
                    attributes = ?normalized.custom_attributes,
                    "selector uses non-standard attributes"
                );
                message.push_str(&format!(
                    " (non-standard attributes in selector: {})",
                    normalized.custom_attributes.join(", ")
                ));
            }
        }

        Error::unknown_object(message)
    }

    async fn page_has_iframes(&self) -> bool {
        let query = Query::xpath(".//iframe");
        match self.driver_arc().find_elements(None, &query).await {
            Ok(frames) => !frames.is_empty(),
            Err(_) => false,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
