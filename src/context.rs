//! Browsing-context tracking.
//!
//! The driver has one active browsing context at a time: the top-level
//! document or some iframe's document. Elements scoped to an iframe must
//! switch the driver into that frame before any query, and elements
//! scoped to the page must switch back out. [`BrowsingContext`] owns
//! those transitions; element location calls it, user code rarely needs
//! to.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::browser::Browser;
use crate::driver::{DriverError, Query};
use crate::element::Element;
use crate::error::{Error, Result};

// ============================================================================
// BrowsingContext
// ============================================================================

/// The document a set of queries should run against.
#[derive(Clone)]
pub struct BrowsingContext {
    target: ContextTarget,
}

#[derive(Clone)]
enum ContextTarget {
    /// The top-level document.
    Browser(Browser),
    /// The document inside an iframe element.
    Frame(Element),
}

impl BrowsingContext {
    /// The top-level document of `browser`.
    pub fn top_level(browser: Browser) -> Self {
        BrowsingContext {
            target: ContextTarget::Browser(browser),
        }
    }

    /// The document inside `frame`, which must be an iframe handle.
    pub fn frame(frame: Element) -> Self {
        BrowsingContext {
            target: ContextTarget::Frame(frame),
        }
    }

    pub fn is_top_level(&self) -> bool {
        matches!(self.target, ContextTarget::Browser(_))
    }

    fn browser(&self) -> &Browser {
        match &self.target {
            ContextTarget::Browser(browser) => browser,
            ContextTarget::Frame(frame) => &frame.inner.browser,
        }
    }

    /// Makes this context current. Frame targets re-locate the frame
    /// element first, which replays any ancestor switches, so nested
    /// frames resolve root-first.
    pub async fn switch_to(&self) -> Result<()> {
        match &self.target {
            ContextTarget::Browser(browser) => {
                browser.assert_open()?;
                browser
                    .driver()
                    .switch_to_default_content()
                    .await
                    .map_err(Error::Driver)?;
                browser.set_default_context(true);
                debug!("switched to top-level context");
                Ok(())
            }
            ContextTarget::Frame(frame) => {
                let node = frame.assert_exists().await?;
                let browser = self.browser();
                match browser.driver().switch_to_frame(&node).await {
                    Ok(()) => {}
                    Err(DriverError::NoSuchFrame) => {
                        return Err(Error::unknown_frame(format!(
                            "unable to switch to frame: {frame}"
                        )));
                    }
                    Err(DriverError::Stale) => {
                        // The frame handle outlived its node; reset so
                        // the caller's retry loop re-locates it.
                        frame.reset();
                        return Err(Error::Driver(DriverError::Stale));
                    }
                    Err(e) => return Err(Error::Driver(e)),
                }
                browser.set_default_context(false);
                debug!(frame = %frame, "switched into frame");

                // Remember a node from the frame's document so
                // `in_context` can later tell whether we are still there.
                let probe = browser
                    .driver()
                    .find_element(None, &Query::css("*"))
                    .await
                    .ok();
                *frame.inner.frame_probe.lock() = probe;
                Ok(())
            }
        }
    }

    /// Whether the driver is still inside this context. Never switches.
    pub async fn in_context(&self) -> bool {
        match &self.target {
            ContextTarget::Browser(browser) => browser.in_default_context(),
            ContextTarget::Frame(frame) => {
                let Some(probe) = frame.inner.frame_probe.lock().clone() else {
                    return false;
                };
                // The probe node resolves only while its document is the
                // active context.
                frame.inner.browser.driver().tag_name(&probe).await.is_ok()
            }
        }
    }

    /// Switches one level out of a frame context.
    pub async fn switch_to_parent(&self) -> Result<()> {
        let browser = self.browser();
        browser
            .driver()
            .switch_to_parent_frame()
            .await
            .map_err(Error::Driver)?;
        if self.is_top_level() {
            browser.set_default_context(true);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
