//! # lazydriver
//!
//! Lazy, self-healing element handles for browser automation.
//!
//! Handles are built from selectors and resolve to DOM nodes only when
//! an operation needs one. Stale nodes are re-located transparently,
//! actions wait for their preconditions (present, enabled, writable) on
//! a shared per-session timer, and selectors compile to XPath with
//! regex patterns pushed into the query where possible.
//!
//! | Module       | Purpose                                            |
//! |--------------|----------------------------------------------------|
//! | [`browser`]  | Session handle: config, timer, navigation          |
//! | [`element`]  | Lazy element handles and the wait/retry engine     |
//! | [`selector`] | Selector builder: keys, values, patterns           |
//! | [`context`]  | Browsing-context (iframe) tracking                 |
//! | [`wait`]     | Polling waits over a shared, nestable timer        |
//! | [`driver`]   | The `WebDriver` trait the library drives through   |
//! | [`config`]   | Session configuration                              |
//! | [`error`]    | Error taxonomy                                     |
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lazydriver::{Browser, Config, Selector, WebDriver};
//!
//! async fn run(driver: Arc<dyn WebDriver>) -> lazydriver::Result<()> {
//!     let browser = Browser::new(driver, Config::default());
//!     browser.goto("example.com/login").await?;
//!
//!     // Handles are lazy; nothing is located until an action runs.
//!     let user = browser.text_field(Selector::new().name("user"));
//!     let go = browser.button(Selector::new().id("go"));
//!
//!     user.set("admin").await?;
//!     go.click().await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod browser;
pub mod config;
pub mod context;
pub mod driver;
pub mod element;
pub mod error;
pub mod selector;
pub mod wait;

pub(crate) mod locator;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use browser::Browser;
pub use config::{Config, DEFAULT_POLL_INTERVAL, DEFAULT_TIMEOUT};
pub use context::BrowsingContext;
pub use driver::{DriverError, DriverResult, NodeRef, Query, QueryLanguage, ScriptArg, WebDriver};
pub use element::{Element, ElementKind, Precondition, WhenPresent};
pub use error::{Error, Result};
pub use selector::{Adjacent, Pattern, Selector, SelectorKey, SelectorValue};
pub use wait::{Timer, TimerGuard};
