//! Consumed WebDriver capability interface.
//!
//! The crate does not implement a wire protocol. It consumes a
//! W3C-WebDriver-compliant remote end through the [`WebDriver`] trait and
//! only requires the small operation set the resolution engine needs:
//! element queries, node operations, browsing-context switches, script
//! execution, and navigation.
//!
//! Implementations must map their wire-level failures onto the
//! [`DriverError`] kinds so the retry engine can distinguish transient
//! conditions (stale references, not-yet-interactable elements) from fatal
//! ones (closed windows).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// NodeRef
// ============================================================================

/// Opaque reference to a live DOM node, issued by the remote end.
///
/// A `NodeRef` is a capability, not a pointer: the node it names is owned by
/// the browser process and may go stale at any time. Holders must tolerate
/// [`DriverError::Stale`] on every operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeRef(String);

impl NodeRef {
    /// Creates a node reference from a remote-end identifier.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Query
// ============================================================================

/// Query language used for element lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryLanguage {
    /// XPath expression (primary strategy).
    #[serde(rename = "xpath")]
    XPath,
    /// CSS selector (alternate strategy).
    #[serde(rename = "css")]
    Css,
}

impl QueryLanguage {
    /// Returns the wire name of the strategy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::XPath => "xpath",
            Self::Css => "css",
        }
    }
}

/// A compiled element query: language plus expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Query language of the expression.
    pub language: QueryLanguage,
    /// The query string itself.
    pub expression: String,
}

impl Query {
    /// Creates an XPath query.
    #[inline]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self {
            language: QueryLanguage::XPath,
            expression: expression.into(),
        }
    }

    /// Creates a CSS query.
    #[inline]
    pub fn css(expression: impl Into<String>) -> Self {
        Self {
            language: QueryLanguage::Css,
            expression: expression.into(),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.language.as_str(), self.expression)
    }
}

// ============================================================================
// Script Arguments
// ============================================================================

/// Argument passed to [`WebDriver::execute_script`].
#[derive(Debug, Clone)]
pub enum ScriptArg {
    /// A node reference, serialized as a WebDriver element on the wire.
    Node(NodeRef),
    /// An arbitrary JSON value.
    Json(Value),
}

// ============================================================================
// DriverError
// ============================================================================

/// Error kinds a compliant remote end must distinguish.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The node reference no longer corresponds to a live DOM node.
    #[error("stale element reference")]
    Stale,

    /// The element exists but cannot currently be interacted with.
    #[error("element not interactable: {0}")]
    NotInteractable(String),

    /// The element is in a state that rejects the operation.
    #[error("invalid element state: {0}")]
    InvalidState(String),

    /// The browser window is gone.
    #[error("no such window")]
    NoSuchWindow,

    /// The frame is gone or was never there.
    #[error("no such frame")]
    NoSuchFrame,

    /// No element matched the query.
    #[error("no such element: {0}")]
    NotFound(String),

    /// Any other remote-end failure.
    #[error("{0}")]
    Other(String),
}

impl DriverError {
    /// Returns `true` for the stale-reference error.
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }

    /// Returns `true` if retrying the operation may succeed.
    ///
    /// Fatal conditions (closed window, missing frame) are excluded.
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Stale | Self::NotInteractable(_) | Self::InvalidState(_) | Self::NotFound(_)
        )
    }
}

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

// ============================================================================
// WebDriver Trait
// ============================================================================

/// The capability interface consumed by the resolution engine.
///
/// `scope` of `None` means the current browsing context's document; a node
/// scope restricts the query to that node's subtree. Returned sequences
/// must preserve document order, which the locator relies on for indexing.
#[async_trait]
pub trait WebDriver: Send + Sync {
    /// Finds the first element matching the query.
    async fn find_element(&self, scope: Option<&NodeRef>, query: &Query) -> DriverResult<NodeRef>;

    /// Finds all elements matching the query, in document order.
    async fn find_elements(
        &self,
        scope: Option<&NodeRef>,
        query: &Query,
    ) -> DriverResult<Vec<NodeRef>>;

    /// Reads an attribute; `None` when the attribute is absent.
    async fn attribute(&self, node: &NodeRef, name: &str) -> DriverResult<Option<String>>;

    /// Reads the rendered text of the node.
    async fn text(&self, node: &NodeRef) -> DriverResult<String>;

    /// Returns the node's tag name.
    async fn tag_name(&self, node: &NodeRef) -> DriverResult<String>;

    /// Returns whether the node is displayed.
    async fn is_displayed(&self, node: &NodeRef) -> DriverResult<bool>;

    /// Returns whether the node is enabled.
    async fn is_enabled(&self, node: &NodeRef) -> DriverResult<bool>;

    /// Clicks the node.
    async fn click(&self, node: &NodeRef) -> DriverResult<()>;

    /// Double-clicks the node.
    async fn double_click(&self, node: &NodeRef) -> DriverResult<()>;

    /// Sends a key sequence to the node.
    async fn send_keys(&self, node: &NodeRef, keys: &str) -> DriverResult<()>;

    /// Clears the node's value.
    async fn clear(&self, node: &NodeRef) -> DriverResult<()>;

    /// Executes a script in the current browsing context.
    async fn execute_script(&self, script: &str, args: &[ScriptArg]) -> DriverResult<Value>;

    /// Switches to the top-level browsing context.
    async fn switch_to_default_content(&self) -> DriverResult<()>;

    /// Switches into the frame owned by the given element.
    async fn switch_to_frame(&self, frame: &NodeRef) -> DriverResult<()>;

    /// Switches one browsing context up.
    async fn switch_to_parent_frame(&self) -> DriverResult<()>;

    /// Navigates the current window to a URL.
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    /// Returns the current URL.
    async fn current_url(&self) -> DriverResult<String>;

    /// Returns the current page title.
    async fn title(&self) -> DriverResult<String>;
}

// ============================================================================
// Tests
// ============================================================================
