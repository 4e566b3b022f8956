//! Error types for lazydriver.
//!
//! The taxonomy follows the waiting discipline of the crate:
//!
//! | Category | Variants |
//! |----------|----------|
//! | Usage | [`Error::InvalidSelector`], [`Error::Locator`] |
//! | Resolution timeout | [`Error::UnknownObject`], [`Error::ObjectDisabled`], [`Error::ObjectReadOnly`] |
//! | Wait timeout | [`Error::Timeout`] |
//! | Fatal | [`Error::NoMatchingWindow`], [`Error::UnknownFrame`] |
//! | Remote end | [`Error::Driver`] |
//!
//! Usage errors are raised immediately and never retried. Transient remote
//! errors (stale references, not-yet-interactable elements) are recovered
//! inside the retry engine and only surface, as one of the typed timeout
//! variants, once the shared wait budget is exhausted.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;
use std::time::Duration;

use thiserror::Error;

use crate::driver::DriverError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// Invalid or ambiguous selector.
    ///
    /// Returned for programmer mistakes such as combining `xpath`/`css`
    /// with other locator keys.
    #[error("invalid selector: {message}")]
    InvalidSelector {
        /// Description of the invalid combination.
        message: String,
    },

    /// Selector cannot be compiled into a query expression.
    #[error("unable to build query: {message}")]
    Locator {
        /// Description of the unconvertible key or value.
        message: String,
    },

    // ========================================================================
    // Resolution Errors
    // ========================================================================
    /// Element could not be located (possibly after waiting).
    #[error("{message}")]
    UnknownObject {
        /// Diagnostic message with selector and elapsed timeout.
        message: String,
    },

    /// Element was located but never became enabled.
    #[error("{message}")]
    ObjectDisabled {
        /// Diagnostic message with selector and elapsed timeout.
        message: String,
    },

    /// Element was located and enabled but stayed read-only.
    #[error("{message}")]
    ObjectReadOnly {
        /// Diagnostic message with selector and elapsed timeout.
        message: String,
    },

    /// Frame element could not be located or switched into.
    #[error("unknown frame: {message}")]
    UnknownFrame {
        /// Description of the missing frame.
        message: String,
    },

    // ========================================================================
    // Fatal Errors
    // ========================================================================
    /// The browser window or session is gone.
    ///
    /// Never retried: a closed window is not a transient condition.
    #[error("no matching window: {message}")]
    NoMatchingWindow {
        /// Description of how the window went away.
        message: String,
    },

    // ========================================================================
    // Wait Errors
    // ========================================================================
    /// A generic wait expired.
    #[error("{message}")]
    Timeout {
        /// Diagnostic message including the elapsed timeout.
        message: String,
        /// Milliseconds waited before expiry.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// Error reported by the WebDriver remote end.
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an invalid selector error.
    #[inline]
    pub fn invalid_selector(message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            message: message.into(),
        }
    }

    /// Creates a locator build error.
    #[inline]
    pub fn locator(message: impl Into<String>) -> Self {
        Self::Locator {
            message: message.into(),
        }
    }

    /// Creates an unknown object error.
    #[inline]
    pub fn unknown_object(message: impl Into<String>) -> Self {
        Self::UnknownObject {
            message: message.into(),
        }
    }

    /// Creates an object disabled error.
    #[inline]
    pub fn object_disabled(message: impl Into<String>) -> Self {
        Self::ObjectDisabled {
            message: message.into(),
        }
    }

    /// Creates an object read-only error.
    #[inline]
    pub fn object_read_only(message: impl Into<String>) -> Self {
        Self::ObjectReadOnly {
            message: message.into(),
        }
    }

    /// Creates an unknown frame error.
    #[inline]
    pub fn unknown_frame(message: impl Into<String>) -> Self {
        Self::UnknownFrame {
            message: message.into(),
        }
    }

    /// Creates a no matching window error.
    #[inline]
    pub fn no_matching_window(message: impl Into<String>) -> Self {
        Self::NoMatchingWindow {
            message: message.into(),
        }
    }

    /// Creates a wait timeout error.
    #[inline]
    pub fn timeout(message: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            message: message.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error is a programmer mistake.
    ///
    /// Usage errors are never waited for or retried.
    #[inline]
    #[must_use]
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::InvalidSelector { .. } | Self::Locator { .. })
    }

    /// Returns `true` if this error is a resolution or wait timeout.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::UnknownObject { .. }
                | Self::ObjectDisabled { .. }
                | Self::ObjectReadOnly { .. }
                | Self::Timeout { .. }
        )
    }

    /// Returns the underlying driver error, if any.
    #[inline]
    #[must_use]
    pub fn as_driver(&self) -> Option<&DriverError> {
        match self {
            Self::Driver(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Formats a duration as seconds for diagnostic messages.
pub(crate) fn format_secs(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}", d.as_secs())
    } else {
        format!("{:.3}", d.as_secs_f64())
    }
}

// ============================================================================
// Tests
// ============================================================================
