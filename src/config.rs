//! Engine configuration.
//!
//! An immutable [`Config`] is handed to [`Browser::new`](crate::Browser::new)
//! at construction; the engine never reads ambient global state. The
//! defaults match the conventional relaxed-locate behaviour: actions
//! implicitly wait up to 30 seconds, polling every 100 ms.

use std::time::Duration;

// ============================================================================
// Constants
// ============================================================================

/// Default wait budget for implicit and explicit waits.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default interval between condition polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Config
// ============================================================================

/// Immutable engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// When `true` (default), actions implicitly wait for their
    /// precondition. When `false`, a single existence assertion is
    /// performed and every other error propagates immediately.
    pub relaxed_locate: bool,

    /// Wait budget shared by every nested wait inside one logical
    /// operation.
    pub timeout: Duration,

    /// Sleep interval between condition polls. A timeout of zero skips
    /// polling entirely (single check).
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relaxed_locate: true,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Config {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relaxed-locate flag.
    #[must_use]
    pub fn relaxed_locate(mut self, relaxed: bool) -> Self {
        self.relaxed_locate = relaxed;
        self
    }

    /// Sets the wait budget.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.relaxed_locate);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_builder() {
        let config = Config::new()
            .relaxed_locate(false)
            .timeout(Duration::from_secs(5))
            .poll_interval(Duration::from_millis(10));
        assert!(!config.relaxed_locate);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_millis(10));
    }
}
