//! Shared wait timer.
//!
//! Every wait inside one browser session draws from the same timer. The
//! outermost wait locks in a deadline; nested waits started while the
//! timer is locked reuse the remaining time instead of starting their
//! own, so a chain of retrying operations can never exceed the budget of
//! the operation that started it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

// ============================================================================
// Timer
// ============================================================================

/// A lockable deadline shared across nested waits.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    deadline: Arc<Mutex<Option<Instant>>>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an outer wait currently owns the deadline.
    pub fn locked(&self) -> bool {
        self.deadline.lock().is_some()
    }

    /// Acquires the timer for a wait of at most `timeout`. If the timer
    /// is already locked the guard borrows the outer deadline; otherwise
    /// it sets one and releases it on drop.
    pub fn acquire(&self, timeout: Duration) -> TimerGuard {
        let mut deadline = self.deadline.lock();
        let owner = deadline.is_none();
        if owner {
            *deadline = Some(Instant::now() + timeout);
        }
        TimerGuard {
            timer: self.clone(),
            owner,
        }
    }

    /// Time left until the deadline, zero when expired or unlocked.
    pub fn remaining(&self) -> Duration {
        match *self.deadline.lock() {
            Some(deadline) => deadline.saturating_duration_since(Instant::now()),
            None => Duration::ZERO,
        }
    }
}

// ============================================================================
// TimerGuard
// ============================================================================

/// Releases the deadline when the owning wait finishes, by any path.
#[derive(Debug)]
pub struct TimerGuard {
    timer: Timer,
    owner: bool,
}

impl TimerGuard {
    /// Time left on the shared deadline.
    pub fn remaining(&self) -> Duration {
        self.timer.remaining()
    }

    /// Whether the deadline has passed. Exactly-at-deadline counts as
    /// expired.
    pub fn expired(&self) -> bool {
        self.remaining() == Duration::ZERO
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        if self.owner {
            *self.timer.deadline.lock() = None;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
