//! Polling waits.
//!
//! [`until`] and [`while_`] poll an async condition against the shared
//! [`Timer`], sleeping between checks. A zero timeout performs exactly
//! one check. Timeouts surface as [`Error::Timeout`] with the elapsed
//! budget and any caller-supplied message.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::trace;

use crate::error::{Error, Result, format_secs};

pub mod timer;

pub use timer::{Timer, TimerGuard};

// ============================================================================
// Waiting
// ============================================================================

/// Polls `condition` until it returns `true` or the shared deadline
/// passes. Condition errors abort the wait immediately.
pub async fn until<F, Fut>(
    timer: &Timer,
    timeout: Duration,
    poll: Duration,
    message: Option<&str>,
    mut condition: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let guard = timer.acquire(timeout);

    if timeout.is_zero() {
        // One check, no sleeping.
        if condition().await? {
            return Ok(());
        }
        return Err(timeout_error(timeout, message));
    }

    loop {
        if condition().await? {
            return Ok(());
        }
        let remaining = guard.remaining();
        if remaining.is_zero() {
            trace!(timeout_ms = timeout.as_millis() as u64, "wait timed out");
            return Err(timeout_error(timeout, message));
        }
        sleep(poll.min(remaining)).await;
    }
}

/// Polls `condition` until it returns `false`.
pub async fn while_<F, Fut>(
    timer: &Timer,
    timeout: Duration,
    poll: Duration,
    message: Option<&str>,
    mut condition: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    until(timer, timeout, poll, message, || {
        let fut = condition();
        async move { Ok(!fut.await?) }
    })
    .await
}

fn timeout_error(timeout: Duration, message: Option<&str>) -> Error {
    let base = format!("timed out after {} seconds", format_secs(timeout));
    let full = match message {
        Some(msg) => format!("{base}, {msg}"),
        None => base,
    };
    Error::timeout(full, timeout)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_until_succeeds_when_condition_flips() {
        let timer = Timer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        until(
            &timer,
            Duration::from_secs(5),
            Duration::from_millis(100),
            None,
            move || {
                let c = c.clone();
                async move { Ok(c.fetch_add(1, Ordering::SeqCst) >= 3) }
            },
        )
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_until_times_out_with_message() {
        let timer = Timer::new();
        let err = until(
            &timer,
            Duration::from_secs(2),
            Duration::from_millis(100),
            Some("waiting for it"),
            || async { Ok(false) },
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "timed out after 2 seconds, waiting for it"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_checks_once() {
        let timer = Timer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let result = until(
            &timer,
            Duration::ZERO,
            Duration::from_millis(100),
            None,
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(false)
                }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_condition_error_aborts() {
        let timer = Timer::new();
        let err = until(
            &timer,
            Duration::from_secs(5),
            Duration::from_millis(100),
            None,
            || async { Err(Error::locator("boom")) },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Locator { .. }));
        assert!(!timer.locked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nested_wait_shares_budget() {
        let timer = Timer::new();
        let inner_timer = timer.clone();
        let err = until(
            &timer,
            Duration::from_secs(1),
            Duration::from_millis(100),
            None,
            move || {
                let t = inner_timer.clone();
                async move {
                    // A nested wait asking for far more time still expires
                    // with the outer deadline.
                    match until(
                        &t,
                        Duration::from_secs(600),
                        Duration::from_millis(100),
                        None,
                        || async { Ok(false) },
                    )
                    .await
                    {
                        Err(e) if e.is_timeout() => Err(e),
                        other => other.map(|()| true),
                    }
                }
            },
        )
        .await
        .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_while_waits_for_false() {
        let timer = Timer::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        while_(
            &timer,
            Duration::from_secs(5),
            Duration::from_millis(100),
            None,
            move || {
                let c = c.clone();
                async move { Ok(c.fetch_add(1, Ordering::SeqCst) < 2) }
            },
        )
        .await
        .unwrap();
    }
}
