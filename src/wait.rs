//! Polling/wait engine.
//!
//! Retry-until-ready primitives with a fixed attempt budget. This is the only
//! place where the harness sleeps between checks; every operation that has to
//! wait for asynchronous rendering is expressed with [`wait_for`] or
//! [`wait_until`].
//!
//! # Attempt budget
//!
//! Both primitives compute the number of attempts up front:
//!
//! ```text
//! tries = floor((timeout - 1) / interval) + 1
//! ```
//!
//! so a timeout of a single interval still gets one attempt. The interval is
//! slept between attempts only, never after the last one.
//!
//! # Example
//!
//! ```ignore
//! use icu_harness::wait::{wait_until, WaitOptions};
//!
//! wait_until(|| async { Ok(page_is_ready().await) }, WaitOptions::new(5000, 100)).await?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout for wait operations.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval.
pub const DEFAULT_INTERVAL_MS: u64 = 200;

// ============================================================================
// WaitOptions
// ============================================================================

/// Timeout and polling interval for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds.
    pub timeout_ms: u64,
    /// Polling interval in milliseconds.
    pub interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Creates wait options.
    #[inline]
    #[must_use]
    pub const fn new(timeout_ms: u64, interval_ms: u64) -> Self {
        Self {
            timeout_ms,
            interval_ms,
        }
    }

    /// Number of attempts this wait performs before timing out.
    ///
    /// A zero interval is treated as one millisecond.
    #[inline]
    #[must_use]
    pub const fn tries(&self) -> u64 {
        let interval = if self.interval_ms == 0 { 1 } else { self.interval_ms };
        self.timeout_ms.saturating_sub(1) / interval + 1
    }

    /// Polling interval as a [`Duration`].
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

// ============================================================================
// Primitives
// ============================================================================

/// Polls `producer` until it yields a value.
///
/// `Ok(None)` means "not ready yet". An `Err` from the producer is returned
/// immediately without further attempts.
///
/// # Errors
///
/// [`Error::Timeout`] carrying the configured timeout when no attempt
/// produced a value.
pub async fn wait_for<T, F, Fut>(mut producer: F, options: WaitOptions) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let tries = options.tries();

    for attempt in 1..=tries {
        if let Some(value) = producer().await? {
            trace!(attempt, tries, "wait_for satisfied");
            return Ok(value);
        }
        if attempt < tries {
            sleep(options.interval()).await;
        }
    }

    Err(Error::timeout("wait_for", options.timeout_ms))
}

/// Polls `predicate` until it returns `true`.
///
/// # Errors
///
/// [`Error::Timeout`] carrying the configured timeout when the predicate
/// never held. Predicate errors are returned immediately.
pub async fn wait_until<F, Fut>(mut predicate: F, options: WaitOptions) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    wait_for(
        || {
            let check = predicate();
            async move { Ok::<_, Error>(check.await?.then_some(())) }
        },
        options,
    )
    .await
    .map_err(|e| match e {
        Error::Timeout { timeout_ms, .. } => Error::timeout("wait_until", timeout_ms),
        other => other,
    })
}

// ============================================================================
// Tests
// ============================================================================
