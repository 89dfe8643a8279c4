//! Fail-open utilities for graceful degradation
//!
//! Use these for work whose failure must never disturb the run state:
//! display refreshes, diagnostic writes, early cooldown probes.
//!
//! DO NOT use fail-open for:
//! - Sending chat messages (that is the unit of work)
//! - Quota checks that gate sending
//! - Login during start

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Run an operation whose failure is logged and swallowed
///
/// Returns `None` on failure.
///
/// ```no_run
/// use cadence_core::fail_open::fail_open;
/// use cadence_core::Result;
///
/// async fn refresh_points() -> Result<u64> {
///     Ok(42)
/// }
///
/// async fn example() {
///     let points = fail_open("points_refresh", || refresh_points()).await;
///     // points is None if the refresh failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}

/// Synchronous variant for blocking sinks such as file appends
pub fn fail_open_sync<F, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Result<T>,
{
    match f() {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            None
        }
    }
}
