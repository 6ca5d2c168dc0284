//! Timeout guard: race a pending operation against a timer.
//!
//! The guard makes a single attempt. Whatever loses the race is dropped; when
//! the operation is a spawned task handle, dropping it detaches the task
//! rather than aborting it, so the transport finishes unobserved.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Request timeout in milliseconds. Zero or negative disables the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeoutSpec(i64);

impl TimeoutSpec {
    pub const DEFAULT: TimeoutSpec = TimeoutSpec(60_000);
    pub const DISABLED: TimeoutSpec = TimeoutSpec(0);

    pub const fn from_millis(millis: i64) -> Self {
        TimeoutSpec(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }

    pub const fn is_enforced(self) -> bool {
        self.0 > 0
    }

    /// The timer duration, or `None` when no timer should be created.
    pub fn duration(self) -> Option<Duration> {
        u64::try_from(self.0)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

impl Default for TimeoutSpec {
    fn default() -> Self {
        TimeoutSpec::DEFAULT
    }
}

impl From<i64> for TimeoutSpec {
    fn from(millis: i64) -> Self {
        TimeoutSpec(millis)
    }
}

impl From<Duration> for TimeoutSpec {
    fn from(duration: Duration) -> Self {
        TimeoutSpec(i64::try_from(duration.as_millis()).unwrap_or(i64::MAX))
    }
}

/// Await `operation`, failing with `FetchError::Timeout` if `timeout` elapses
/// first. With a disabled timeout the operation is awaited unchanged.
pub async fn race_with_timeout<F, R>(
    operation: F,
    timeout: TimeoutSpec,
    url: &str,
) -> Result<R, FetchError>
where
    F: Future<Output = Result<R, FetchError>>,
{
    let Some(limit) = timeout.duration() else {
        return operation.await;
    };

    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::debug!(url, timeout_ms = timeout.as_millis(), "request timed out");
            Err(FetchError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis(),
            })
        }
    }
}
