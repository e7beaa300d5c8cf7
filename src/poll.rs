//! Status polling for response tasks and sandbox submissions.
//!
//! The loop is fetch → evaluate → sleep → re-fetch: the resource is fetched
//! once up front, and while it is still `queued` or `running` and the
//! configured budget has not elapsed, the poller sleeps one interval and
//! fetches again. The budget is checked before each sleep, so the total
//! time spent can overshoot the timeout by at most one interval plus one
//! request.
//!
//! Timing out is not an error: the last fetched state is returned with
//! [`Polled::settled`] set to `false` so callers can tell the difference.

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::task::StatusResource;

/// Controls how often and for how long a status is polled.
///
/// Defaults:
/// - `interval`: 2 seconds between fetches.
/// - `timeout`: 30 minutes of total polling, measured from the first fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Sleep between consecutive fetches.
    pub interval: Duration,
    /// Polling budget; no further fetch is started once it has elapsed.
    pub timeout: Duration,
}

impl PollConfig {
    /// Creates a `PollConfig` with the given interval and timeout.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        PollConfig { interval, timeout }
    }

    /// Default interval with a custom timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        PollConfig {
            timeout,
            ..Default::default()
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval: Duration::from_secs(2),
            timeout: Duration::from_secs(1800),
        }
    }
}

/// Outcome of [`poll_status`].
#[derive(Debug, Clone, PartialEq)]
pub struct Polled<T> {
    /// The last fetched resource.
    pub resource: T,
    /// `true` when the resource reached a terminal status.
    pub settled: bool,
    /// Number of fetches performed (at least one).
    pub fetches: u32,
    /// Time spent from the first fetch to the last.
    pub elapsed: Duration,
}

/// Repeatedly fetches a resource until its status is terminal or the poll
/// budget runs out.
///
/// # Errors
///
/// Any error returned by `fetch` aborts polling and is returned unchanged.
pub async fn poll_status<T, F, Fut>(
    mut fetch: F,
    config: &PollConfig,
) -> crate::error::Result<Polled<T>>
where
    T: StatusResource,
    F: FnMut() -> Fut,
    Fut: Future<Output = crate::error::Result<T>>,
{
    let started = Instant::now();
    let mut resource = fetch().await?;
    let mut fetches = 1;

    while !resource.status().is_terminal() && started.elapsed() < config.timeout {
        debug!(status = ?resource.status(), fetches, "resource still in progress");
        tokio::time::sleep(config.interval).await;
        resource = fetch().await?;
        fetches += 1;
    }

    let settled = resource.status().is_terminal();
    let elapsed = started.elapsed();
    if settled {
        debug!(status = ?resource.status(), fetches, ?elapsed, "polling finished");
    } else {
        warn!(
            status = ?resource.status(),
            fetches,
            ?elapsed,
            timeout = ?config.timeout,
            "polling timed out before a terminal status"
        );
    }

    Ok(Polled {
        resource,
        settled,
        fetches,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Tmv1Error;
    use crate::task::TaskStatus;
    use std::cell::Cell;

    #[derive(Debug, Clone, PartialEq)]
    struct Fake(TaskStatus);

    impl StatusResource for Fake {
        fn status(&self) -> TaskStatus {
            self.0
        }
    }

    fn fast_poll() -> PollConfig {
        PollConfig::new(Duration::from_millis(5), Duration::from_secs(5))
    }

    #[test]
    fn default_config_values() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.timeout, Duration::from_secs(1800));
    }

    #[test]
    fn with_timeout_keeps_default_interval() {
        let config = PollConfig::with_timeout(Duration::from_secs(60));
        assert_eq!(config.interval, Duration::from_secs(2));
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn terminal_first_fetch_does_not_sleep() {
        let polled = poll_status(|| async { Ok(Fake(TaskStatus::Failed)) }, &PollConfig::default())
            .await
            .unwrap();
        assert!(polled.settled);
        assert_eq!(polled.fetches, 1);
        assert!(polled.elapsed < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn polls_until_terminal() {
        let sequence = [TaskStatus::Queued, TaskStatus::Running, TaskStatus::Succeeded];
        let calls = Cell::new(0usize);
        let polled = poll_status(
            || {
                let status = sequence[calls.get()];
                calls.set(calls.get() + 1);
                async move { Ok(Fake(status)) }
            },
            &fast_poll(),
        )
        .await
        .unwrap();
        assert_eq!(polled.fetches, 3);
        assert_eq!(polled.resource, Fake(TaskStatus::Succeeded));
        assert!(polled.settled);
    }

    #[tokio::test]
    async fn timeout_returns_last_state_unsettled() {
        let config = PollConfig::new(Duration::from_millis(10), Duration::from_millis(35));
        let polled = poll_status(|| async { Ok(Fake(TaskStatus::Running)) }, &config)
            .await
            .unwrap();
        assert!(!polled.settled);
        assert_eq!(polled.resource, Fake(TaskStatus::Running));
        assert!(polled.fetches >= 2);
    }

    #[tokio::test]
    async fn zero_timeout_fetches_once() {
        let config = PollConfig::new(Duration::from_millis(10), Duration::ZERO);
        let polled = poll_status(|| async { Ok(Fake(TaskStatus::Queued)) }, &config)
            .await
            .unwrap();
        assert_eq!(polled.fetches, 1);
        assert!(!polled.settled);
    }

    #[tokio::test]
    async fn fetch_error_aborts_polling() {
        let calls = Cell::new(0usize);
        let err = poll_status(
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n == 1 {
                        Ok(Fake(TaskStatus::Queued))
                    } else {
                        Err(Tmv1Error::Internal("boom".to_string()))
                    }
                }
            },
            &fast_poll(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Tmv1Error::Internal(_)));
        assert_eq!(calls.get(), 2);
    }
}
