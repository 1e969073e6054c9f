use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::error::{CollectorError, Result};

/// Bound and polling interval of a wait on page state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl WaitPolicy {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

/// Polls `probe` until it reports `true` or the policy's bound runs out.
///
/// The probe is always evaluated at least once. Errors returned by the probe
/// end the wait immediately.
pub async fn wait_until<F, Fut>(policy: WaitPolicy, what: &str, mut probe: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + policy.timeout;

    loop {
        if probe().await? {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(CollectorError::Timeout {
                what: what.to_string(),
                after: policy.timeout,
            });
        }

        sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick() -> WaitPolicy {
        WaitPolicy {
            timeout: Duration::from_millis(60),
            interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_wait_until_succeeds_after_a_few_polls() {
        let polls = Cell::new(0);
        wait_until(quick(), "third poll", || {
            polls.set(polls.get() + 1);
            let done = polls.get() >= 3;
            async move { Ok(done) }
        })
        .await
        .unwrap();

        assert_eq!(polls.get(), 3);
    }

    #[tokio::test]
    async fn test_wait_until_times_out() {
        let err = wait_until(quick(), "never", || async { Ok(false) })
            .await
            .unwrap_err();

        match err {
            CollectorError::Timeout { what, after } => {
                assert_eq!(what, "never");
                assert_eq!(after, Duration::from_millis(60));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_wait_until_propagates_probe_errors() {
        let err = wait_until(quick(), "broken", || async {
            Err(CollectorError::ElementNotFound("#make".to_string()))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, CollectorError::ElementNotFound(_)));
    }
}
