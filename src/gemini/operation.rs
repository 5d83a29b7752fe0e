use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::client::{FileSearchApi, GeminiError};
use super::types::Operation;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

/// How often and how long to poll a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("Operation timed out after {}s.", .0.as_secs())]
    Timeout(Duration),

    #[error(transparent)]
    Gemini(#[from] GeminiError),
}

/// Polls `op` until it reports done. Gives up once `policy.max_wait` has
/// elapsed; the remote operation is left running.
///
/// Time is read from tokio's clock, so tests drive it with a paused runtime.
pub async fn wait_operation(
    api: &impl FileSearchApi,
    mut op: Operation,
    policy: PollPolicy,
) -> Result<Operation, WaitError> {
    let start = Instant::now();
    let mut polls = 0u32;

    while !op.done {
        let elapsed = start.elapsed();
        if elapsed >= policy.max_wait {
            warn!(operation = %op.name, polls, elapsed_ms = elapsed.as_millis() as u64, "operation timed out");
            return Err(WaitError::Timeout(elapsed));
        }
        sleep(policy.interval.min(policy.max_wait - elapsed)).await;
        op = api.get_operation(&op.name).await?;
        polls += 1;
        debug!(operation = %op.name, polls, done = op.done, "operation polled");
    }

    Ok(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::testing::MockApi;

    fn pending(name: &str) -> Operation {
        Operation {
            name: name.to_string(),
            done: false,
            response: None,
            error: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn already_done_operation_returns_without_polling() {
        let api = MockApi::default();
        let mut op = pending("operations/1");
        op.done = true;

        let result = wait_operation(&api, op, PollPolicy::default()).await.unwrap();

        assert!(result.done);
        assert_eq!(api.calls().get_operation, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn completes_on_first_poll() {
        let api = MockApi::default().with_polls_until_done(1);
        let start = Instant::now();

        let result = wait_operation(&api, pending("operations/1"), PollPolicy::default())
            .await
            .unwrap();

        assert!(result.done);
        assert_eq!(api.calls().get_operation, 1);
        assert_eq!(start.elapsed(), DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn never_done_operation_times_out_within_bound() {
        let api = MockApi::default().never_done();
        let policy = PollPolicy::default();
        let start = Instant::now();

        let err = wait_operation(&api, pending("operations/1"), policy)
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Timeout(_)));
        let elapsed = start.elapsed();
        assert!(elapsed >= policy.max_wait);
        assert!(elapsed <= policy.max_wait + policy.interval);
        assert_eq!(api.calls().get_operation, 150);
    }

    #[tokio::test(start_paused = true)]
    async fn last_sleep_is_capped_at_max_wait() {
        let api = MockApi::default().never_done();
        let policy = PollPolicy {
            interval: Duration::from_secs(4),
            max_wait: Duration::from_secs(10),
        };
        let start = Instant::now();

        let err = wait_operation(&api, pending("operations/1"), policy)
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Timeout(_)));
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(api.calls().get_operation, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_error_is_propagated() {
        let api = MockApi::default().failing_operation_poll();

        let err = wait_operation(&api, pending("operations/1"), PollPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Gemini(GeminiError::Api { .. })));
    }
}
