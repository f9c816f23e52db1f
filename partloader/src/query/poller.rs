// Copyright (c) 2025 partloader contributors
// SPDX-License-Identifier: Apache-2.0
//
//! Waiting for a submitted query to reach a terminal state
//!
//! ```text
//! QUEUED / RUNNING ──sleep──▶ poll again
//!        │
//!        ├─ SUCCEEDED ─────────────────────────▶ Completion::Succeeded
//!        ├─ FAILED + "AlreadyExistsException" ─▶ Completion::AlreadyExists
//!        ├─ FAILED ────────────────────────────▶ LoaderError::ExecutionFailed
//!        └─ CANCELLED ─────────────────────────▶ LoaderError::ExecutionCancelled
//! ```
//!
//! A failed status call ends the wait immediately. The wait is bounded by
//! [`PollPolicy::max_attempts`] and can be interrupted through a
//! [`CancellationToken`].

use super::client::QueryHandle;
use super::engine::{QueryEngine, QueryState};
use crate::error::{LoaderError, LoaderResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Marker in a FAILED state reason raised when the target already exists
pub const ALREADY_EXISTS_MARKER: &str = "AlreadyExistsException";

/// Upper bound for a single exponential backoff delay
const BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Granularity at which a sleeping poller notices cancellation
const CANCEL_CHECK_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay between every status check
    #[default]
    Fixed,
    /// Delay doubles per check, capped, with a little jitter
    Exponential,
}

impl std::str::FromStr for Backoff {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed),
            "exponential" => Ok(Backoff::Exponential),
            _ => Err(format!(
                "Unknown backoff: {}. Valid options: fixed, exponential",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Delay after a non-terminal status check
    pub interval: Duration,

    /// Maximum number of status checks; `None` waits forever
    pub max_attempts: Option<u32>,

    pub backoff: Backoff,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: Some(900), // 15 minutes at the default interval
            backoff: Backoff::Fixed,
        }
    }
}

impl PollPolicy {
    /// Fixed interval, no attempt limit
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
            backoff: Backoff::Fixed,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Delay to wait after the `attempt`-th (1-based) non-terminal check
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.interval,
            Backoff::Exponential => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                let base = self.interval.saturating_mul(factor).min(BACKOFF_MAX);
                let jitter_ms = (base.as_millis() / 10) as u64;
                if jitter_ms == 0 {
                    base
                } else {
                    base + Duration::from_millis(fastrand::u64(0..=jitter_ms))
                }
            }
        }
    }
}

/// How a query reached a successful end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    /// The catalog refused because the target already exists; treated as a
    /// successful no-op.
    AlreadyExists,
}

#[derive(Clone)]
pub struct CompletionPoller {
    engine: Arc<dyn QueryEngine>,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl CompletionPoller {
    pub fn new(engine: Arc<dyn QueryEngine>, policy: PollPolicy) -> Self {
        Self {
            engine,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub fn await_completion(&self, handle: &QueryHandle) -> LoaderResult<Completion> {
        let execution_id = handle.execution_id();
        let mut attempts: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                log::warn!("Stopped waiting for query {}: cancelled", execution_id);
                return Err(LoaderError::Cancelled(execution_id.to_string()));
            }

            attempts += 1;
            let status = self.engine.get_query_execution(execution_id).map_err(|e| {
                log::error!("Error getting query execution for {} ({})", execution_id, e);
                LoaderError::Polling(format!("{}: {}", execution_id, e))
            })?;

            if !status.state.is_terminal() {
                if let Some(max) = self.policy.max_attempts {
                    if attempts >= max {
                        log::error!(
                            "Query {} still {} after {} checks, giving up",
                            execution_id,
                            status.state,
                            attempts
                        );
                        return Err(LoaderError::Timeout {
                            execution_id: execution_id.to_string(),
                            attempts,
                        });
                    }
                }
                log::debug!("Query {} is {}", execution_id, status.state);
                self.sleep(self.policy.delay_for(attempts), execution_id)?;
                continue;
            }

            match status.state {
                QueryState::Succeeded => {
                    log::info!("Query {} completed successfully", execution_id);
                    return Ok(Completion::Succeeded);
                }
                QueryState::Failed => {
                    let reason = status.state_change_reason.unwrap_or_default();
                    if reason.contains(ALREADY_EXISTS_MARKER) {
                        log::info!(
                            "Query {} reported an existing target, treating as success",
                            execution_id
                        );
                        return Ok(Completion::AlreadyExists);
                    }
                    log::error!(
                        "Query {} failed: {} ({})",
                        execution_id,
                        reason,
                        handle.query()
                    );
                    return Err(LoaderError::ExecutionFailed {
                        execution_id: execution_id.to_string(),
                        reason,
                    });
                }
                _ => {
                    log::error!("Query {} was cancelled", execution_id);
                    return Err(LoaderError::ExecutionCancelled(execution_id.to_string()));
                }
            }
        }
    }

    fn sleep(&self, delay: Duration, execution_id: &str) -> LoaderResult<()> {
        let deadline = Instant::now() + delay;
        loop {
            if self.cancel.is_cancelled() {
                return Err(LoaderError::Cancelled(execution_id.to_string()));
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(CANCEL_CHECK_SLICE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::memory::{MemoryQueryEngine, ScriptedOutcome};

    fn submit(engine: &MemoryQueryEngine, sql: &str) -> QueryHandle {
        let id = engine.submit_statement(sql, "db").unwrap();
        QueryHandle::new(id, sql)
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy::unbounded(Duration::ZERO)
    }

    #[test]
    fn test_running_then_succeeded() {
        let engine = Arc::new(MemoryQueryEngine::new().with_running_polls(3));
        engine.create_table("db", "events");
        let handle = submit(&engine, "SHOW PARTITIONS events");

        let poller = CompletionPoller::new(engine.clone(), fast_policy());
        assert_eq!(poller.await_completion(&handle).unwrap(), Completion::Succeeded);
        assert_eq!(engine.status_checks(handle.execution_id()), 4);
    }

    #[test]
    fn test_already_exists_is_success() {
        let engine = Arc::new(MemoryQueryEngine::new());
        engine.script_next_outcome(ScriptedOutcome::Failed(
            "AlreadyExistsException: Partition already exists.".to_string(),
        ));
        let handle = submit(&engine, "ALTER TABLE events ADD PARTITION (year = '2024') LOCATION 's3://b/year=2024'");

        let poller = CompletionPoller::new(engine.clone(), fast_policy());
        assert_eq!(
            poller.await_completion(&handle).unwrap(),
            Completion::AlreadyExists
        );
    }

    #[test]
    fn test_other_failure_is_error() {
        let engine = Arc::new(MemoryQueryEngine::new());
        engine.script_next_outcome(ScriptedOutcome::Failed("SYNTAX_ERROR: line 1:8".to_string()));
        let handle = submit(&engine, "SHOW PARTITIONS events");

        let poller = CompletionPoller::new(engine.clone(), fast_policy());
        match poller.await_completion(&handle) {
            Err(LoaderError::ExecutionFailed { reason, .. }) => {
                assert_eq!(reason, "SYNTAX_ERROR: line 1:8")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_cancelled_is_error() {
        let engine = Arc::new(MemoryQueryEngine::new());
        engine.script_next_outcome(ScriptedOutcome::Cancelled);
        let handle = submit(&engine, "SHOW PARTITIONS events");

        let poller = CompletionPoller::new(engine.clone(), fast_policy());
        assert!(matches!(
            poller.await_completion(&handle),
            Err(LoaderError::ExecutionCancelled(_))
        ));
    }

    #[test]
    fn test_poll_error_stops_immediately() {
        let engine = Arc::new(MemoryQueryEngine::new().with_running_polls(5));
        engine.create_table("db", "events");
        let handle = submit(&engine, "SHOW PARTITIONS events");
        engine.fail_next_poll("throttled");

        let poller = CompletionPoller::new(engine.clone(), fast_policy());
        assert!(matches!(
            poller.await_completion(&handle),
            Err(LoaderError::Polling(_))
        ));
        assert_eq!(engine.status_checks(handle.execution_id()), 0);
    }

    #[test]
    fn test_attempt_limit_times_out() {
        let engine = Arc::new(MemoryQueryEngine::new().with_running_polls(10));
        engine.create_table("db", "events");
        let handle = submit(&engine, "SHOW PARTITIONS events");

        let poller = CompletionPoller::new(engine.clone(), fast_policy().with_max_attempts(3));
        assert_eq!(
            poller.await_completion(&handle).unwrap_err(),
            LoaderError::Timeout {
                execution_id: handle.execution_id().to_string(),
                attempts: 3
            }
        );
    }

    #[test]
    fn test_cancellation_token() {
        let engine = Arc::new(MemoryQueryEngine::new().with_running_polls(10));
        engine.create_table("db", "events");
        let handle = submit(&engine, "SHOW PARTITIONS events");

        let token = CancellationToken::new();
        token.cancel();
        let poller = CompletionPoller::new(engine.clone(), fast_policy()).with_cancellation(token);
        assert!(matches!(
            poller.await_completion(&handle),
            Err(LoaderError::Cancelled(_))
        ));
    }

    #[test]
    fn test_exponential_delay_is_capped() {
        let policy = PollPolicy::unbounded(Duration::from_secs(1)).with_backoff(Backoff::Exponential);
        let first = policy.delay_for(1);
        assert!(first >= Duration::from_secs(1) && first <= Duration::from_millis(1100));
        let third = policy.delay_for(3);
        assert!(third >= Duration::from_secs(4) && third <= Duration::from_millis(4400));
        let late = policy.delay_for(40);
        assert!(late >= BACKOFF_MAX && late <= BACKOFF_MAX + Duration::from_secs(3));
    }

    #[test]
    fn test_fixed_delay() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(100), Duration::from_secs(1));
    }
}
