//! Sync job types and retry policy.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use marketsync_core::TenantId;
use marketsync_orders::ExternalAccountId;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The sync work this system queues. Closed on purpose: every kind has a
/// registered handler, and an unhandled kind is a wiring bug, not data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Materialize an order payload (create and update webhooks both land here).
    OrderSync,
    /// Apply an inventory level change from the marketplace.
    InventorySync,
}

/// Job execution status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting to be claimed.
    Pending,
    /// Claimed by the runner.
    Running,
    /// Handler reported success.
    Completed,
    /// Transient failure; will be retried after backoff.
    Failed { error: String, attempt: u32 },
    /// Out of retries, or the failure was deterministic.
    DeadLettered { error: String, attempts: u32 },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::DeadLettered { .. })
    }
}

/// Exponential backoff with a cap.
///
/// Applies only to transient failures; deterministic failures skip retry
/// entirely (see [`crate::JobResult::Fatal`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts before dead-lettering (the first execution counts as one).
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
        }
    }

    /// Delay before the given attempt (1-indexed): base * 2^(attempt-1), capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let base_ms = self.base_delay.as_millis() as u64;
        let exp = 2u64.saturating_pow(attempt.saturating_sub(1));
        let delay_ms = base_ms.saturating_mul(exp);
        Duration::from_millis(delay_ms).min(self.max_delay)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// A queued sync job, scoped to one tenant's marketplace account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub account_id: ExternalAccountId,
    pub kind: JobKind,
    /// Raw webhook payload, passed through to the handler untouched.
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub retry_policy: RetryPolicy,
    /// Attempt counter, bumped when the runner claims the job.
    pub attempt: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Earliest next execution (set by retry backoff).
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        tenant_id: TenantId,
        account_id: ExternalAccountId,
        kind: JobKind,
        payload: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            tenant_id,
            account_id,
            kind,
            payload,
            status: JobStatus::Pending,
            retry_policy: RetryPolicy::default(),
            attempt: 0,
            created_at: now,
            updated_at: now,
            scheduled_at: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Pending jobs still inside their backoff window are not ready.
    pub fn is_ready(&self) -> bool {
        match self.scheduled_at {
            Some(at) => Utc::now() >= at,
            None => true,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.attempt += 1;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.status = JobStatus::Completed;
        self.updated_at = Utc::now();
    }

    /// Transient failure: schedule a retry with backoff, or dead-letter when
    /// the policy is exhausted.
    pub fn mark_failed(&mut self, error: String) {
        let now = Utc::now();
        self.updated_at = now;

        if self.retry_policy.should_retry(self.attempt) {
            let delay = self.retry_policy.delay_for_attempt(self.attempt);
            self.scheduled_at =
                Some(now + chrono::Duration::from_std(delay).unwrap_or_default());
            self.status = JobStatus::Failed {
                error,
                attempt: self.attempt,
            };
        } else {
            self.status = JobStatus::DeadLettered {
                error,
                attempts: self.attempt,
            };
        }
    }

    /// Deterministic failure: retrying would produce the same result, so the
    /// job goes straight to the dead-letter queue.
    pub fn mark_fatal(&mut self, error: String) {
        self.status = JobStatus::DeadLettered {
            error,
            attempts: self.attempt,
        };
        self.updated_at = Utc::now();
    }
}

/// What a handler reports back to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    /// Done; the job is complete.
    Completed,
    /// Transient failure; retry with backoff.
    Retry(String),
    /// Deterministic failure; dead-letter without retrying.
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(
            TenantId::new(),
            ExternalAccountId::new(marketsync_core::EntityId::new()),
            JobKind::OrderSync,
            serde_json::json!({}),
        )
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(
            5,
            Duration::from_millis(100),
            Duration::from_millis(500),
        );

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_millis(500));
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            ..Default::default()
        };

        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[test]
    fn lifecycle_pending_running_completed() {
        let mut job = job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempt, 0);

        job.mark_running();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.attempt, 1);

        job.mark_completed();
        assert!(job.status.is_terminal());
    }

    #[test]
    fn failure_schedules_backoff_until_exhausted() {
        let mut job = job().with_retry_policy(RetryPolicy {
            max_attempts: 2,
            ..Default::default()
        });

        job.mark_running();
        job.mark_failed("timeout".into());
        assert!(matches!(job.status, JobStatus::Failed { .. }));
        assert!(job.scheduled_at.is_some());
        assert!(!job.is_ready(), "backoff window must hold the job");

        job.mark_running();
        job.mark_failed("timeout".into());
        assert!(matches!(job.status, JobStatus::DeadLettered { attempts: 2, .. }));
    }

    #[test]
    fn fatal_skips_retries() {
        let mut job = job();
        job.mark_running();
        job.mark_fatal("validation failed".into());
        assert!(matches!(job.status, JobStatus::DeadLettered { attempts: 1, .. }));
    }
}
