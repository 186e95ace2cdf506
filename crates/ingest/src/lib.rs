//! `marketsync-ingest` — webhook intake and the background sync queue.
//!
//! The dispatcher turns inbound marketplace webhooks into queued sync jobs
//! and returns immediately; a background runner claims jobs, executes the
//! registered handler, and retries transient failures with backoff until
//! they succeed or dead-letter. Delivery to handlers is at-least-once.

pub mod dispatcher;
pub mod event;
pub mod job;
pub mod runner;
pub mod store;

pub use dispatcher::{DispatchError, DispatchOutcome, Dispatcher, DropReason};
pub use event::{WebhookEvent, WebhookTopic};
pub use job::{Job, JobId, JobKind, JobResult, JobStatus, RetryPolicy};
pub use runner::{JobHandler, JobRunner, RunnerConfig, RunnerHandle, RunnerStats};
pub use store::{DeadLetterEntry, InMemoryJobStore, JobStore, JobStoreError};
