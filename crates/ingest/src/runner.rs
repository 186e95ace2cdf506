//! Background job runner.
//!
//! Claims ready jobs from the store and executes the handler registered for
//! the job's kind. Transient failures go back into the queue with backoff;
//! deterministic failures and exhausted retries are dead-lettered.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use marketsync_core::TenantId;

use crate::job::{Job, JobKind, JobResult, JobStatus};
use crate::store::JobStore;

pub type JobHandler = Box<dyn Fn(&Job) -> JobResult + Send + Sync>;

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub poll_interval: Duration,
    pub name: String,
    /// Restrict the runner to one tenant's jobs; `None` serves all tenants.
    pub tenant_id: Option<TenantId>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            name: "sync-runner".to_string(),
            tenant_id: None,
        }
    }
}

/// Runtime counters, readable through [`RunnerHandle::stats`].
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct RunnerStats {
    pub processed: u64,
    pub succeeded: u64,
    pub retried: u64,
    pub dead_lettered: u64,
}

/// Handle to a spawned runner thread.
#[derive(Debug)]
pub struct RunnerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
    stats: Arc<Mutex<RunnerStats>>,
}

impl RunnerHandle {
    /// Stop polling and join the thread.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    pub fn stats(&self) -> RunnerStats {
        *self.stats.lock().unwrap()
    }
}

pub struct JobRunner<S> {
    store: S,
    handlers: HashMap<JobKind, JobHandler>,
}

impl<S> JobRunner<S>
where
    S: JobStore + 'static,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, kind: JobKind, handler: F)
    where
        F: Fn(&Job) -> JobResult + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Claim and execute jobs until the queue has no ready work left.
    ///
    /// Synchronous alternative to [`JobRunner::spawn`]; the number of jobs
    /// executed is returned. Jobs parked in a backoff window are not waited
    /// for.
    pub fn run_pending(&self, tenant_id: Option<TenantId>) -> usize {
        let mut executed = 0;
        while let Ok(Some(mut job)) = self.store.claim_next(tenant_id) {
            self.execute(&mut job);
            executed += 1;
        }
        executed
    }

    /// Run the polling loop on a background thread.
    ///
    /// Takes `Arc<Self>` so the caller can keep a handle on the runner (for
    /// [`JobRunner::run_pending`]) while the loop owns its own reference.
    pub fn spawn(self: Arc<Self>, config: RunnerConfig) -> std::io::Result<RunnerHandle>
    where
        S: Send + Sync,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let stats = Arc::new(Mutex::new(RunnerStats::default()));
        let loop_stats = stats.clone();

        let name = config.name.clone();
        let join = thread::Builder::new()
            .name(name)
            .spawn(move || runner_loop(self, config, shutdown_rx, loop_stats))?;

        Ok(RunnerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
            stats,
        })
    }

    /// Execute one already-claimed job and persist the outcome.
    fn execute(&self, job: &mut Job) -> RunnerStats {
        let mut delta = RunnerStats {
            processed: 1,
            ..Default::default()
        };

        let Some(handler) = self.handlers.get(&job.kind) else {
            // A kind with no handler is a wiring bug; retrying cannot help.
            let reason = format!("no handler registered for {:?}", job.kind);
            error!(job_id = %job.id, kind = ?job.kind, "unroutable job, dead-lettering");
            job.mark_fatal(reason.clone());
            if let Err(e) = self.store.dead_letter(job.clone(), reason) {
                error!(job_id = %job.id, error = %e, "failed to dead-letter job");
            }
            delta.dead_lettered = 1;
            return delta;
        };

        match handler(job) {
            JobResult::Completed => {
                job.mark_completed();
                if let Err(e) = self.store.update(job) {
                    error!(job_id = %job.id, error = %e, "failed to persist job completion");
                }
                debug!(job_id = %job.id, attempt = job.attempt, "job completed");
                delta.succeeded = 1;
            }
            JobResult::Retry(reason) => {
                job.mark_failed(reason.clone());
                match &job.status {
                    JobStatus::DeadLettered { .. } => {
                        warn!(job_id = %job.id, attempts = job.attempt, reason, "retries exhausted, dead-lettering");
                        if let Err(e) = self.store.dead_letter(job.clone(), reason) {
                            error!(job_id = %job.id, error = %e, "failed to dead-letter job");
                        }
                        delta.dead_lettered = 1;
                    }
                    _ => {
                        debug!(job_id = %job.id, attempt = job.attempt, reason, "job failed, retry scheduled");
                        if let Err(e) = self.store.update(job) {
                            error!(job_id = %job.id, error = %e, "failed to persist job retry");
                        }
                        delta.retried = 1;
                    }
                }
            }
            JobResult::Fatal(reason) => {
                warn!(job_id = %job.id, reason, "deterministic failure, dead-lettering");
                job.mark_fatal(reason.clone());
                if let Err(e) = self.store.dead_letter(job.clone(), reason) {
                    error!(job_id = %job.id, error = %e, "failed to dead-letter job");
                }
                delta.dead_lettered = 1;
            }
        }

        delta
    }
}

fn runner_loop<S: JobStore + 'static>(
    runner: Arc<JobRunner<S>>,
    config: RunnerConfig,
    shutdown_rx: mpsc::Receiver<()>,
    stats: Arc<Mutex<RunnerStats>>,
) {
    info!(runner = %config.name, "job runner started");

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match runner.store.claim_next(config.tenant_id) {
            Ok(Some(mut job)) => {
                debug!(runner = %config.name, job_id = %job.id, kind = ?job.kind, "claimed job");
                let delta = runner.execute(&mut job);
                let mut s = stats.lock().unwrap();
                s.processed += delta.processed;
                s.succeeded += delta.succeeded;
                s.retried += delta.retried;
                s.dead_lettered += delta.dead_lettered;
            }
            Ok(None) => thread::sleep(config.poll_interval),
            Err(e) => {
                error!(runner = %config.name, error = %e, "failed to claim job");
                thread::sleep(config.poll_interval);
            }
        }
    }

    info!(runner = %config.name, "job runner stopped");
}
