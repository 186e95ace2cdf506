//! Job queue storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use marketsync_core::TenantId;

use crate::job::{Job, JobId, JobStatus};

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("tenant isolation violation")]
    TenantIsolation,
    #[error("job already enqueued: {0}")]
    AlreadyExists(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// A job that exhausted its retries (or failed deterministically), parked for
/// operator inspection.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetterEntry {
    pub job: Job,
    pub dead_lettered_at: DateTime<Utc>,
    pub reason: String,
}

impl DeadLetterEntry {
    pub fn new(job: Job, reason: String) -> Self {
        Self {
            job,
            dead_lettered_at: Utc::now(),
            reason,
        }
    }
}

pub trait JobStore: Send + Sync {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError>;

    fn get(&self, tenant_id: TenantId, job_id: JobId) -> Result<Option<Job>, JobStoreError>;

    fn update(&self, job: &Job) -> Result<(), JobStoreError>;

    /// Claim the oldest ready job, marking it running.
    ///
    /// `tenant_id` filters to one tenant; `None` claims across all tenants.
    /// Claiming happens under the write lock, so two runners never take the
    /// same job.
    fn claim_next(&self, tenant_id: Option<TenantId>) -> Result<Option<Job>, JobStoreError>;

    /// Park a job in the dead-letter queue and drop it from the live queue.
    fn dead_letter(&self, job: Job, reason: String) -> Result<(), JobStoreError>;

    fn list_dead_letters(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, JobStoreError>;

    /// Re-queue a dead-lettered job with a fresh attempt budget.
    fn retry_dead_letter(&self, tenant_id: TenantId, job_id: JobId) -> Result<Job, JobStoreError>;
}

impl<S> JobStore for Arc<S>
where
    S: JobStore + ?Sized,
{
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        (**self).enqueue(job)
    }

    fn get(&self, tenant_id: TenantId, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).get(tenant_id, job_id)
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        (**self).update(job)
    }

    fn claim_next(&self, tenant_id: Option<TenantId>) -> Result<Option<Job>, JobStoreError> {
        (**self).claim_next(tenant_id)
    }

    fn dead_letter(&self, job: Job, reason: String) -> Result<(), JobStoreError> {
        (**self).dead_letter(job, reason)
    }

    fn list_dead_letters(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, JobStoreError> {
        (**self).list_dead_letters(tenant_id, limit)
    }

    fn retry_dead_letter(&self, tenant_id: TenantId, job_id: JobId) -> Result<Job, JobStoreError> {
        (**self).retry_dead_letter(tenant_id, job_id)
    }
}

/// In-memory job store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    dead_letters: RwLock<HashMap<JobId, DeadLetterEntry>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn pending_count(&self) -> usize {
        self.jobs
            .read()
            .unwrap()
            .values()
            .filter(|j| matches!(j.status, JobStatus::Pending | JobStatus::Failed { .. }))
            .count()
    }
}

impl JobStore for InMemoryJobStore {
    fn enqueue(&self, job: Job) -> Result<JobId, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(JobStoreError::AlreadyExists(job.id));
        }
        let id = job.id;
        jobs.insert(id, job);
        Ok(id)
    }

    fn get(&self, tenant_id: TenantId, job_id: JobId) -> Result<Option<Job>, JobStoreError> {
        let jobs = self.jobs.read().unwrap();
        match jobs.get(&job_id) {
            Some(job) if job.tenant_id == tenant_id => Ok(Some(job.clone())),
            Some(_) => Err(JobStoreError::TenantIsolation),
            None => Ok(None),
        }
    }

    fn update(&self, job: &Job) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        if !jobs.contains_key(&job.id) {
            return Err(JobStoreError::NotFound(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn claim_next(&self, tenant_id: Option<TenantId>) -> Result<Option<Job>, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();

        // Oldest ready job wins (FIFO by enqueue time).
        let claimed = jobs
            .values()
            .filter(|j| {
                matches!(j.status, JobStatus::Pending | JobStatus::Failed { .. })
                    && j.is_ready()
                    && tenant_id.is_none_or(|t| j.tenant_id == t)
            })
            .min_by_key(|j| j.created_at)
            .map(|j| j.id);

        if let Some(job_id) = claimed {
            if let Some(job) = jobs.get_mut(&job_id) {
                job.mark_running();
                return Ok(Some(job.clone()));
            }
        }
        Ok(None)
    }

    fn dead_letter(&self, mut job: Job, reason: String) -> Result<(), JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let mut dls = self.dead_letters.write().unwrap();

        job.status = JobStatus::DeadLettered {
            error: reason.clone(),
            attempts: job.attempt,
        };
        job.updated_at = Utc::now();

        jobs.remove(&job.id);
        dls.insert(job.id, DeadLetterEntry::new(job, reason));
        Ok(())
    }

    fn list_dead_letters(
        &self,
        tenant_id: TenantId,
        limit: usize,
    ) -> Result<Vec<DeadLetterEntry>, JobStoreError> {
        let dls = self.dead_letters.read().unwrap();
        let mut result: Vec<_> = dls
            .values()
            .filter(|e| e.job.tenant_id == tenant_id)
            .cloned()
            .collect();

        result.sort_by_key(|e| e.dead_lettered_at);
        result.truncate(limit);
        Ok(result)
    }

    fn retry_dead_letter(&self, tenant_id: TenantId, job_id: JobId) -> Result<Job, JobStoreError> {
        let mut jobs = self.jobs.write().unwrap();
        let mut dls = self.dead_letters.write().unwrap();

        let entry = dls.remove(&job_id).ok_or(JobStoreError::NotFound(job_id))?;
        if entry.job.tenant_id != tenant_id {
            dls.insert(job_id, entry);
            return Err(JobStoreError::TenantIsolation);
        }

        let mut job = entry.job;
        job.status = JobStatus::Pending;
        job.attempt = 0;
        job.scheduled_at = None;
        job.updated_at = Utc::now();

        jobs.insert(job.id, job.clone());
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use marketsync_core::EntityId;
    use marketsync_orders::ExternalAccountId;

    use super::*;
    use crate::job::JobKind;

    fn job(tenant_id: TenantId) -> Job {
        Job::new(
            tenant_id,
            ExternalAccountId::new(EntityId::new()),
            JobKind::OrderSync,
            serde_json::json!({}),
        )
    }

    #[test]
    fn enqueue_and_claim_fifo() {
        let store = InMemoryJobStore::new();
        let tenant = TenantId::new();

        let first = store.enqueue(job(tenant)).unwrap();
        let second = store.enqueue(job(tenant)).unwrap();

        let claimed = store.claim_next(Some(tenant)).unwrap().unwrap();
        assert_eq!(claimed.id, first);
        assert_eq!(claimed.status, JobStatus::Running);
        assert_eq!(claimed.attempt, 1);

        assert_eq!(store.claim_next(Some(tenant)).unwrap().unwrap().id, second);
        assert!(store.claim_next(Some(tenant)).unwrap().is_none());
    }

    #[test]
    fn claim_skips_jobs_in_backoff() {
        let store = InMemoryJobStore::new();
        let tenant = TenantId::new();

        let mut j = job(tenant);
        j.mark_running();
        j.mark_failed("timeout".into());
        assert!(j.scheduled_at.is_some());
        store.enqueue(j).unwrap();

        assert!(store.claim_next(Some(tenant)).unwrap().is_none());
    }

    #[test]
    fn tenant_isolation_on_get_and_claim() {
        let store = InMemoryJobStore::new();
        let mine = TenantId::new();
        let theirs = TenantId::new();

        let id = store.enqueue(job(mine)).unwrap();

        assert!(matches!(
            store.get(theirs, id),
            Err(JobStoreError::TenantIsolation)
        ));
        assert!(store.claim_next(Some(theirs)).unwrap().is_none());
    }

    #[test]
    fn dead_letter_round_trip() {
        let store = InMemoryJobStore::new();
        let tenant = TenantId::new();

        let j = job(tenant);
        let id = j.id;
        store.enqueue(j).unwrap();

        let claimed = store.claim_next(Some(tenant)).unwrap().unwrap();
        store
            .dead_letter(claimed, "max retries exceeded".into())
            .unwrap();

        assert!(store.get(tenant, id).unwrap().is_none());
        let dls = store.list_dead_letters(tenant, 10).unwrap();
        assert_eq!(dls.len(), 1);
        assert_eq!(dls[0].job.id, id);

        let retried = store.retry_dead_letter(tenant, id).unwrap();
        assert_eq!(retried.status, JobStatus::Pending);
        assert_eq!(retried.attempt, 0);
        assert!(store.list_dead_letters(tenant, 10).unwrap().is_empty());
    }

    #[test]
    fn retry_dead_letter_is_tenant_scoped() {
        let store = InMemoryJobStore::new();
        let mine = TenantId::new();
        let theirs = TenantId::new();

        let j = job(mine);
        let id = j.id;
        store.enqueue(j).unwrap();
        let claimed = store.claim_next(Some(mine)).unwrap().unwrap();
        store.dead_letter(claimed, "oops".into()).unwrap();

        assert!(matches!(
            store.retry_dead_letter(theirs, id),
            Err(JobStoreError::TenantIsolation)
        ));
        // Still parked for its own tenant.
        assert_eq!(store.list_dead_letters(mine, 10).unwrap().len(), 1);
    }
}
