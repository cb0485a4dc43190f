//! Job registry
//!
//! [`JobStore`] owns every mutation of job state. Callers always receive
//! copies, so nothing outside the store can change a job behind its back.
//! The orchestrator holds the store as `Arc<dyn JobStore>`, which keeps the
//! registry injectable and out of global state.

use crate::error::{Error, Result};
use crate::types::{Job, JobId, JobStatus, LINK_CAP};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Concurrency-safe registry of jobs
///
/// Every operation is atomic with respect to the others.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Register a new pending job
    async fn create(&self, id: JobId) -> Result<Job>;

    /// Snapshot of a job
    async fn get(&self, id: JobId) -> Result<Job>;

    /// Snapshot of every job, oldest first
    async fn list(&self) -> Result<Vec<Job>>;

    /// Append a link, moving the job to `Ready` when it reaches [`LINK_CAP`]
    ///
    /// Fails with [`Error::Overload`] when the job is already full; the stored
    /// links are left untouched in that case.
    async fn add_link(&self, id: JobId, url: &str) -> Result<Job>;

    /// Move a job forward to `status`
    async fn set_status(&self, id: JobId, status: JobStatus) -> Result<()>;

    /// Record the pipeline outcome and the resulting terminal status
    ///
    /// No archive path means every link failed (`Failed`). Otherwise the job is
    /// `Completed` when `error_messages` is empty, `CompletedWithErrors` if not.
    async fn set_result(
        &self,
        id: JobId,
        archive_path: Option<String>,
        error_messages: Vec<String>,
    ) -> Result<Job>;
}

/// In-memory [`JobStore`]; contents are lost when the process exits
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn advance(job: &mut Job, status: JobStatus) -> Result<()> {
    if !job.status.can_advance_to(status) {
        return Err(Error::InvalidTransition {
            id: job.id,
            from: job.status,
            to: status,
        });
    }
    job.status = status;
    Ok(())
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create(&self, id: JobId) -> Result<Job> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            return Err(Error::Conflict(id));
        }
        let job = Job::new(id);
        jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: JobId) -> Result<Job> {
        let jobs = self.jobs.read().await;
        jobs.get(&id).cloned().ok_or(Error::NotFound { id })
    }

    async fn list(&self) -> Result<Vec<Job>> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by_key(|job| job.created_at);
        Ok(all)
    }

    async fn add_link(&self, id: JobId, url: &str) -> Result<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(Error::NotFound { id })?;

        if job.links.len() >= LINK_CAP {
            return Err(Error::Overload { id, cap: LINK_CAP });
        }

        job.links.push(url.to_string());
        if job.links.len() == LINK_CAP {
            advance(job, JobStatus::Ready)?;
        }
        Ok(job.clone())
    }

    async fn set_status(&self, id: JobId, status: JobStatus) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(Error::NotFound { id })?;
        advance(job, status)
    }

    async fn set_result(
        &self,
        id: JobId,
        archive_path: Option<String>,
        error_messages: Vec<String>,
    ) -> Result<Job> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(Error::NotFound { id })?;

        let status = match (&archive_path, error_messages.is_empty()) {
            (None, _) => JobStatus::Failed,
            (Some(_), true) => JobStatus::Completed,
            (Some(_), false) => JobStatus::CompletedWithErrors,
        };
        advance(job, status)?;

        job.archive_path = archive_path;
        job.error_messages = error_messages;
        job.finished_at = Some(Utc::now());
        Ok(job.clone())
    }
}
