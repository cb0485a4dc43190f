//! Job creation, link attachment, and inspection.

use crate::config::AdmissionMode;
use crate::error::{Error, Result};
use crate::types::{JobDetail, JobId, JobStatus, JobSummary};
use std::sync::atomic::Ordering;

use super::JobOrchestrator;

impl JobOrchestrator {
    /// Create a new pending job
    ///
    /// Fails with [`Error::Busy`] when no processing slot is free. In
    /// [`AdmissionMode::Reserve`] the slot is taken now and held by the job
    /// until its pipeline run ends; in [`AdmissionMode::Advisory`] this is only
    /// a check and the pipeline takes a slot when it starts.
    pub async fn create_job(&self) -> Result<JobSummary> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let reservation = match self.config.processing.admission {
            AdmissionMode::Reserve => Some(self.gate.try_acquire().inspect_err(|e| {
                tracing::warn!(error = %e, "Rejected job creation");
            })?),
            AdmissionMode::Advisory => {
                if self.gate.available() == 0 {
                    tracing::warn!("Rejected job creation: no free processing slot");
                    return Err(Error::Busy);
                }
                None
            }
        };

        let id = JobId::new();
        let job = self.store.create(id).await.inspect_err(|e| {
            tracing::error!(job_id = %id, error = %e, "Failed to create job");
        })?;

        if let Some(permit) = reservation {
            let mut reservations = self.reservations.lock().await;
            reservations.insert(id, permit);
            if reservations.len() == self.gate.capacity() {
                tracing::warn!(
                    reserved = reservations.len(),
                    "Every processing slot is held by a job still waiting for links"
                );
            }
        }

        tracing::info!(job_id = %id, "Job created");
        Ok(JobSummary::from(&job))
    }

    /// Attach a link to a job
    ///
    /// When this link fills the job, its archive pipeline is started in the
    /// background and the `Ready` summary is returned without waiting for it.
    pub async fn add_link(&self, id: JobId, url: &str) -> Result<JobSummary> {
        validate_link(url).inspect_err(|e| {
            tracing::warn!(job_id = %id, url, error = %e, "Rejected link");
        })?;

        let job = self.store.add_link(id, url).await.inspect_err(|e| {
            tracing::warn!(job_id = %id, url, error = %e, "Failed to add link to job");
        })?;

        tracing::info!(job_id = %id, url, links = job.links.len(), status = %job.status, "Link added");

        if job.status == JobStatus::Ready {
            self.launch_pipeline(id).await;
        }
        Ok(JobSummary::from(&job))
    }

    /// Current state of a job, including its result once finished
    pub async fn get_job(&self, id: JobId) -> Result<JobDetail> {
        let job = self.store.get(id).await.inspect_err(|e| {
            tracing::debug!(job_id = %id, error = %e, "Job lookup failed");
        })?;
        Ok(JobDetail::from(job))
    }

    /// Every job, oldest first
    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let jobs = self.store.list().await?;
        Ok(jobs.iter().map(JobSummary::from).collect())
    }

    async fn launch_pipeline(&self, id: JobId) {
        let reserved = self.reservations.lock().await.remove(&id);
        let pipeline = self.pipeline.clone();

        tracing::debug!(job_id = %id, reserved = reserved.is_some(), "Starting archive pipeline");
        self.tasks.spawn(async move {
            pipeline.run(id, reserved).await;
        });
    }
}

/// Links must be absolute http(s) URLs with a host
fn validate_link(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url).map_err(|e| Error::InvalidLink(format!("{url}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host_str().is_some() => Ok(()),
        scheme => Err(Error::InvalidLink(format!(
            "{url}: unsupported scheme '{scheme}'"
        ))),
    }
}
