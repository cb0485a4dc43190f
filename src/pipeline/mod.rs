//! Archive pipeline: downloads a ready job's links into one ZIP archive.
//!
//! - [`fetch`] - Link probing, validation, and download
//! - [`archive`] - ZIP output and entry naming
//!
//! A run holds one admission slot for its whole duration. Links are handled
//! one after another in insertion order; a failing link is recorded on the job
//! and never stops the run. If every link fails the archive is deleted and the
//! job ends `Failed`.

pub mod archive;
pub mod fetch;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::gate::{AdmissionGate, AdmissionPermit};
use crate::store::JobStore;
use crate::types::{Job, JobId, JobStatus};
use archive::ArchiveWriter;
use fetch::HttpFetcher;
use std::path::PathBuf;
use std::sync::Arc;

/// Per-job archiving worker
pub struct ArchivePipeline {
    store: Arc<dyn JobStore>,
    gate: AdmissionGate,
    fetcher: HttpFetcher,
    storage_dir: PathBuf,
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunOutcome {
    archive_path: Option<String>,
    error_messages: Vec<String>,
}

impl ArchivePipeline {
    /// Create a pipeline writing into `config.storage.storage_dir`
    pub fn new(store: Arc<dyn JobStore>, gate: AdmissionGate, config: &Config) -> Result<Self> {
        Ok(Self {
            store,
            gate,
            fetcher: HttpFetcher::new(&config.fetch)?,
            storage_dir: config.storage.storage_dir.clone(),
        })
    }

    /// Archive a `Ready` job and record its terminal state
    ///
    /// `reserved` is the slot taken when the job was created; without one the
    /// run waits for a free slot first. The slot is released when this returns,
    /// whatever the outcome.
    pub async fn run(&self, id: JobId, reserved: Option<AdmissionPermit>) {
        let _permit = match reserved {
            Some(permit) => permit,
            None => match self.gate.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!(job_id = %id, error = %e, "Could not obtain a processing slot");
                    return;
                }
            },
        };

        if let Err(e) = self.store.set_status(id, JobStatus::Processing).await {
            tracing::warn!(job_id = %id, error = %e, "Job cannot be processed, abandoning run");
            return;
        }

        let job = match self.store.get(id).await {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(job_id = %id, error = %e, "Job vanished before processing");
                return;
            }
        };

        tracing::info!(job_id = %id, links = job.links.len(), "Archiving job");
        let outcome = self.archive_links(&job).await;

        match self
            .store
            .set_result(id, outcome.archive_path, outcome.error_messages)
            .await
        {
            Ok(job) => match job.status {
                JobStatus::Failed => tracing::error!(
                    job_id = %id,
                    errors = job.error_messages.len(),
                    "Job failed"
                ),
                status => tracing::info!(
                    job_id = %id,
                    status = %status,
                    errors = job.error_messages.len(),
                    archive = job.archive_path.as_deref().unwrap_or_default(),
                    "Job finished"
                ),
            },
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Failed to record job result");
            }
        }
    }

    async fn archive_links(&self, job: &Job) -> RunOutcome {
        let mut archive = match ArchiveWriter::create(&self.storage_dir, job.id).await {
            Ok(archive) => archive,
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Could not create archive");
                return RunOutcome {
                    archive_path: None,
                    error_messages: vec![e.to_string()],
                };
            }
        };

        let mut error_messages = Vec::new();
        for url in &job.links {
            let file = match self.fetcher.fetch(url).await {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(job_id = %job.id, url = %url, error = %e, "Link rejected");
                    error_messages.push(e.to_string());
                    continue;
                }
            };

            let name = archive.next_entry_name(&file.content_type, url);
            let size = file.body.len();
            match archive.add_entry(name.clone(), file.body).await {
                Ok(()) => {
                    tracing::debug!(job_id = %job.id, url = %url, entry = %name, bytes = size, "Link archived");
                }
                Err(e) => {
                    tracing::warn!(job_id = %job.id, url = %url, error = %e, "Could not write link into archive");
                    error_messages.push(format!("failed to save file from {} in archive: {}", url, e));
                }
            }
        }

        if archive.entries() == 0 {
            let err = Error::AllDownloadsFailed {
                id: job.id,
                failed: error_messages.len(),
            };
            tracing::warn!(job_id = %job.id, error = %err, "Removing empty archive");
            if let Err(e) = archive.discard().await {
                tracing::warn!(job_id = %job.id, error = %e, "Failed to remove empty archive");
            }
            return RunOutcome {
                archive_path: None,
                error_messages,
            };
        }

        match archive.finish().await {
            Ok(path) => RunOutcome {
                archive_path: Some(path.display().to_string()),
                error_messages,
            },
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Could not finalize archive");
                error_messages.push(format!("failed to finalize archive: {}", e));
                RunOutcome {
                    archive_path: None,
                    error_messages,
                }
            }
        }
    }
}
