//! Job orchestration: the one entry point the transport layer talks to.
//!
//! `JobOrchestrator` combines the job store, the admission gate and the archive
//! pipeline. Its methods are organized by concern:
//! - [`jobs`] - Create, extend and inspect jobs
//! - [`lifecycle`] - Shutdown and drain

mod jobs;
mod lifecycle;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::error::Result;
use crate::gate::{AdmissionGate, AdmissionPermit};
use crate::pipeline::ArchivePipeline;
use crate::store::{InMemoryJobStore, JobStore};
use crate::types::JobId;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::task::TaskTracker;

/// Main service instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct JobOrchestrator {
    /// Job registry
    pub(crate) store: Arc<dyn JobStore>,
    /// Bounds concurrent archive pipelines
    pub(crate) gate: AdmissionGate,
    /// Archive worker shared by all pipeline runs
    pub(crate) pipeline: Arc<ArchivePipeline>,
    /// Slots reserved at creation, held until the job's pipeline run ends
    pub(crate) reservations: Arc<tokio::sync::Mutex<HashMap<JobId, AdmissionPermit>>>,
    /// In-flight pipeline runs
    pub(crate) tasks: TaskTracker,
    /// Cleared when shutdown starts
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Configuration
    pub(crate) config: Arc<Config>,
}

impl JobOrchestrator {
    /// Create an orchestrator backed by a fresh in-memory store
    pub fn new(config: Config) -> Result<Self> {
        Self::with_store(config, Arc::new(InMemoryJobStore::new()))
    }

    /// Create an orchestrator over an existing store
    pub fn with_store(config: Config, store: Arc<dyn JobStore>) -> Result<Self> {
        config.validate()?;

        let gate = AdmissionGate::new(config.processing.max_processing_tasks);
        let pipeline = Arc::new(ArchivePipeline::new(store.clone(), gate.clone(), &config)?);

        tracing::info!(
            max_processing_tasks = config.processing.max_processing_tasks,
            admission = ?config.processing.admission,
            storage_dir = %config.storage.storage_dir.display(),
            "Job orchestrator ready"
        );

        Ok(Self {
            store,
            gate,
            pipeline,
            reservations: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            tasks: TaskTracker::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
            config: Arc::new(config),
        })
    }

    /// Configuration this orchestrator was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Free admission slots right now
    pub fn available_slots(&self) -> usize {
        self.gate.available()
    }

    /// Slots held by jobs that have not reached `Ready` yet
    pub async fn reserved_slots(&self) -> usize {
        self.reservations.lock().await.len()
    }

    /// Number of pipeline runs still in flight
    pub fn active_pipelines(&self) -> usize {
        self.tasks.len()
    }
}
