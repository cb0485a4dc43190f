//! Shutdown coordination.

use std::sync::atomic::Ordering;

use super::JobOrchestrator;

impl JobOrchestrator {
    /// Stop accepting jobs and wait for in-flight pipelines
    ///
    /// 1. New `create_job` calls fail with `ShuttingDown`
    /// 2. The task tracker is closed
    /// 3. Running pipelines get up to `shutdown_timeout` to finish
    ///
    /// Runs still going after the timeout are not cancelled; they end with the
    /// process and their jobs are lost with the in-memory registry.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_new.store(false, Ordering::SeqCst);
        tracing::info!("Stopped accepting new jobs");

        self.tasks.close();
        let in_flight = self.tasks.len();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for archive pipelines to finish");
        }

        let timeout = self.config.processing.shutdown_timeout;
        match tokio::time::timeout(timeout, self.tasks.wait()).await {
            Ok(()) => tracing::info!("All archive pipelines finished"),
            Err(_) => tracing::warn!(
                remaining = self.tasks.len(),
                timeout_secs = timeout.as_secs(),
                "Timeout waiting for archive pipelines, proceeding with shutdown"
            ),
        }

        let held = self.reservations.lock().await.len();
        if held > 0 {
            tracing::debug!(held, "Dropping reservations of jobs that never became ready");
        }

        tracing::info!("Graceful shutdown complete");
    }

    /// Whether new jobs are still accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }
}
