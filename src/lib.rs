//! # bundle-dl
//!
//! Link-bundling archive service: clients open a job, attach up to
//! [`LINK_CAP`] remote file links, and the service downloads them into a
//! single ZIP archive in the background.
//!
//! ## Overview
//!
//! - Every link is probed (HTTP HEAD) before it is fetched; disallowed media
//!   types and oversized files are skipped and reported on the job
//! - A job that gets at least one file ends `completed` or
//!   `completed_with_errors`; one whose links all fail ends `failed` and leaves
//!   no archive behind
//! - A fixed number of processing slots bounds how many jobs archive at once;
//!   when they are all taken, new jobs are refused with `Busy`
//!
//! ## Quick Start
//!
//! ```no_run
//! use bundle_dl::{Config, JobOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = JobOrchestrator::new(Config::default())?;
//!
//!     let job = orchestrator.create_job().await?;
//!     orchestrator.add_link(job.id, "https://example.com/a.pdf").await?;
//!     orchestrator.add_link(job.id, "https://example.com/b.jpg").await?;
//!     orchestrator.add_link(job.id, "https://example.com/c.pdf").await?;
//!
//!     // Archiving runs in the background; poll for the result
//!     let detail = orchestrator.get_job(job.id).await?;
//!     println!("{}: {}", detail.id, detail.status);
//!
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Admission gate bounding concurrent archive runs
pub mod gate;
/// Log subscriber setup
pub mod logging;
/// Job orchestration (decomposed into focused submodules)
pub mod orchestrator;
/// Download and archive pipeline
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// Job registry
pub mod store;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::{AdmissionMode, Config};
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use gate::{AdmissionGate, AdmissionPermit};
pub use orchestrator::JobOrchestrator;
pub use store::{InMemoryJobStore, JobStore};
pub use types::{Job, JobDetail, JobId, JobStatus, JobSummary, LINK_CAP};

use std::sync::Arc;

/// Run the service until a termination signal arrives.
///
/// Serves the API, stops accepting connections on SIGTERM/SIGINT (Ctrl+C
/// elsewhere), then waits for in-flight archive runs up to
/// `shutdown_timeout`.
///
/// # Example
///
/// ```no_run
/// use bundle_dl::{Config, run};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     run(Config::default()).await?;
///     Ok(())
/// }
/// ```
pub async fn run(config: Config) -> Result<()> {
    let orchestrator = Arc::new(JobOrchestrator::new(config.clone())?);
    let config = Arc::new(config);

    let served = api::start_api_server(orchestrator.clone(), config, shutdown_signal()).await;
    orchestrator.shutdown().await;
    served
}

/// Resolves when the process receives a termination signal.
///
/// - **Unix:** SIGTERM or SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn shutdown_signal() {
    wait_for_signal().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C signal"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C signal"),
    }
}
