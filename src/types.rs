//! Core types for bundle-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Maximum number of links a single job can hold
///
/// A job becomes [`JobStatus::Ready`] exactly when it reaches this many links.
pub const LINK_CAP: usize = 3;

/// Unique identifier for a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh random JobId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Job status
///
/// Statuses only move forward:
/// `Pending → Ready → Processing → {Completed | CompletedWithErrors | Failed}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, still collecting links
    Pending,
    /// Link cap reached, waiting for the archiving pipeline
    Ready,
    /// Links are being downloaded into the archive
    Processing,
    /// Every link was archived
    Completed,
    /// Some links were archived, some failed
    CompletedWithErrors,
    /// No link could be archived
    Failed,
}

impl JobStatus {
    /// Whether this status is final
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::CompletedWithErrors | JobStatus::Failed
        )
    }

    /// Whether a job in this status may move to `next`
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (JobStatus::Pending, JobStatus::Ready) => true,
            (JobStatus::Ready, JobStatus::Processing) => true,
            (JobStatus::Processing, next) => next.is_terminal(),
            _ => false,
        }
    }

    /// Stable lowercase name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Ready => "ready",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::CompletedWithErrors => "completed_with_errors",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work: up to [`LINK_CAP`] links bundled into one archive
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Links in insertion order
    pub links: Vec<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,
    /// Path of the produced archive (set only when at least one link succeeded)
    pub archive_path: Option<String>,
    /// One message per failed link
    pub error_messages: Vec<String>,
}

impl Job {
    /// Create a new pending job with no links
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            links: Vec::with_capacity(LINK_CAP),
            created_at: Utc::now(),
            finished_at: None,
            archive_path: None,
            error_messages: Vec::new(),
        }
    }
}

/// Short job view returned by create/add-link operations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobSummary {
    /// Job identifier
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            status: job.status,
        }
    }
}

/// Full job view returned by `GET /jobs/{id}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobDetail {
    /// Job identifier
    pub id: JobId,
    /// Current status
    pub status: JobStatus,
    /// Links attached so far
    pub links: Vec<String>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the job reached a terminal status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Path of the produced archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<String>,
    /// Failure descriptions, one per failed link
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_messages: Vec<String>,
}

impl From<Job> for JobDetail {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            status: job.status,
            links: job.links,
            created_at: job.created_at,
            finished_at: job.finished_at,
            archive_path: job.archive_path,
            error_messages: job.error_messages,
        }
    }
}
