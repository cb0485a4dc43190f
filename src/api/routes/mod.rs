//! Route handlers for the REST API
//!
//! - [`jobs`] - Job creation, link attachment, and status
//! - [`system`] - Health and OpenAPI

use crate::error::Error;
use crate::types::JobId;
use serde::{Deserialize, Serialize};

mod jobs;
mod system;

pub use jobs::*;
pub use system::*;

/// Request body for POST /jobs/:id
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AddLinkRequest {
    /// Absolute http(s) URL of the file to archive
    pub href: String,
}

/// Parse a job id from a path segment
pub(crate) fn parse_job_id(raw: &str) -> Result<JobId, Error> {
    raw.parse()
        .map_err(|e| Error::InvalidJobId(format!("'{}': {}", raw, e)))
}
