//! OpenAPI documentation and schema generation
//!
//! The document is generated at compile time by utoipa and served at
//! `/openapi.json` (and through `/swagger-ui` when enabled).

use utoipa::OpenApi;

/// OpenAPI documentation for the bundle-dl REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "bundle-dl REST API",
        version = "0.1.0",
        description = "Collects up to three remote file links per job, downloads them and bundles them into a single ZIP archive",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::create_job,
        crate::api::routes::list_jobs,
        crate::api::routes::get_job,
        crate::api::routes::add_link,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::JobId,
        crate::types::JobStatus,
        crate::types::JobSummary,
        crate::types::JobDetail,
        crate::api::routes::AddLinkRequest,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Jobs - Create jobs, attach links, and fetch archive results"),
        (name = "system", description = "System endpoints - Health checks and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
