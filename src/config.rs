//! Configuration types for bundle-dl
//!
//! Every key is optional; an empty file yields [`Config::default`].
//!
//! ```toml
//! storage_dir = "./archives"
//! allowed_content_types = ["image/jpeg", "application/pdf"]
//! request_timeout = 30
//! max_file_size_mb = 10
//! max_processing_tasks = 3
//! admission = "reserve"
//!
//! [retry]
//! max_attempts = 0
//!
//! [api]
//! bind_address = "127.0.0.1:8080"
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};

/// Archive storage settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory archives are written to (default: "./archives")
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
        }
    }
}

/// Link validation and HTTP client settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Media types a link may declare (default: image/jpeg, application/pdf)
    ///
    /// Matching ignores parameters such as `; charset=...` and letter case.
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,

    /// Timeout for each HTTP call in seconds (default: 30)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Largest accepted file in megabytes (default: 10)
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,

    /// Retry policy for probe and fetch requests (default: no retries)
    #[serde(default)]
    pub retry: RetryConfig,
}

impl FetchConfig {
    /// Largest accepted file in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            allowed_content_types: default_allowed_content_types(),
            request_timeout: default_request_timeout(),
            max_file_size_mb: default_max_file_size_mb(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry behavior for link HTTP requests
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try (default: 0)
    #[serde(default)]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// When the admission gate reserves a processing slot for a job
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionMode {
    /// `create_job` takes the slot and the job keeps it until its pipeline ends
    #[default]
    Reserve,
    /// `create_job` only checks for a free slot; the pipeline waits for one when it starts
    Advisory,
}

/// Pipeline concurrency and lifecycle settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Maximum number of jobs archived at the same time (default: 3)
    #[serde(default = "default_max_processing_tasks")]
    pub max_processing_tasks: usize,

    /// Admission strategy (default: reserve)
    #[serde(default)]
    pub admission: AdmissionMode,

    /// How long shutdown waits for in-flight pipelines, in seconds (default: 30)
    #[serde(default = "default_shutdown_timeout", with = "duration_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processing_tasks: default_max_processing_tasks(),
            admission: AdmissionMode::default(),
            shutdown_timeout: default_shutdown_timeout(),
        }
    }
}

/// REST API server settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8080)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Serve Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for bundle-dl
///
/// Sub-configs are flattened, so the file format stays flat except for the
/// `[retry]` and `[api]` tables.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Archive storage
    #[serde(flatten)]
    pub storage: StorageConfig,

    /// Link validation and HTTP client
    #[serde(flatten)]
    pub fetch: FetchConfig,

    /// Pipeline concurrency and lifecycle
    #[serde(flatten)]
    pub processing: ProcessingConfig,

    /// REST API server
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).map_err(|e| Error::Config {
            message: e.to_string(),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read config file '{}': {}", path.display(), e),
            key: None,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject values the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.processing.max_processing_tasks == 0 {
            return Err(invalid("max_processing_tasks", "must be at least 1"));
        }
        if self.fetch.max_file_size_mb == 0 {
            return Err(invalid("max_file_size_mb", "must be at least 1"));
        }
        if self.fetch.request_timeout.is_zero() {
            return Err(invalid("request_timeout", "must be at least 1 second"));
        }
        if self.fetch.allowed_content_types.is_empty() {
            return Err(invalid(
                "allowed_content_types",
                "at least one content type is required",
            ));
        }
        if self.fetch.retry.backoff_multiplier < 1.0 {
            return Err(invalid("retry.backoff_multiplier", "must be at least 1.0"));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> Error {
    Error::Config {
        message: format!("{key} {message}"),
        key: Some(key.to_string()),
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("./archives")
}

fn default_allowed_content_types() -> Vec<String> {
    vec!["image/jpeg".to_string(), "application/pdf".to_string()]
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_file_size_mb() -> u64 {
    10
}

fn default_max_processing_tasks() -> usize {
    3
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();

        assert_eq!(config.storage.storage_dir, PathBuf::from("./archives"));
        assert_eq!(
            config.fetch.allowed_content_types,
            vec!["image/jpeg", "application/pdf"]
        );
        assert_eq!(config.fetch.request_timeout, Duration::from_secs(30));
        assert_eq!(config.fetch.max_file_size_mb, 10);
        assert_eq!(config.fetch.retry.max_attempts, 0);
        assert_eq!(config.processing.max_processing_tasks, 3);
        assert_eq!(config.processing.admission, AdmissionMode::Reserve);
        assert_eq!(config.api.bind_address.port(), 8080);
    }

    #[test]
    fn flat_keys_and_tables_are_read() {
        let config = Config::from_toml_str(
            r#"
            storage_dir = "/var/lib/bundle-dl"
            allowed_content_types = ["image/png"]
            request_timeout = 5
            max_file_size_mb = 2
            max_processing_tasks = 8
            admission = "advisory"
            shutdown_timeout = 3

            [retry]
            max_attempts = 2
            initial_delay = 0
            jitter = false

            [api]
            bind_address = "0.0.0.0:9000"
            swagger_ui = false
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.storage_dir, PathBuf::from("/var/lib/bundle-dl"));
        assert_eq!(config.fetch.allowed_content_types, vec!["image/png"]);
        assert_eq!(config.fetch.request_timeout, Duration::from_secs(5));
        assert_eq!(config.fetch.max_file_size_bytes(), 2 * 1024 * 1024);
        assert_eq!(config.processing.max_processing_tasks, 8);
        assert_eq!(config.processing.admission, AdmissionMode::Advisory);
        assert_eq!(config.processing.shutdown_timeout, Duration::from_secs(3));
        assert_eq!(config.fetch.retry.max_attempts, 2);
        assert_eq!(config.fetch.retry.initial_delay, Duration::ZERO);
        assert!(!config.fetch.retry.jitter);
        assert_eq!(config.api.bind_address.port(), 9000);
        assert!(!config.api.swagger_ui);
        assert!(config.api.cors_enabled);
    }

    #[test]
    fn zero_processing_tasks_is_rejected() {
        let err = Config::from_toml_str("max_processing_tasks = 0").unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("max_processing_tasks")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn empty_allow_set_is_rejected() {
        let err = Config::from_toml_str("allowed_content_types = []").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = Config::from_toml_str("max_processing_tasks = \"three\"").unwrap_err();
        assert!(matches!(err, Error::Config { key: None, .. }));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle-dl.toml");
        std::fs::write(&path, "max_file_size_mb = 1\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.fetch.max_file_size_bytes(), 1024 * 1024);
    }
}
