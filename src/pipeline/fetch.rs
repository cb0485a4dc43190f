//! Link probing and fetching
//!
//! Every link is probed with `HEAD` first. Only links whose declared media type
//! is allowed and whose declared size fits are fetched with `GET`, and the `GET`
//! response is checked again: the server may answer differently the second
//! time. The body is staged in memory and cut off as soon as it grows past the
//! size limit, so a link either yields a complete file or an error.

use crate::config::{FetchConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::{IsRetryable, with_retry};
use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};
use std::collections::HashSet;
use thiserror::Error;

/// Why a single link could not be archived
///
/// The `Display` text is what ends up in a job's `error_messages`.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The metadata probe could not be sent or timed out
    #[error("cannot check file type in {url}: {source}")]
    Probe {
        /// Link URL
        url: String,
        /// Transport error
        source: reqwest::Error,
    },

    /// The metadata probe returned a non-success status
    #[error("cannot check file type in {url}: HTTP {status}")]
    ProbeStatus {
        /// Link URL
        url: String,
        /// Response status
        status: StatusCode,
    },

    /// The declared media type is not in the allow-set
    #[error("forbidden file type '{content_type}' in {url}")]
    ForbiddenType {
        /// Link URL
        url: String,
        /// The rejected media type (empty when none was declared)
        content_type: String,
    },

    /// The declared or received size is above the limit
    #[error("more than max allowed file size ({limit_mb} MB) in {url}")]
    TooLarge {
        /// Link URL
        url: String,
        /// The limit in megabytes
        limit_mb: u64,
    },

    /// The download request could not be sent or timed out
    #[error("failed to download from {url}, error: {source}")]
    Download {
        /// Link URL
        url: String,
        /// Transport error
        source: reqwest::Error,
    },

    /// The download returned a non-success status
    #[error("failed to download from {url}: HTTP {status}")]
    DownloadStatus {
        /// Link URL
        url: String,
        /// Response status
        status: StatusCode,
    },

    /// The connection broke while the body was being received
    #[error("failed to read file from {url}: {source}")]
    Body {
        /// Link URL
        url: String,
        /// Transport error
        source: reqwest::Error,
    },
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Probe { source, .. } | FetchError::Download { source, .. } => {
                source.is_timeout() || source.is_connect()
            }
            FetchError::ProbeStatus { status, .. } | FetchError::DownloadStatus { status, .. } => {
                status.is_server_error()
            }
            FetchError::ForbiddenType { .. }
            | FetchError::TooLarge { .. }
            | FetchError::Body { .. } => false,
        }
    }
}

/// A fully received, validated file
#[derive(Debug, Clone)]
pub struct FetchedFile {
    /// Normalized media type (lowercase, no parameters)
    pub content_type: String,
    /// File contents
    pub body: Vec<u8>,
}

/// Result of the metadata probe
#[derive(Debug, Clone, PartialEq, Eq)]
struct ProbeInfo {
    content_type: String,
    content_length: Option<u64>,
}

/// HTTP client that validates links against the configured policy
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    allowed_types: HashSet<String>,
    max_bytes: u64,
    max_file_size_mb: u64,
    retry: RetryConfig,
}

impl HttpFetcher {
    /// Build a fetcher from configuration
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(Error::Network)?;

        Ok(Self {
            client,
            allowed_types: config
                .allowed_content_types
                .iter()
                .map(|t| media_type(t))
                .collect(),
            max_bytes: config.max_file_size_bytes(),
            max_file_size_mb: config.max_file_size_mb,
            retry: config.retry.clone(),
        })
    }

    /// Whether a raw `Content-Type` value is in the allow-set
    fn is_allowed(&self, content_type: &str) -> bool {
        self.allowed_types.contains(&media_type(content_type))
    }

    /// Probe, validate and download one link
    pub async fn fetch(&self, url: &str) -> std::result::Result<FetchedFile, FetchError> {
        let probe = self.probe(url).await?;
        self.check_type(url, &probe.content_type)?;
        if probe.content_length.is_some_and(|len| len > self.max_bytes) {
            return Err(self.too_large(url));
        }

        let client = &self.client;
        let mut response = with_retry(&self.retry, || async move {
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|source| FetchError::Download {
                    url: url.to_string(),
                    source,
                })?;
            if !response.status().is_success() {
                return Err(FetchError::DownloadStatus {
                    url: url.to_string(),
                    status: response.status(),
                });
            }
            Ok(response)
        })
        .await?;

        // Re-validate on the response actually being downloaded
        let content_type = header_content_type(response.headers())
            .map(|ct| media_type(&ct))
            .unwrap_or(probe.content_type);
        self.check_type(url, &content_type)?;
        if header_content_length(response.headers()).is_some_and(|len| len > self.max_bytes) {
            return Err(self.too_large(url));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| FetchError::Body {
                url: url.to_string(),
                source,
            })?
        {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }

        tracing::debug!(url, content_type = %content_type, bytes = body.len(), "Fetched link");
        Ok(FetchedFile { content_type, body })
    }

    async fn probe(&self, url: &str) -> std::result::Result<ProbeInfo, FetchError> {
        let client = &self.client;
        with_retry(&self.retry, || async move {
            let response = client
                .head(url)
                .send()
                .await
                .map_err(|source| FetchError::Probe {
                    url: url.to_string(),
                    source,
                })?;
            if !response.status().is_success() {
                return Err(FetchError::ProbeStatus {
                    url: url.to_string(),
                    status: response.status(),
                });
            }
            Ok(ProbeInfo {
                content_type: header_content_type(response.headers())
                    .map(|ct| media_type(&ct))
                    .unwrap_or_default(),
                content_length: header_content_length(response.headers()),
            })
        })
        .await
    }

    fn check_type(&self, url: &str, content_type: &str) -> std::result::Result<(), FetchError> {
        if self.is_allowed(content_type) {
            Ok(())
        } else {
            Err(FetchError::ForbiddenType {
                url: url.to_string(),
                content_type: content_type.to_string(),
            })
        }
    }

    fn too_large(&self, url: &str) -> FetchError {
        FetchError::TooLarge {
            url: url.to_string(),
            limit_mb: self.max_file_size_mb,
        }
    }
}

/// Strip parameters and normalize case: `Image/JPEG; q=1` becomes `image/jpeg`
pub fn media_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn header_content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

// Read the header itself: for HEAD responses the body length reported by the
// client is always zero.
fn header_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
