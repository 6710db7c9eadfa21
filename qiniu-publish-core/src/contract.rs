//! # contract: the seams between the pipeline and the outside world
//!
//! The pipeline talks to object storage, to the CDN and to whoever wants progress updates only
//! through the traits in this module. Real clients (see the `qiniu-publish` crate) and test
//! doubles implement them alike.
//!
//! ## Mocking & Testing
//! - [`StorageBackend`] and [`CdnBackend`] are annotated for `mockall`, so tests get
//!   `MockStorageBackend` / `MockCdnBackend` (exported under the `test-export-mocks` feature).
//! - [`Reporter`] is a plain observer; [`crate::report::NoopReporter`] ignores everything.
//!
//! ## Batch limits
//! - `stat_batch` receives at most [`crate::resolve::STAT_BATCH_SIZE`] keys.
//! - `refresh_urls` receives at most [`crate::invalidate::REFRESH_BATCH_SIZE`] URLs.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::report::PublishEvent;

/// Result of one `stat` lookup inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatOutcome {
    /// Per-item status code; 200 means the key exists.
    pub code: u16,
    /// Stored content hash, present when the key exists.
    pub hash: Option<String>,
}

impl StatOutcome {
    pub fn found(hash: impl Into<String>) -> Self {
        Self {
            code: 200,
            hash: Some(hash.into()),
        }
    }

    pub fn missing() -> Self {
        Self {
            code: 612,
            hash: None,
        }
    }
}

/// Where uploads for a bucket have to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadEndpoint {
    /// Base URL of the region's upload host, e.g. `https://upload-z2.qiniup.com`.
    pub url: String,
}

/// What an upload credential is allowed to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadScope {
    /// Any key in the bucket. Used for keys that do not exist yet.
    Bucket { bucket: String },
    /// Exactly one key, overwriting allowed. Used for keys being replaced.
    Key { bucket: String, key: String },
}

impl UploadScope {
    /// Vendor scope string: `bucket` or `bucket:key`.
    pub fn as_scope_string(&self) -> String {
        match self {
            UploadScope::Bucket { bucket } => bucket.clone(),
            UploadScope::Key { bucket, key } => format!("{bucket}:{key}"),
        }
    }
}

/// Opaque, time-limited token authorising one upload.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadCredential(pub String);

impl std::fmt::Debug for UploadCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UploadCredential(<redacted>)")
    }
}

/// Object storage operations needed by the pipeline.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Find the upload endpoint serving `bucket`.
    async fn locate_upload_endpoint(&self, bucket: &str) -> Result<UploadEndpoint, BackendError>;

    /// Stat every key in one request.
    ///
    /// The returned outcomes are positionally correlated with `keys`. A non-2xx batch-level
    /// status is reported as an error; per-item "not found" is not.
    async fn stat_batch(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<Vec<StatOutcome>, BackendError>;

    /// Mint a fresh credential restricted to `scope`.
    fn mint_upload_credential(&self, scope: &UploadScope) -> UploadCredential;

    /// Store `body` under `key`.
    async fn put_object(
        &self,
        endpoint: &UploadEndpoint,
        credential: &UploadCredential,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), BackendError>;
}

/// CDN cache operations needed by the pipeline.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CdnBackend: Send + Sync {
    /// Purge cached copies of every URL in one request.
    async fn refresh_urls(&self, urls: &[String]) -> Result<(), BackendError>;
}

/// Receives pipeline lifecycle events. Purely observational.
pub trait Reporter: Send + Sync {
    fn on_event(&self, event: &PublishEvent);
}
