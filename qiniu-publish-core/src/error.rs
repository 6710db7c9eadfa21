//! Error taxonomy for the publish pipeline.
//!
//! Every variant of [`PublishError`] is fatal for the bucket task it occurred in. The pipeline
//! never retries and never continues past one; recovery is left to whoever runs the tool.

use std::path::PathBuf;

use thiserror::Error;

/// Failure reported by a storage or CDN backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("transport error: {0}")]
    Transport(String),
    /// The remote answered with a status outside the accepted range.
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// The remote answered, but not in the shape the contract promises.
    #[error("unexpected response: {0}")]
    Protocol(String),
}

impl BackendError {
    /// HTTP status carried by the error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Pipeline stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Zone,
    Enumeration,
    Hashing,
    Resolution,
    Upload,
    Invalidation,
}

impl Stage {
    /// Short human-readable name, used as the failure indicator.
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Zone => "Determine zone",
            Stage::Enumeration => "Load files",
            Stage::Hashing => "Hash files",
            Stage::Resolution => "Check files status",
            Stage::Upload => "Upload files",
            Stage::Invalidation => "Refresh urls",
        }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to determine upload zone for bucket {bucket}: {source}")]
    Zone {
        bucket: String,
        #[source]
        source: BackendError,
    },

    #[error("failed to list files under {}: {source}", .folder.display())]
    Enumeration {
        folder: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {} while {}: {source}", .path.display(), .stage.label())]
    ReadFile {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("stat batch {batch} failed: {source}")]
    Resolution {
        batch: usize,
        #[source]
        source: BackendError,
    },

    #[error("failed to upload {} to {remote_path}: {source}", .path.display())]
    Upload {
        path: PathBuf,
        remote_path: String,
        #[source]
        source: BackendError,
    },

    #[error("refresh batch {batch} failed: {source}")]
    Invalidation {
        batch: usize,
        #[source]
        source: BackendError,
    },
}

impl PublishError {
    pub fn stage(&self) -> Stage {
        match self {
            PublishError::Zone { .. } => Stage::Zone,
            PublishError::Enumeration { .. } => Stage::Enumeration,
            PublishError::ReadFile { stage, .. } => *stage,
            PublishError::Resolution { .. } => Stage::Resolution,
            PublishError::Upload { .. } => Stage::Upload,
            PublishError::Invalidation { .. } => Stage::Invalidation,
        }
    }

    /// The failure indicator shown to the operator, e.g. `Check files status failed, code 500`.
    pub fn label(&self) -> String {
        let status = match self {
            PublishError::Zone { source, .. }
            | PublishError::Resolution { source, .. }
            | PublishError::Upload { source, .. }
            | PublishError::Invalidation { source, .. } => source.status(),
            PublishError::Enumeration { .. } | PublishError::ReadFile { .. } => None,
        };
        match status {
            Some(code) => format!("{} failed, code {}", self.stage().label(), code),
            None => format!("{} failed", self.stage().label()),
        }
    }

    /// Backend detail behind the failure, if the failure came from a remote call.
    pub fn backend_error(&self) -> Option<&BackendError> {
        match self {
            PublishError::Zone { source, .. }
            | PublishError::Resolution { source, .. }
            | PublishError::Upload { source, .. }
            | PublishError::Invalidation { source, .. } => Some(source),
            PublishError::Enumeration { .. } | PublishError::ReadFile { .. } => None,
        }
    }
}

/// A multi-bucket run stopped at `bucket`.
#[derive(Debug, Error)]
#[error("bucket task [{bucket}] failed: {source}")]
pub struct TaskError {
    pub bucket: String,
    #[source]
    pub source: PublishError,
}
