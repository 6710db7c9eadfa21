use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// One bucket to publish into, with the folders that feed it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketTask {
    pub bucket: String,
    pub credentials: Credentials,
    /// CDN-facing base URLs, e.g. `https://static.example.com`.
    pub hosts: Vec<String>,
    pub mappings: Vec<FolderMapping>,
}

impl BucketTask {
    pub fn trace_loaded(&self) {
        info!(
            bucket = %self.bucket,
            hosts_count = self.hosts.len(),
            mappings_count = self.mappings.len(),
            "Loaded BucketTask"
        );
        for mapping in &self.mappings {
            mapping.trace_loaded();
        }
        debug!(?self, "BucketTask loaded (full debug)");
    }
}

/// A local folder and the key prefix its files are published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMapping {
    pub from: PathBuf,
    pub to: String,
}

impl FolderMapping {
    pub fn trace_loaded(&self) {
        info!(
            from = %self.from.display(),
            to = %self.to,
            "Loaded folder mapping"
        );
    }
}

/// Access/secret key pair. The secret never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Run-wide switches supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    /// Refresh CDN caches for overridden files.
    pub refresh: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self { refresh: true }
    }
}
