//! Sequential upload of new and changed files.

use std::collections::VecDeque;
use tracing::{debug, error, info};

use crate::contract::{StorageBackend, UploadEndpoint, UploadScope};
use crate::error::{PublishError, Stage};
use crate::run::{FileRecord, FileStatus, PublishRun};

/// Files pushed by [`upload_files`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Remote paths of every uploaded file.
    pub uploaded: Vec<String>,
    /// Remote paths of uploaded files that replaced existing content and need a CDN refresh.
    pub overridden: Vec<String>,
}

/// Scope for a file's upload credential.
///
/// Replacing an existing key is limited to that key; a first-time key gets the bucket scope.
pub fn upload_scope(bucket: &str, record: &FileRecord) -> UploadScope {
    match record.status {
        FileStatus::Overridden => UploadScope::Key {
            bucket: bucket.to_string(),
            key: record.remote_path.clone(),
        },
        _ => UploadScope::Bucket {
            bucket: bucket.to_string(),
        },
    }
}

/// Upload every file in `pending`, one at a time, stopping at the first failure.
///
/// Files already uploaded when a failure occurs stay uploaded.
pub async fn upload_files<S>(
    storage: &S,
    endpoint: &UploadEndpoint,
    bucket: &str,
    run: &PublishRun,
    pending: &[String],
) -> Result<UploadOutcome, PublishError>
where
    S: StorageBackend + ?Sized,
{
    let mut queue: VecDeque<&FileRecord> = pending
        .iter()
        .filter_map(|relative_path| run.get(relative_path))
        .collect();
    let mut outcome = UploadOutcome::default();

    while let Some(record) = queue.pop_front() {
        let scope = upload_scope(bucket, record);
        let credential = storage.mint_upload_credential(&scope);

        let body = tokio::fs::read(&record.local_path).await.map_err(|source| {
            error!(error = %source, path = %record.local_path.display(), "Failed to read file for upload");
            PublishError::ReadFile {
                stage: Stage::Upload,
                path: record.local_path.clone(),
                source,
            }
        })?;

        debug!(
            file = %record.relative_path,
            key = %record.remote_path,
            scope = %scope.as_scope_string(),
            size = body.len(),
            "Uploading file"
        );
        storage
            .put_object(endpoint, &credential, &record.remote_path, body)
            .await
            .map_err(|source| {
                error!(
                    file = %record.relative_path,
                    key = %record.remote_path,
                    error = %source,
                    remaining = queue.len(),
                    "Upload failed, aborting remaining uploads"
                );
                PublishError::Upload {
                    path: record.local_path.clone(),
                    remote_path: record.remote_path.clone(),
                    source,
                }
            })?;

        outcome.uploaded.push(record.remote_path.clone());
        if record.status == FileStatus::Overridden {
            outcome.overridden.push(record.remote_path.clone());
        }
    }

    info!(
        uploaded = outcome.uploaded.len(),
        overridden = outcome.overridden.len(),
        "Uploaded files"
    );
    Ok(outcome)
}
