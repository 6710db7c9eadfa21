//! Remote-state reconciliation: decides which files are new, changed or untouched.

use tracing::{debug, error, info};

use crate::contract::{StatOutcome, StorageBackend};
use crate::error::{BackendError, PublishError};
use crate::run::{FileStatus, PublishRun};

/// Upper bound on stat operations combined into one request.
pub const STAT_BATCH_SIZE: usize = 1000;

/// Classify one file against its stat outcome.
pub fn classify(local_hash: Option<&str>, outcome: &StatOutcome) -> FileStatus {
    if outcome.code != 200 {
        return FileStatus::New;
    }
    match (local_hash, outcome.hash.as_deref()) {
        (Some(local), Some(remote)) if local == remote => FileStatus::Unmodified,
        _ => FileStatus::Overridden,
    }
}

/// Stat every file of the run in batches and record its status.
///
/// Batches are sent one after another; the first failing batch aborts resolution. Returns the
/// relative paths that need uploading (new and overridden files).
pub async fn resolve_remote_state<S>(
    storage: &S,
    bucket: &str,
    run: &mut PublishRun,
) -> Result<Vec<String>, PublishError>
where
    S: StorageBackend + ?Sized,
{
    let relative_paths: Vec<String> = run.files.keys().cloned().collect();

    for (index, chunk) in relative_paths.chunks(STAT_BATCH_SIZE).enumerate() {
        let batch = index + 1;
        let keys: Vec<String> = chunk
            .iter()
            .map(|relative_path| run.files[relative_path].remote_path.clone())
            .collect();

        debug!(batch, size = keys.len(), "Sending stat batch");
        let outcomes = storage.stat_batch(bucket, &keys).await.map_err(|source| {
            error!(batch, error = %source, "Stat batch failed");
            PublishError::Resolution { batch, source }
        })?;

        if outcomes.len() != keys.len() {
            error!(
                batch,
                expected = keys.len(),
                received = outcomes.len(),
                "Stat batch returned a mismatched number of results"
            );
            return Err(PublishError::Resolution {
                batch,
                source: BackendError::Protocol(format!(
                    "expected {} stat results, received {}",
                    keys.len(),
                    outcomes.len()
                )),
            });
        }

        for (relative_path, outcome) in chunk.iter().zip(outcomes.iter()) {
            if let Some(record) = run.files.get_mut(relative_path) {
                let status = classify(record.content_hash.as_deref(), outcome);
                debug!(file = %relative_path, code = outcome.code, ?status, "Resolved file status");
                record.status = status;
                run.counts.record(status);
            }
        }
    }

    let pending = run.pending_uploads();
    info!(
        created = run.counts.created,
        modified = run.counts.modified,
        unmodified = run.counts.unmodified,
        "Resolved remote state"
    );
    Ok(pending)
}
