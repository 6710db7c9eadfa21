//! Qiniu-compatible content fingerprint.
//!
//! Qiniu reports this value as the `hash` of every stored object, and reconciliation compares it
//! byte for byte, so the algorithm here must match the service exactly:
//!
//! - the input is cut into 4 MiB blocks and each block is SHA-1 hashed;
//! - one block (this includes the empty input): `0x16 ‖ sha1(block)`;
//! - more blocks: `0x96 ‖ sha1(sha1(b1) ‖ sha1(b2) ‖ ...)`;
//! - the 21 bytes are URL-safe base64 encoded.
//!
//! [`hash_files`] applies it to every file of a run.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use futures::stream::{self, StreamExt, TryStreamExt};
use sha1::{Digest, Sha1};
use std::path::PathBuf;
use tracing::{debug, error, info};

use crate::error::{PublishError, Stage};
use crate::run::PublishRun;

/// Files read and hashed at the same time.
pub const HASH_CONCURRENCY: usize = 16;

/// Size of one etag block.
pub const BLOCK_SIZE: usize = 4 * 1024 * 1024;

const SINGLE_BLOCK_PREFIX: u8 = 0x16;
const MULTI_BLOCK_PREFIX: u8 = 0x96;

/// Compute the etag of an in-memory buffer.
pub fn etag(bytes: &[u8]) -> String {
    let mut digest = Vec::with_capacity(21);
    if bytes.len() <= BLOCK_SIZE {
        digest.push(SINGLE_BLOCK_PREFIX);
        digest.extend_from_slice(&Sha1::digest(bytes));
    } else {
        let mut outer = Sha1::new();
        for block in bytes.chunks(BLOCK_SIZE) {
            outer.update(Sha1::digest(block));
        }
        digest.push(MULTI_BLOCK_PREFIX);
        digest.extend_from_slice(&outer.finalize());
    }
    URL_SAFE.encode(digest)
}

/// Read and hash every file of the run that has no hash yet. Returns how many were hashed.
pub async fn hash_files(run: &mut PublishRun) -> Result<usize, PublishError> {
    let jobs: Vec<(String, PathBuf)> = run
        .files
        .values()
        .filter(|record| record.content_hash.is_none())
        .map(|record| (record.relative_path.clone(), record.local_path.clone()))
        .collect();

    let hashes: Vec<(String, String)> = stream::iter(jobs)
        .map(|(relative_path, local_path)| async move {
            let bytes = tokio::fs::read(&local_path).await.map_err(|source| {
                error!(error = %source, path = %local_path.display(), "Failed to read file for hashing");
                PublishError::ReadFile {
                    stage: Stage::Hashing,
                    path: local_path.clone(),
                    source,
                }
            })?;
            let hash = etag(&bytes);
            debug!(file = %relative_path, %hash, size = bytes.len(), "Hashed file");
            Ok::<_, PublishError>((relative_path, hash))
        })
        .buffer_unordered(HASH_CONCURRENCY)
        .try_collect()
        .await?;

    let count = hashes.len();
    for (relative_path, hash) in hashes {
        if let Some(record) = run.files.get_mut(&relative_path) {
            record.content_hash = Some(hash);
        }
    }
    info!(count, "Hashed files");
    Ok(count)
}
