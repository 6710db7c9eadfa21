//! High-level pipeline: orchestrates locate → enumerate → hash → resolve → upload → refresh.
//!
//! This module provides the top-level orchestration for publishing one or more configured
//! buckets. For every [`BucketTask`] it:
//!   - asks the storage backend where uploads for the bucket have to go
//!   - lists every file under the task's folder mappings
//!   - hashes each file with the Qiniu etag algorithm
//!   - stats the remote keys in batches and classifies each file as new, modified or unmodified
//!   - uploads new and modified files one at a time
//!   - refreshes CDN caches for the modified files under every configured host
//!
//! # Responsibilities
//! - Fail-fast orchestration: the first fatal error stops the task and is returned unchanged
//! - Emits lifecycle events to a [`Reporter`] and structured `tracing` events throughout
//! - Owns the [`PublishRun`] for the duration of a task; nothing is persisted between runs
//!
//! # Navigation
//! - Single bucket: [`publish_bucket`]
//! - Several buckets, strictly in order: [`publish_all`]

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::{BucketTask, PublishOptions};
use crate::contract::{CdnBackend, Reporter, StorageBackend};
use crate::enumerate::enumerate_files;
use crate::error::{PublishError, TaskError};
use crate::etag::hash_files;
use crate::invalidate::{build_refresh_urls, refresh_urls};
use crate::report::{Phase, PhaseOutcome, PhaseSummary, PublishEvent, SkipReason};
use crate::resolve::resolve_remote_state;
use crate::run::{PublishRun, StatusCounts};
use crate::upload::upload_files;

/// What happened to the CDN refresh step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RefreshResult {
    Refreshed { batches: usize },
    Skipped(SkipReason),
}

/// Outcome of one successful bucket task.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub bucket: String,
    pub files_found: usize,
    pub counts: StatusCounts,
    /// Remote paths uploaded, in upload order.
    pub uploaded: Vec<String>,
    /// URLs sent to the CDN, in request order.
    pub refreshed_urls: Vec<String>,
    pub upload_skipped: bool,
    pub refresh: RefreshResult,
}

fn emit<R: Reporter + ?Sized>(reporter: &R, phase: Phase, outcome: PhaseOutcome) {
    reporter.on_event(&PublishEvent::phase(phase, outcome));
}

fn started<R: Reporter + ?Sized>(reporter: &R, phase: Phase) {
    emit(reporter, phase, PhaseOutcome::Started);
}

fn succeeded<R: Reporter + ?Sized>(reporter: &R, phase: Phase, summary: Option<PhaseSummary>) {
    emit(reporter, phase, PhaseOutcome::Succeeded { summary });
}

fn skipped<R: Reporter + ?Sized>(reporter: &R, phase: Phase, reason: SkipReason) {
    emit(reporter, phase, PhaseOutcome::Skipped { reason });
}

/// Report the failure and hand the error back for propagation.
fn failed<R: Reporter + ?Sized>(reporter: &R, phase: Phase, err: PublishError) -> PublishError {
    error!(phase = phase.done_label(), label = %err.label(), error = %err, "[PUBLISH][ERROR] Phase failed");
    emit(
        reporter,
        phase,
        PhaseOutcome::Failed {
            label: err.label(),
            detail: err.to_string(),
        },
    );
    err
}

/// Publish one bucket task.
pub async fn publish_bucket<S, C, R>(
    task: &BucketTask,
    options: &PublishOptions,
    storage: &S,
    cdn: &C,
    reporter: &R,
) -> Result<PublishReport, PublishError>
where
    S: StorageBackend + ?Sized,
    C: CdnBackend + ?Sized,
    R: Reporter + ?Sized,
{
    let bucket = task.bucket.as_str();
    info!(%bucket, "[PUBLISH] Starting bucket task");

    // --- Locate the upload zone ---
    started(reporter, Phase::LocateZone);
    let endpoint = storage
        .locate_upload_endpoint(bucket)
        .await
        .map_err(|source| PublishError::Zone {
            bucket: bucket.to_string(),
            source,
        })
        .map_err(|e| failed(reporter, Phase::LocateZone, e))?;
    debug!(%bucket, endpoint = %endpoint.url, "[PUBLISH] Upload endpoint located");
    succeeded(reporter, Phase::LocateZone, None);

    // --- Enumerate ---
    started(reporter, Phase::LoadFiles);
    let mut run: PublishRun = enumerate_files(&task.mappings)
        .await
        .map_err(|e| failed(reporter, Phase::LoadFiles, e))?;
    let files_found = run.len();
    succeeded(
        reporter,
        Phase::LoadFiles,
        Some(PhaseSummary::FilesFound { count: files_found }),
    );

    // --- Hash ---
    started(reporter, Phase::HashFiles);
    let hashed = hash_files(&mut run)
        .await
        .map_err(|e| failed(reporter, Phase::HashFiles, e))?;
    succeeded(
        reporter,
        Phase::HashFiles,
        Some(PhaseSummary::FilesHashed { count: hashed }),
    );

    // --- Resolve ---
    started(reporter, Phase::CheckStatus);
    let pending = resolve_remote_state(storage, bucket, &mut run)
        .await
        .map_err(|e| failed(reporter, Phase::CheckStatus, e))?;
    succeeded(
        reporter,
        Phase::CheckStatus,
        Some(PhaseSummary::Status {
            created: run.counts.created,
            modified: run.counts.modified,
            unmodified: run.counts.unmodified,
        }),
    );

    // --- Upload ---
    started(reporter, Phase::Upload);
    let upload_skipped = pending.is_empty();
    let uploads = if upload_skipped {
        info!(%bucket, "[PUBLISH] Nothing to upload");
        skipped(reporter, Phase::Upload, SkipReason::NothingToDo);
        Default::default()
    } else {
        let outcome = upload_files(storage, &endpoint, bucket, &run, &pending)
            .await
            .map_err(|e| failed(reporter, Phase::Upload, e))?;
        succeeded(
            reporter,
            Phase::Upload,
            Some(PhaseSummary::Uploaded {
                count: outcome.uploaded.len(),
            }),
        );
        outcome
    };

    // --- Refresh ---
    started(reporter, Phase::Refresh);
    let urls = build_refresh_urls(&task.hosts, &uploads.overridden);
    let (refresh, refreshed_urls) = if uploads.overridden.is_empty() || urls.is_empty() {
        info!(%bucket, "[PUBLISH] No overridden files, skipping refresh");
        skipped(reporter, Phase::Refresh, SkipReason::NothingToDo);
        (RefreshResult::Skipped(SkipReason::NothingToDo), Vec::new())
    } else if !options.refresh {
        info!(%bucket, "[PUBLISH] Refresh disabled by caller");
        skipped(reporter, Phase::Refresh, SkipReason::DisabledByCaller);
        (RefreshResult::Skipped(SkipReason::DisabledByCaller), Vec::new())
    } else {
        let batches = refresh_urls(cdn, &urls)
            .await
            .map_err(|e| failed(reporter, Phase::Refresh, e))?;
        succeeded(
            reporter,
            Phase::Refresh,
            Some(PhaseSummary::Refreshed {
                urls: urls.len(),
                batches,
            }),
        );
        (RefreshResult::Refreshed { batches }, urls)
    };

    let report = PublishReport {
        bucket: bucket.to_string(),
        files_found,
        counts: run.counts,
        uploaded: uploads.uploaded,
        refreshed_urls,
        upload_skipped,
        refresh,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => debug!(json = %json, "[PUBLISH][DEBUG] Bucket task report"),
        Err(e) => error!(error = ?e, "[PUBLISH][DEBUG] Failed to serialize report as JSON"),
    }
    info!(%bucket, "[PUBLISH] Bucket task complete");
    Ok(report)
}

/// Publish several bucket tasks strictly in order, stopping at the first failure.
///
/// `connect` builds the storage and CDN backends for each task, since every task carries its own
/// credentials.
pub async fn publish_all<S, C, R, F>(
    tasks: &[BucketTask],
    options: &PublishOptions,
    reporter: &R,
    mut connect: F,
) -> Result<Vec<PublishReport>, TaskError>
where
    S: StorageBackend,
    C: CdnBackend,
    R: Reporter + ?Sized,
    F: FnMut(&BucketTask) -> (S, C),
{
    let mut reports = Vec::with_capacity(tasks.len());
    for task in tasks {
        reporter.on_event(&PublishEvent::TaskStarted {
            bucket: task.bucket.clone(),
        });
        let (storage, cdn) = connect(task);
        match publish_bucket(task, options, &storage, &cdn, reporter).await {
            Ok(report) => {
                reporter.on_event(&PublishEvent::TaskSucceeded {
                    bucket: task.bucket.clone(),
                });
                reports.push(report);
            }
            Err(source) => {
                reporter.on_event(&PublishEvent::TaskFailed {
                    bucket: task.bucket.clone(),
                });
                return Err(TaskError {
                    bucket: task.bucket.clone(),
                    source,
                });
            }
        }
    }
    Ok(reports)
}
