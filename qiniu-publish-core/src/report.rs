//! Lifecycle events emitted by the pipeline, and the reporters that ship with the crate.

use serde::Serialize;
use tracing::{error, info};

use crate::contract::Reporter;

/// Phases of one bucket task, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    LocateZone,
    LoadFiles,
    HashFiles,
    CheckStatus,
    Upload,
    Refresh,
}

impl Phase {
    /// Text shown while the phase is running.
    pub fn running_label(&self) -> &'static str {
        match self {
            Phase::LocateZone => "Determining zone",
            Phase::LoadFiles => "Loading files",
            Phase::HashFiles => "Hashing files",
            Phase::CheckStatus => "Checking files status",
            Phase::Upload => "Uploading files",
            Phase::Refresh => "Refreshing urls",
        }
    }

    /// Past-tense name, used in success and skip lines.
    pub fn done_label(&self) -> &'static str {
        match self {
            Phase::LocateZone => "Determine zone",
            Phase::LoadFiles => "Load files",
            Phase::HashFiles => "Hash files",
            Phase::CheckStatus => "Check files status",
            Phase::Upload => "Upload files",
            Phase::Refresh => "Refresh urls",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PhaseSummary {
    FilesFound {
        count: usize,
    },
    FilesHashed {
        count: usize,
    },
    Status {
        created: usize,
        modified: usize,
        unmodified: usize,
    },
    Uploaded {
        count: usize,
    },
    Refreshed {
        urls: usize,
        batches: usize,
    },
}

impl std::fmt::Display for PhaseSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseSummary::FilesFound { count } => write!(f, "{count} found"),
            PhaseSummary::FilesHashed { count } => write!(f, "{count} hashed"),
            PhaseSummary::Status {
                created,
                modified,
                unmodified,
            } => write!(
                f,
                "{created} created, {modified} modified, {unmodified} unmodified"
            ),
            PhaseSummary::Uploaded { count } => write!(f, "{count} uploaded"),
            PhaseSummary::Refreshed { urls, batches } => {
                write!(f, "{urls} urls in {batches} batches")
            }
        }
    }
}

/// Why a phase did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// There was no work for the phase.
    NothingToDo,
    /// The caller turned the phase off.
    DisabledByCaller,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PhaseOutcome {
    Started,
    Succeeded { summary: Option<PhaseSummary> },
    Skipped { reason: SkipReason },
    Failed { label: String, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PublishEvent {
    TaskStarted { bucket: String },
    TaskSucceeded { bucket: String },
    TaskFailed { bucket: String },
    Phase { phase: Phase, outcome: PhaseOutcome },
}

impl PublishEvent {
    pub(crate) fn phase(phase: Phase, outcome: PhaseOutcome) -> Self {
        PublishEvent::Phase { phase, outcome }
    }
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn on_event(&self, _event: &PublishEvent) {}
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn on_event(&self, event: &PublishEvent) {
        match event {
            PublishEvent::TaskStarted { bucket } => info!(%bucket, "Bucket task started"),
            PublishEvent::TaskSucceeded { bucket } => info!(%bucket, "Bucket task succeeded"),
            PublishEvent::TaskFailed { bucket } => error!(%bucket, "Bucket task failed"),
            PublishEvent::Phase { phase, outcome } => match outcome {
                PhaseOutcome::Started => info!(phase = phase.running_label(), "Phase started"),
                PhaseOutcome::Succeeded { summary } => info!(
                    phase = phase.done_label(),
                    summary = summary.as_ref().map(|s| s.to_string()).unwrap_or_default(),
                    "Phase succeeded"
                ),
                PhaseOutcome::Skipped { reason } => {
                    info!(phase = phase.done_label(), ?reason, "Phase skipped")
                }
                PhaseOutcome::Failed { label, detail } => {
                    error!(phase = phase.done_label(), %label, %detail, "Phase failed")
                }
            },
        }
    }
}
