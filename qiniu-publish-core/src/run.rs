//! The working set of one bucket task.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Remote state of a file, relative to its local content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileStatus {
    /// Not resolved yet.
    Unknown,
    /// Remote key holds the same content.
    Unmodified,
    /// Remote key does not exist.
    New,
    /// Remote key exists with different content.
    Overridden,
}

impl FileStatus {
    pub fn needs_upload(&self) -> bool {
        matches!(self, FileStatus::New | FileStatus::Overridden)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    /// `/`-separated path below the source folder; the key of the run's map.
    pub relative_path: String,
    pub local_path: PathBuf,
    /// Destination key inside the bucket.
    pub remote_path: String,
    pub content_hash: Option<String>,
    pub status: FileStatus,
}

impl FileRecord {
    pub fn new(relative_path: String, local_path: PathBuf, remote_path: String) -> Self {
        Self {
            relative_path,
            local_path,
            remote_path,
            content_hash: None,
            status: FileStatus::Unknown,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub created: usize,
    pub modified: usize,
    pub unmodified: usize,
}

impl StatusCounts {
    pub(crate) fn record(&mut self, status: FileStatus) {
        match status {
            FileStatus::New => self.created += 1,
            FileStatus::Overridden => self.modified += 1,
            FileStatus::Unmodified => self.unmodified += 1,
            FileStatus::Unknown => {}
        }
    }
}

/// All files of one bucket task, keyed by relative path, plus resolution counters.
///
/// Owned by the pipeline for the duration of one task and handed to each phase in turn.
#[derive(Debug, Default, Clone)]
pub struct PublishRun {
    pub files: BTreeMap<String, FileRecord>,
    pub counts: StatusCounts,
}

impl PublishRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any earlier one with the same relative path.
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.files.insert(record.relative_path.clone(), record)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, relative_path: &str) -> Option<&FileRecord> {
        self.files.get(relative_path)
    }

    /// Relative paths of every file that has to be uploaded.
    pub fn pending_uploads(&self) -> Vec<String> {
        self.files
            .values()
            .filter(|record| record.status.needs_upload())
            .map(|record| record.relative_path.clone())
            .collect()
    }
}
