//! Expands folder mappings into the run's file map.

use futures::future::try_join_all;
use std::path::Path;
use tracing::{debug, error, info};
use walkdir::{DirEntry, WalkDir};

use crate::config::FolderMapping;
use crate::error::PublishError;
use crate::run::{FileRecord, PublishRun};

/// List every mapping and merge the results in mapping order.
///
/// Mappings are walked concurrently on the blocking pool. When two mappings produce the same
/// relative path, the one listed later wins.
pub async fn enumerate_files(mappings: &[FolderMapping]) -> Result<PublishRun, PublishError> {
    let listings = mappings.iter().cloned().map(|mapping| async move {
        let folder = mapping.from.clone();
        tokio::task::spawn_blocking(move || list_mapping(&mapping))
            .await
            .map_err(|e| PublishError::Enumeration {
                folder,
                source: std::io::Error::other(e),
            })?
    });
    let listings = try_join_all(listings).await?;

    let mut run = PublishRun::new();
    for records in listings {
        for record in records {
            if let Some(previous) = run.insert(record) {
                debug!(
                    relative_path = %previous.relative_path,
                    replaced = %previous.local_path.display(),
                    "Later mapping replaced file with the same relative path"
                );
            }
        }
    }
    info!(count = run.len(), "Enumerated files");
    Ok(run)
}

/// Recursively list the regular files under one mapping.
///
/// Dot-prefixed files and directories are skipped.
pub fn list_mapping(mapping: &FolderMapping) -> Result<Vec<FileRecord>, PublishError> {
    let root = &mapping.from;
    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    let mut records = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            error!(error = %e, folder = %root.display(), "Failed to list folder");
            PublishError::Enumeration {
                folder: root.clone(),
                source: e.into(),
            }
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative_path = match entry.path().strip_prefix(root) {
            Ok(relative) => to_unix_path(relative),
            Err(_) => continue,
        };
        if relative_path.is_empty() {
            continue;
        }
        let remote_path = join_remote_path(&mapping.to, &relative_path);
        debug!(%relative_path, %remote_path, "Found file");
        records.push(FileRecord::new(
            relative_path,
            entry.path().to_path_buf(),
            remote_path,
        ));
    }
    debug!(folder = %root.display(), count = records.len(), "Listed folder");
    Ok(records)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn to_unix_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a key prefix and a relative path into a normalized, `/`-separated key.
///
/// Empty and `.` segments are dropped, `..` removes the previous segment and a leading
/// separator on `prefix` is kept.
pub fn join_remote_path(prefix: &str, relative_path: &str) -> String {
    let rooted = prefix.starts_with(['/', '\\']);
    let mut segments: Vec<&str> = Vec::new();
    for segment in prefix.split(['/', '\\']).chain(relative_path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else {
        joined
    }
}
