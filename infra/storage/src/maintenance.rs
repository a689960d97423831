use crate::engine::TMP_MARKER;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Outcome of a temp-file sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed: usize,
    pub failed: usize,
}

pub(crate) async fn purge_tmp(root: &Path, stale_after: Duration) -> PurgeReport {
    let root = root.to_path_buf();
    let now = SystemTime::now();

    match tokio::task::spawn_blocking(move || remove_stale(&root, now, stale_after)).await {
        Ok(report) => {
            if report.removed > 0 || report.failed > 0 {
                info!(removed = report.removed, failed = report.failed, "Cleaned up temp files");
            }
            report
        },
        Err(err) => {
            error!(error = %err, "Temp file cleanup task panicked");
            PurgeReport::default()
        },
    }
}

fn remove_stale(root: &Path, now: SystemTime, stale_after: Duration) -> PurgeReport {
    let mut report = PurgeReport::default();

    for entry in WalkDir::new(root).contents_first(true).into_iter().flatten() {
        let path = entry.path();
        if path == root {
            continue;
        }

        if entry.file_type().is_dir() {
            // Only succeeds for empty shard directories.
            let _ = std::fs::remove_dir(path);
        } else if is_tmp(&entry) && is_stale(&entry, now, stale_after) {
            match std::fs::remove_file(path) {
                Ok(()) => report.removed += 1,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Failed to remove temp file");
                    report.failed += 1;
                },
            }
        }
    }

    report
}

fn is_tmp(entry: &DirEntry) -> bool {
    entry.file_type().is_file()
        && entry.file_name().to_str().is_some_and(|name| name.contains(TMP_MARKER))
}

fn is_stale(entry: &DirEntry, now: SystemTime, stale_after: Duration) -> bool {
    entry
        .metadata()
        .ok()
        .and_then(|m| m.modified().ok())
        .is_none_or(|modified| now.duration_since(modified).is_ok_and(|age| age >= stale_after))
}
