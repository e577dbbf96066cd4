//! Removes perspective-table copies the agent wrote into the workspace root.

use std::path::{Path, PathBuf};

use crate::report::{is_artifact_name, PERSPECTIVE_TABLE_BEGIN, PERSPECTIVE_TABLE_END};

/// Timestamped reports are never candidates, even when saved to the root.
fn is_candidate(name: &str, prefix: &str) -> bool {
    name.starts_with(prefix) && name.ends_with(".md") && !is_artifact_name(name, prefix)
}

/// Non-recursive sweep of `root`. A file named `<prefix>*.md` is deleted only
/// when it also carries both internal table markers; user files that merely
/// share the name are left alone. Failures are logged and skipped.
pub async fn sweep_duplicate_tables(root: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "cleanup sweep skipped");
            return removed;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "cleanup sweep stopped early");
                break;
            }
        };
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_candidate(&name, prefix) {
            continue;
        }
        let path = entry.path();
        if !matches!(entry.file_type().await, Ok(t) if t.is_file()) {
            continue;
        }
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "unreadable candidate kept");
                continue;
            }
        };
        if !(content.contains(PERSPECTIVE_TABLE_BEGIN) && content.contains(PERSPECTIVE_TABLE_END)) {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "removed duplicate perspective table");
                removed.push(path);
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove duplicate"),
        }
    }
    removed.sort();
    removed
}
