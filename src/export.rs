//! History export to JSON files.

use crate::announce::AnnouncementJob;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// File name used when exporting into a directory.
pub fn history_file_name(unix_ms: i64) -> String {
    format!("announcement_history_{}.json", unix_ms)
}

/// Write `history` as pretty JSON.
///
/// When `path` is an existing directory a timestamped file is created inside
/// it. Returns the path written.
pub fn export_history(history: &[AnnouncementJob], path: &Path) -> Result<PathBuf> {
    let target = if path.is_dir() {
        path.join(history_file_name(chrono::Utc::now().timestamp_millis()))
    } else {
        path.to_path_buf()
    };

    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(history)?;
    fs::write(&target, json)?;
    tracing::info!(path = %target.display(), jobs = history.len(), "history exported");
    Ok(target)
}
