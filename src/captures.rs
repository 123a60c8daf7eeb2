//! Persisted capture naming and history.
//!
//! Captures land on disk as `<label>_<YYYYmmdd_HHMMSS_microseconds>.jpg`.
//! The microsecond timestamp keeps rapid repeated captures from one session
//! unique, and multi-camera batches reuse one timestamp so a set's files
//! correlate by suffix.

use crate::error::BenchResult;
use chrono::{DateTime, Local};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

/// Timestamp layout used in capture file names. `%6f` gives fixed six-digit
/// microseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// Format a capture timestamp.
pub fn capture_timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// File name for a capture from the labeled session at the given time.
pub fn capture_filename(label: &str, at: DateTime<Local>) -> String {
    format!("{}_{}.jpg", label, capture_timestamp(at))
}

/// One file inside a capture set.
#[derive(Clone, Debug, Serialize)]
pub struct CaptureEntry {
    pub name: String,
    pub label: String,
}

/// All files persisted with one shared timestamp.
#[derive(Clone, Debug, Serialize)]
pub struct CaptureSet {
    pub timestamp: String,
    pub files: Vec<CaptureEntry>,
}

fn filename_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+)_(\d{8}_\d{6}_\d{6})\.jpg$").ok())
        .as_ref()
}

/// Index the captures directory, grouping files by timestamp, newest first.
/// Files that do not match the capture naming scheme are skipped. A missing
/// directory is an empty history, not an error.
pub fn history(dir: &Path) -> BenchResult<Vec<CaptureSet>> {
    let Some(re) = filename_re() else {
        return Ok(Vec::new());
    };
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut groups: BTreeMap<String, Vec<CaptureEntry>> = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(caps) = re.captures(&name) {
            let label = caps[1].to_string();
            let timestamp = caps[2].to_string();
            groups
                .entry(timestamp)
                .or_default()
                .push(CaptureEntry { name, label });
        }
    }

    Ok(groups
        .into_iter()
        .rev()
        .map(|(timestamp, mut files)| {
            files.sort_by(|a, b| a.name.cmp(&b.name));
            CaptureSet { timestamp, files }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn filename_embeds_label_and_microseconds() {
        let at = Local
            .with_ymd_and_hms(2025, 3, 14, 15, 9, 26)
            .single()
            .unwrap()
            + chrono::Duration::microseconds(535_897);
        assert_eq!(
            capture_filename("imx708", at),
            "imx708_20250314_150926_535897.jpg"
        );
    }

    #[test]
    fn history_groups_by_timestamp_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "camA_20250314_150926_000001.jpg",
            "camB_20250314_150926_000001.jpg",
            "camA_20250314_151000_000002.jpg",
            "notes.txt",
            "stray.jpg",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let sets = history(dir.path()).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].timestamp, "20250314_151000_000002");
        assert_eq!(sets[0].files.len(), 1);
        assert_eq!(sets[1].files.len(), 2);
        assert_eq!(sets[1].files[0].label, "camA");
    }

    #[test]
    fn missing_directory_is_empty_history() {
        let sets = history(Path::new("/nonexistent/scanbench")).unwrap();
        assert!(sets.is_empty());
    }
}
