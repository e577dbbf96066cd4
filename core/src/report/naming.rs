use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const REPORT_EXTENSION: &str = "md";

/// `<prefix>_YYYYMMDD_HHmmss.md`; lexical order equals chronological order.
pub fn artifact_file_name<Tz: TimeZone>(prefix: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{prefix}_{}.{REPORT_EXTENSION}",
        at.format(TIMESTAMP_FORMAT)
    )
}

/// True for `<prefix>_` + 8 digits + `_` + 6 digits + `.md`, nothing else.
pub fn is_artifact_name(name: &str, prefix: &str) -> bool {
    let Some(rest) = name
        .strip_prefix(prefix)
        .and_then(|r| r.strip_prefix('_'))
        .and_then(|r| r.strip_suffix(".md"))
    else {
        return false;
    };
    let bytes = rest.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[9..].iter().all(u8::is_ascii_digit)
}

/// Most recent artifact for `prefix` directly under `dir`. A missing
/// directory yields `None`.
pub async fn find_latest_artifact(dir: &Path, prefix: &str) -> std::io::Result<Option<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut latest: Option<String> = None;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_artifact_name(&name, prefix) {
            continue;
        }
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if latest.as_deref().map(|l| name.as_str() > l).unwrap_or(true) {
            latest = Some(name);
        }
    }
    Ok(latest.map(|n| dir.join(n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn formats_fixed_width_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            artifact_file_name("test_execution", &at),
            "test_execution_20240307_090501.md"
        );
    }

    #[test]
    fn rejects_malformed_timestamps() {
        let p = "test_execution";
        assert!(is_artifact_name("test_execution_20240307_090501.md", p));
        assert!(!is_artifact_name("test_execution_2024037_090501.md", p));
        assert!(!is_artifact_name("test_execution_20240307-090501.md", p));
        assert!(!is_artifact_name("test_execution_20240307_0905011.md", p));
        assert!(!is_artifact_name("test_execution_20240307_09050a.md", p));
        assert!(!is_artifact_name("test_execution_20240307_090501.txt", p));
        assert!(!is_artifact_name("test_perspectives_20240307_090501.md", p));
    }

    #[tokio::test]
    async fn latest_is_lexically_greatest_valid_name() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "test_execution_20240101_000000.md",
            "test_execution_20240301_120000.md",
            "test_execution_20991231_2359.md",
            "test_perspectives_20250101_000000.md",
            "notes.md",
        ] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        std::fs::create_dir(dir.path().join("test_execution_20300101_000000.md")).unwrap();

        let latest = find_latest_artifact(dir.path(), "test_execution")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            latest.file_name().unwrap(),
            "test_execution_20240301_120000.md"
        );
    }

    #[tokio::test]
    async fn missing_directory_has_no_latest() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(find_latest_artifact(&missing, "x").await.unwrap(), None);
    }
}
