//! Export artifact naming and writing.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::info;

use crate::error::ExportError;
use crate::query::Mode;

use super::{ExportOutcome, ExportStatus};

/// File name for an export, e.g. `navy_data_Check_20250828_101500.csv`
pub fn export_filename(mode: Mode, now: NaiveDateTime) -> String {
    format!("navy_data_{}_{}.csv", mode, now.format("%Y%m%d_%H%M%S"))
}

/// Write an export outcome into `dir`
///
/// Partial outcomes get a `.partial.csv` suffix so they are never mistaken
/// for a complete file. Empty outcomes and missing directories are refused.
///
/// # Arguments
/// * `dir` - Existing output directory
/// * `outcome` - Export outcome to write
/// * `now` - Timestamp used in the file name
///
/// # Returns
/// * `Result<PathBuf, ExportError>` - Path of the written file
pub async fn write_artifact(
    dir: &Path,
    outcome: &ExportOutcome,
    now: NaiveDateTime,
) -> Result<PathBuf, ExportError> {
    if outcome.is_empty() {
        return Err(ExportError::Artifact(
            "no records to write".to_string(),
        ));
    }

    let is_dir = tokio::fs::metadata(dir)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(ExportError::Artifact(format!(
            "directory does not exist: {}",
            dir.display()
        )));
    }

    let mut name = export_filename(outcome.mode, now);
    if matches!(outcome.status, ExportStatus::Partial { .. }) {
        name = name.replace(".csv", ".partial.csv");
    }

    let path = dir.join(name);
    tokio::fs::write(&path, &outcome.payload)
        .await
        .map_err(|e| ExportError::Artifact(format!("failed to write {}: {}", path.display(), e)))?;

    info!(
        "Wrote {} records ({} bytes) to {}",
        outcome.records,
        outcome.payload.len(),
        path.display()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 28)
            .unwrap()
            .and_hms_opt(10, 15, 0)
            .unwrap()
    }

    fn outcome(mode: Mode, status: ExportStatus) -> ExportOutcome {
        ExportOutcome {
            payload: b"_id\r\na\r\n".to_vec(),
            records: 1,
            mode,
            status,
            elapsed: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(
            export_filename(Mode::Check, now()),
            "navy_data_Check_20250828_101500.csv"
        );
        assert_eq!(
            export_filename(Mode::Fetch, now()),
            "navy_data_Fetch_20250828_101500.csv"
        );
    }

    #[tokio::test]
    async fn test_write_complete_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_artifact(dir.path(), &outcome(Mode::Fetch, ExportStatus::Complete), now())
            .await
            .unwrap();
        assert!(path.ends_with("navy_data_Fetch_20250828_101500.csv"));
        assert_eq!(std::fs::read(&path).unwrap(), b"_id\r\na\r\n");
    }

    #[tokio::test]
    async fn test_partial_artifact_is_marked() {
        let dir = tempfile::tempdir().unwrap();
        let partial = outcome(Mode::Check, ExportStatus::Partial {
            error: "cursor killed".to_string(),
        });
        let path = write_artifact(dir.path(), &partial, now())
            .await
            .unwrap();
        assert!(path.ends_with("navy_data_Check_20250828_101500.partial.csv"));
    }

    #[tokio::test]
    async fn test_missing_directory_refused() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = write_artifact(&missing, &outcome(Mode::Fetch, ExportStatus::Complete), now())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Artifact(_)));
    }

    #[tokio::test]
    async fn test_empty_outcome_refused() {
        let dir = tempfile::tempdir().unwrap();
        let empty = ExportOutcome {
            payload: Vec::new(),
            records: 0,
            mode: Mode::Fetch,
            status: ExportStatus::Complete,
            elapsed: Duration::ZERO,
        };
        assert!(write_artifact(dir.path(), &empty, now()).await.is_err());
    }
}
