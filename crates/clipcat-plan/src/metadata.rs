use std::fs;
use std::path::{Path, PathBuf};

use clipcat_core::errors::{ClipcatError, ErrorInfo};
use clipcat_core::from_json_slice;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// One entry of the clip metadata file.
///
/// Field names follow the metadata generator (`video_name`, `duration_sec`,
/// `video_path`); the short forms `id`, `duration` and `path` are accepted as
/// aliases. Unknown fields such as `fps` or `frames` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRecord {
    /// Unique clip identifier.
    #[serde(rename = "video_name", alias = "id")]
    pub id: String,
    /// Clip duration in seconds.
    #[serde(rename = "duration_sec", alias = "duration")]
    pub duration: f64,
    /// Source file of the clip, carried through untouched.
    #[serde(
        rename = "video_path",
        alias = "path",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub path: Option<PathBuf>,
}

impl ClipRecord {
    /// Creates a record without a source path.
    pub fn new(id: impl Into<String>, duration: f64) -> Self {
        Self {
            id: id.into(),
            duration,
            path: None,
        }
    }
}

/// Reads clip metadata from a JSON array on disk.
pub fn load_records(path: &Path) -> Result<Vec<ClipRecord>, ClipcatError> {
    let bytes = fs::read(path).map_err(|err| {
        ClipcatError::Serde(
            ErrorInfo::new("metadata-read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    let records: Vec<ClipRecord> = from_json_slice(&bytes).map_err(|err| {
        ClipcatError::Serde(
            ErrorInfo::new("metadata-parse", err.info().message.clone())
                .with_context("path", path.display().to_string()),
        )
    })?;
    info!(path = %path.display(), clips = records.len(), "loaded clip metadata");
    Ok(records)
}

/// Drops clips shorter than `min_duration`.
///
/// Records with invalid durations are kept so that pool construction can
/// reject them with a proper configuration error.
pub fn filter_short_clips(records: Vec<ClipRecord>, min_duration: f64) -> Vec<ClipRecord> {
    let before = records.len();
    let kept: Vec<ClipRecord> = records
        .into_iter()
        .filter(|record| {
            let keep = !(record.duration.is_finite()
                && record.duration > 0.0
                && record.duration < min_duration);
            if !keep {
                warn!(
                    clip = %record.id,
                    duration = record.duration,
                    min_duration,
                    "skipping clip shorter than minimum duration"
                );
            }
            keep
        })
        .collect();
    if kept.len() < before {
        info!(
            dropped = before - kept.len(),
            kept = kept.len(),
            "filtered short clips"
        );
    }
    kept
}
