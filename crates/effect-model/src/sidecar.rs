//! Sidecar files written next to each recording.
//!
//! The recorder drops two optional JSON files beside the video:
//! `<base>.meta.json` with capture metadata and `<base>.cursor.json` with
//! the sampled cursor stream. A missing sidecar is normal (older
//! recordings, imports from elsewhere); a malformed one is an error the
//! caller should see.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cursor::CursorData;

/// Metadata the recorder writes at capture time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMeta {
    /// Capture frame rate. The most trustworthy fps source when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,

    /// Human-readable resolution label (e.g. "2560x1440").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    /// Recorder quality preset name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Capture duration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// When the recording was made.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Errors from sidecar loading. Missing files are NOT errors; the loaders
/// return `Ok(None)` for those.
#[derive(Debug, thiserror::Error)]
pub enum SidecarError {
    #[error("failed to read sidecar {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sidecar {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Derive a sidecar path from the video path: the extension is replaced
/// by `suffix` (e.g. `capture.mp4` + `.meta.json` = `capture.meta.json`).
pub fn sidecar_path(video: &Path, suffix: &str) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    video.with_file_name(format!("{stem}{suffix}"))
}

/// Load `<base>.meta.json` if it exists.
pub fn load_recording_meta(video: &Path) -> Result<Option<RecordingMeta>, SidecarError> {
    load_sidecar(&sidecar_path(video, ".meta.json"))
}

/// Load `<base>.cursor.json` if it exists.
pub fn load_cursor_data(video: &Path) -> Result<Option<CursorData>, SidecarError> {
    load_sidecar(&sidecar_path(video, ".cursor.json"))
}

fn load_sidecar<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, SidecarError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| SidecarError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed = serde_json::from_str(&contents).map_err(|source| SidecarError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path_replaces_extension() {
        let path = sidecar_path(Path::new("/tmp/capture.mp4"), ".meta.json");
        assert_eq!(path, Path::new("/tmp/capture.meta.json"));

        let path = sidecar_path(Path::new("/tmp/capture.mp4"), ".cursor.json");
        assert_eq!(path, Path::new("/tmp/capture.cursor.json"));
    }

    #[test]
    fn test_missing_sidecar_is_none() {
        let loaded = load_recording_meta(Path::new("/nonexistent/capture.mp4")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_malformed_sidecar_is_error() {
        let dir = std::env::temp_dir().join("zoomcast-sidecar-test");
        fs::create_dir_all(&dir).unwrap();
        let video = dir.join("broken.mp4");
        fs::write(sidecar_path(&video, ".meta.json"), "{not json").unwrap();

        let result = load_recording_meta(&video);
        assert!(matches!(result, Err(SidecarError::Parse { .. })));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_meta_tolerates_partial_fields() {
        let meta: RecordingMeta = serde_json::from_str(r#"{"fps": 60.0}"#).unwrap();
        assert_eq!(meta.fps, Some(60.0));
        assert!(meta.width.is_none());
        assert!(meta.timestamp.is_none());
    }

    #[test]
    fn test_meta_json_roundtrip() {
        let meta = RecordingMeta {
            fps: Some(59.94),
            resolution: Some("2560x1440".to_string()),
            quality: Some("high".to_string()),
            width: Some(2560),
            height: Some(1440),
            duration: Some(12.5),
            timestamp: Some(Utc::now()),
        };
        let json = serde_json::to_string(&meta).unwrap();
        let parsed: RecordingMeta = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, meta);
    }
}
