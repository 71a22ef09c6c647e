//! Proctoring configuration

use std::path::PathBuf;
use std::time::Duration;

use alerting::AlertConfig;
use camera_capture::CameraConfig;
use face_gaze::{FaceMode, GazeConfig, LocatorConfig};
use object_detection::DetectorConfig;
use serde::{Deserialize, Serialize};

/// Where session frames come from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceKind {
    /// Blank frames, for headless deployments
    #[default]
    Synthetic,
    /// Replay stills from a directory
    ImageDir { path: PathBuf },
    /// Local webcam (`ingest-v4l2` feature)
    V4l2,
}

/// Proctoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctoringConfig {
    pub camera: CameraConfig,
    pub source: SourceKind,
    pub locator: LocatorConfig,
    pub gaze: GazeConfig,
    pub detector: DetectorConfig,
    pub alerts: AlertConfig,

    /// Evidence images land under `{evidence_root}/{exam}/`
    pub evidence_root: PathBuf,

    /// Reads tried per frame before a transient camera error ends the session
    pub max_read_attempts: u32,

    /// Linear backoff step between read attempts (milliseconds)
    pub retry_backoff_ms: u64,

    /// Render every frame with its detections for the live view
    pub live_view: bool,
}

impl Default for ProctoringConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            source: SourceKind::default(),
            locator: LocatorConfig::default(),
            gaze: GazeConfig::default(),
            detector: DetectorConfig::default(),
            alerts: AlertConfig::default(),
            evidence_root: PathBuf::from("evidence"),
            max_read_attempts: 3,
            retry_backoff_ms: 100,
            live_view: true,
        }
    }
}

impl ProctoringConfig {
    /// Tight gaze band, every anomaly signal counted
    pub fn strict() -> Self {
        Self {
            locator: LocatorConfig {
                mode: FaceMode::All,
                ..Default::default()
            },
            gaze: GazeConfig::strict(),
            detector: DetectorConfig::strict(),
            alerts: AlertConfig::strict(),
            ..Default::default()
        }
    }

    /// Wide gaze band, prohibited items only
    pub fn lenient() -> Self {
        Self {
            gaze: GazeConfig::lenient(),
            detector: DetectorConfig::lenient(),
            alerts: AlertConfig::lenient(),
            ..Default::default()
        }
    }

    /// Pacing between frame reads
    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.camera.fps.max(1)))
    }

    /// Backoff before read attempt `attempt` (1-based retry number)
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms * u64::from(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ProctoringConfig::default();
        assert_eq!(config.max_read_attempts, 3);
        assert_eq!(config.alerts.threshold, 10);
        assert_eq!(config.alerts.snapshot_interval, 5);
        assert_eq!(config.frame_period(), Duration::from_millis(66));
    }

    #[test]
    fn test_linear_backoff() {
        let config = ProctoringConfig::default();
        assert_eq!(config.retry_backoff(1), Duration::from_millis(100));
        assert_eq!(config.retry_backoff(2), Duration::from_millis(200));
    }

    #[test]
    fn test_source_kind_tagged() {
        let kind: SourceKind =
            serde_json::from_str(r#"{"kind": "image_dir", "path": "/srv/frames"}"#).unwrap();
        assert_eq!(kind, SourceKind::ImageDir { path: PathBuf::from("/srv/frames") });
    }

    #[test]
    fn test_presets() {
        assert!(ProctoringConfig::strict().alerts.flag_off_screen_gaze);
        // extra faces are only visible when every face is located
        assert_eq!(ProctoringConfig::strict().locator.mode, FaceMode::All);
        assert!(!ProctoringConfig::lenient().alerts.flag_extra_faces);
    }
}
