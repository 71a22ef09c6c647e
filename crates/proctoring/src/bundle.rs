//! Process-wide detector resources

use std::sync::Arc;

use face_gaze::{EyeDetector, FaceLocator, GazeConfig, GazeEstimator, ProportionalEyeDetector};
use object_detection::ObjectDetector;
use tracing::info;

use crate::{ProctoringConfig, SessionError};

/// Immutable detectors shared by every session.
///
/// Built once at startup so model load failures surface before any exam
/// starts. Per-session state (gaze cache, warning counter) is not kept here.
pub struct DetectorBundle {
    pub locator: FaceLocator,
    pub eyes: Arc<dyn EyeDetector>,
    pub objects: ObjectDetector,
    pub gaze: GazeConfig,
}

impl DetectorBundle {
    pub fn new(
        locator: FaceLocator,
        eyes: Arc<dyn EyeDetector>,
        objects: ObjectDetector,
        gaze: GazeConfig,
    ) -> Self {
        Self {
            locator,
            eyes,
            objects,
            gaze,
        }
    }

    pub fn from_config(config: &ProctoringConfig) -> Result<Self, SessionError> {
        let locator = FaceLocator::from_config(&config.locator)?;
        let objects = ObjectDetector::from_config(&config.detector)?;
        let eyes: Arc<dyn EyeDetector> =
            Arc::new(ProportionalEyeDetector::new(config.gaze.min_eye_contrast));
        info!(face_mode = ?locator.mode(), "Detector bundle ready");
        Ok(Self::new(locator, eyes, objects, config.gaze.clone()))
    }

    /// Fresh per-session gaze estimator
    pub fn gaze_estimator(&self) -> GazeEstimator {
        GazeEstimator::new(self.gaze.clone(), Arc::clone(&self.eyes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_detection::DetectionError;

    #[test]
    fn test_defaults_build_without_models() {
        let bundle = DetectorBundle::from_config(&ProctoringConfig::default()).unwrap();
        assert_eq!(bundle.gaze.threshold, 55);
    }

    #[test]
    fn test_missing_weights_fail_at_build() {
        let mut config = ProctoringConfig::default();
        config.detector.model_path = Some("/nonexistent/ssd.onnx".to_string());
        let err = DetectorBundle::from_config(&config).err().unwrap();
        assert!(matches!(err, SessionError::Detection(DetectionError::ModelLoad(_))));
    }
}
