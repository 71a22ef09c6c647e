//! Face location and gaze configuration

use serde::{Deserialize, Serialize};

/// How many faces the locator reports.
///
/// Extra faces can only be flagged in `All` mode; `Largest` reports at most
/// one face per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceMode {
    /// Single subject expected: keep only the tallest candidate
    #[default]
    Largest,
    /// Report every candidate (extra faces are themselves a signal)
    All,
}

/// Face locator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Candidate selection policy
    pub mode: FaceMode,

    /// Face detection confidence threshold
    pub confidence: f32,

    /// IoU above which overlapping face candidates are merged
    pub nms_iou: f32,

    /// ONNX face model path (UltraFace layout)
    pub model_path: Option<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            mode: FaceMode::Largest,
            confidence: 0.7,
            nms_iou: 0.3,
            model_path: None,
        }
    }
}

/// Gaze estimation configuration
///
/// Defaults are the empirically tuned values of the original deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Brightness cut for pupil binarization (0-255)
    pub threshold: u8,

    /// Fraction of face width separating left from right eye
    pub midline: f32,

    /// Fraction of the eye region height dropped from the top (eyebrows)
    pub eyebrow_fraction: f32,

    /// Erosion passes (3x3) before dilation
    pub erode_iterations: u8,

    /// Dilation passes (3x3) after erosion
    pub dilate_iterations: u8,

    /// Median filter radius (2 => 5x5)
    pub median_radius: u32,

    /// Smallest dark blob accepted as a pupil (pixels)
    pub min_blob_area: u32,

    /// Largest dark blob accepted as a pupil (pixels)
    pub max_blob_area: u32,

    /// Horizontal ratio at or below which the subject looks right
    pub right_cut: f32,

    /// Horizontal ratio at or above which the subject looks left
    pub left_cut: f32,

    /// Per-subject offset added to the horizontal ratio
    pub calibration_offset: f32,

    /// Pixels subtracted from the eye width when normalizing pupil x
    pub ratio_margin: u32,

    /// Minimum luminance standard deviation for an eye region to resolve
    pub min_eye_contrast: f32,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            threshold: 55,
            midline: 0.5,
            eyebrow_fraction: 0.25,
            erode_iterations: 2,
            dilate_iterations: 4,
            median_radius: 2,
            min_blob_area: 25,
            max_blob_area: 1500,
            right_cut: 0.35,
            left_cut: 0.65,
            calibration_offset: 0.0,
            ratio_margin: 10,
            min_eye_contrast: 12.0,
        }
    }
}

impl GazeConfig {
    /// Narrow center band, flags small glances
    pub fn strict() -> Self {
        Self {
            right_cut: 0.42,
            left_cut: 0.58,
            ..Default::default()
        }
    }

    /// Wide center band
    pub fn lenient() -> Self {
        Self {
            right_cut: 0.28,
            left_cut: 0.72,
            ..Default::default()
        }
    }
}
