//! Face and Gaze Analysis
//!
//! Per-frame subject analysis for exam proctoring:
//! - Face location (largest-face or all-faces policy)
//! - Eye region isolation within the face
//! - Pupil localization by blob detection
//! - Gaze direction classification with last-known geometry carry-over

pub mod config;
pub mod eyes;
pub mod gaze;
pub mod locator;
pub mod onnx;
pub mod pupil;

pub use config::{FaceMode, GazeConfig, LocatorConfig};
pub use eyes::{EyeDetector, EyePair, ProportionalEyeDetector};
pub use gaze::{GazeDirection, GazeEstimator, GazeState};
pub use locator::{FaceCandidate, FaceLocator, FaceModel, FaceScan, FixedFaceModel};
pub use onnx::OnnxFaceModel;
pub use pupil::{locate_pupil, PupilParams};

use thiserror::Error;

/// Face/gaze error types
#[derive(Error, Debug)]
pub enum GazeError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),
}
