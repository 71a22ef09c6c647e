//! Proctoring Sessions
//!
//! One cancellable background task per exam attempt:
//! - Pulls frames from the attempt's camera
//! - Runs face location, gaze estimation and object detection per frame
//! - Feeds anomalies to the warning aggregator (alerts, evidence, disqualification)
//! - Ends on deadline, disqualification, cancellation or fatal error, and
//!   reports exactly one outcome through an [`OutcomeHandle`]
//! - Publishes the latest annotated frame for a live view

pub mod bundle;
pub mod config;
pub mod feed;
pub mod outcome;
pub mod session;
pub mod source;

pub use bundle::DetectorBundle;
pub use config::{ProctoringConfig, SourceKind};
pub use feed::LiveFrame;
pub use outcome::{OutcomeHandle, SessionOutcome, SessionReport};
pub use session::{Proctor, SessionRequest};
pub use source::{ConfiguredSourceFactory, FrameSourceFactory};

use camera_capture::CameraError;
use face_gaze::GazeError;
use object_detection::DetectionError;
use thiserror::Error;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Face/gaze error: {0}")]
    Gaze(#[from] GazeError),

    #[error("Object detection error: {0}")]
    Detection(#[from] DetectionError),

    #[error("Frame worker failed: {0}")]
    Worker(String),
}

impl SessionError {
    /// Transient camera reads are retried before ending the session
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::Camera(e) if e.is_transient())
    }
}
