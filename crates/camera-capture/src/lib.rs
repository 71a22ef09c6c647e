//! Camera Capture Library for Exam Proctoring
//!
//! Provides the frame sources a proctoring session pulls from:
//! - Local webcam via V4L2 (feature `ingest-v4l2`)
//! - Still-image directories (replay / offline review)
//! - Scripted synthetic frames (headless deployments and tests)
//!
//! Every frame leaving a [`CameraGuard`] is normalized to the canonical
//! 640x480 resolution so downstream geometry is device independent.

pub mod frame;
pub mod geometry;
pub mod source;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use frame::VideoFrame;
pub use geometry::{non_max_suppression, BoundingBox};
pub use source::{CameraGuard, FrameSource};
pub use synthetic::{ImageDirSource, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical frame width after normalization
pub const CANONICAL_WIDTH: u32 = 640;
/// Canonical frame height after normalization
pub const CANONICAL_HEIGHT: u32 = 480;

/// Camera error types
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Frame read failed: {0}")]
    FrameRead(String),

    #[error("Invalid frame format: {0}")]
    Format(String),

    #[error("Capture timeout after {0}ms")]
    Timeout(u64),

    #[error("Camera not opened")]
    NotOpen,
}

impl CameraError {
    /// Whether a retry of the same read could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, CameraError::Timeout(_) | CameraError::FrameRead(_))
    }
}

/// Camera configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device index (0 => /dev/video0)
    pub index: u32,
    /// Output width after normalization
    pub width: u32,
    /// Output height after normalization
    pub height: u32,
    /// Requested device frame rate
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: CANONICAL_WIDTH,
            height: CANONICAL_HEIGHT,
            fps: 15,
        }
    }
}

impl CameraConfig {
    /// Device node path for this camera index
    pub fn device_path(&self) -> String {
        format!("/dev/video{}", self.index)
    }

    /// Frame read timeout, a few frame periods at the configured rate.
    pub fn read_timeout_ms(&self) -> u64 {
        let period = 1000 / u64::from(self.fps.max(1));
        (period * 4).max(250)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_path_from_index() {
        let config = CameraConfig {
            index: 2,
            ..Default::default()
        };
        assert_eq!(config.device_path(), "/dev/video2");
    }

    #[test]
    fn test_read_timeout_tracks_fps() {
        let slow = CameraConfig { fps: 2, ..Default::default() };
        let fast = CameraConfig { fps: 60, ..Default::default() };
        assert_eq!(slow.read_timeout_ms(), 2000);
        assert_eq!(fast.read_timeout_ms(), 250);
    }

    #[test]
    fn test_transient_errors() {
        assert!(CameraError::Timeout(100).is_transient());
        assert!(CameraError::FrameRead("eio".into()).is_transient());
        assert!(!CameraError::DeviceUnavailable("none".into()).is_transient());
    }
}
