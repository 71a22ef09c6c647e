//! Per-session frame source creation

use camera_capture::{CameraConfig, CameraError, FrameSource, ImageDirSource, SyntheticSource};
use tracing::debug;

use crate::SourceKind;

/// Creates the frame source for one session.
///
/// Keyed by subject so a deployment can route each remote candidate to their
/// own camera feed.
pub trait FrameSourceFactory: Send + Sync {
    fn create(&self, subject: &str) -> Result<Box<dyn FrameSource>, CameraError>;
}

impl<F> FrameSourceFactory for F
where
    F: Fn(&str) -> Result<Box<dyn FrameSource>, CameraError> + Send + Sync,
{
    fn create(&self, subject: &str) -> Result<Box<dyn FrameSource>, CameraError> {
        self(subject)
    }
}

/// Factory driven by [`SourceKind`]; every session gets the same kind of source
pub struct ConfiguredSourceFactory {
    kind: SourceKind,
    #[cfg_attr(not(feature = "ingest-v4l2"), allow(dead_code))]
    camera: CameraConfig,
}

impl ConfiguredSourceFactory {
    pub fn new(kind: SourceKind, camera: CameraConfig) -> Self {
        Self { kind, camera }
    }
}

impl FrameSourceFactory for ConfiguredSourceFactory {
    fn create(&self, subject: &str) -> Result<Box<dyn FrameSource>, CameraError> {
        debug!(subject, kind = ?self.kind, "Creating frame source");
        match &self.kind {
            SourceKind::Synthetic => Ok(Box::new(SyntheticSource::blank())),
            SourceKind::ImageDir { path } => Ok(Box::new(ImageDirSource::new(path))),
            #[cfg(feature = "ingest-v4l2")]
            SourceKind::V4l2 => Ok(Box::new(camera_capture::V4l2Source::new(self.camera.clone()))),
            #[cfg(not(feature = "ingest-v4l2"))]
            SourceKind::V4l2 => Err(CameraError::DeviceUnavailable(
                "built without ingest-v4l2 support".to_string(),
            )),
        }
    }
}
