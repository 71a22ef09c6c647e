//! Frame source contract and scoped device acquisition

use tracing::{debug, info};

use crate::{CameraConfig, CameraError, VideoFrame};

/// A camera-like producer of frames.
///
/// `next_frame` may block, but never longer than the source's read timeout.
/// `close` must be idempotent.
pub trait FrameSource: Send {
    /// Source identifier for logs
    fn name(&self) -> &str;

    /// Acquire the underlying device
    fn open(&mut self) -> Result<(), CameraError>;

    /// Block until the next frame is available
    fn next_frame(&mut self) -> Result<VideoFrame, CameraError>;

    /// Release the underlying device
    fn close(&mut self);

    fn is_open(&self) -> bool;
}

/// Open camera with guaranteed release.
///
/// Frames read through the guard are normalized to the configured resolution.
/// The device is closed when the guard is dropped, whatever the exit path.
pub struct CameraGuard {
    source: Box<dyn FrameSource>,
    width: u32,
    height: u32,
}

impl CameraGuard {
    /// Open `source` and wrap it
    pub fn acquire(mut source: Box<dyn FrameSource>, config: &CameraConfig) -> Result<Self, CameraError> {
        source.open()?;
        info!(source = source.name(), "Camera acquired");
        Ok(Self {
            source,
            width: config.width,
            height: config.height,
        })
    }

    /// Read the next frame at canonical resolution
    pub fn next_frame(&mut self) -> Result<VideoFrame, CameraError> {
        let frame = self.source.next_frame()?;
        Ok(frame.normalized(self.width, self.height))
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }
}

impl Drop for CameraGuard {
    fn drop(&mut self) {
        if self.source.is_open() {
            debug!(source = self.source.name(), "Releasing camera");
        }
        self.source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntheticSource;

    #[test]
    fn test_guard_normalizes_and_releases() {
        let source = SyntheticSource::looping(vec![VideoFrame::solid(320, 240, [1, 2, 3])]);
        let released = source.release_flag();

        {
            let mut guard = CameraGuard::acquire(Box::new(source), &CameraConfig::default()).unwrap();
            let frame = guard.next_frame().unwrap();
            assert_eq!((frame.width, frame.height), (640, 480));
            assert!(!released.load(std::sync::atomic::Ordering::SeqCst));
        }

        assert!(released.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn test_open_failure_is_device_unavailable() {
        let source = SyntheticSource::unavailable();
        let err = CameraGuard::acquire(Box::new(source), &CameraConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, CameraError::DeviceUnavailable(_)));
    }
}
