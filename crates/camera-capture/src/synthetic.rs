//! Device-free frame sources
//!
//! `SyntheticSource` replays scripted frames; it backs headless deployments
//! and every session test. `ImageDirSource` replays still images from disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{CameraError, FrameSource, VideoFrame};

/// Scripted frame source
pub struct SyntheticSource {
    frames: Vec<VideoFrame>,
    cursor: usize,
    sequence: u32,
    open: bool,
    available: bool,
    /// Reads that fail transiently before frames flow
    transient_failures: u32,
    /// Reads after which every read fails
    fail_after: Option<u32>,
    released: Arc<AtomicBool>,
}

impl SyntheticSource {
    /// Cycle through `frames` forever
    pub fn looping(frames: Vec<VideoFrame>) -> Self {
        Self {
            frames,
            cursor: 0,
            sequence: 0,
            open: false,
            available: true,
            transient_failures: 0,
            fail_after: None,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Blank grey frames at canonical resolution
    pub fn blank() -> Self {
        Self::looping(vec![VideoFrame::solid(
            crate::CANONICAL_WIDTH,
            crate::CANONICAL_HEIGHT,
            [128, 128, 128],
        )])
    }

    /// A source whose device never responds
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::blank()
        }
    }

    /// Fail the first `count` reads with a transient error
    pub fn with_transient_failures(mut self, count: u32) -> Self {
        self.transient_failures = count;
        self
    }

    /// Fail every read after `frames` successful ones
    pub fn failing_after(mut self, frames: u32) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Flag set once the source has been closed
    pub fn release_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.released)
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn open(&mut self) -> Result<(), CameraError> {
        if !self.available || self.frames.is_empty() {
            return Err(CameraError::DeviceUnavailable("synthetic device offline".into()));
        }
        self.open = true;
        self.released.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<VideoFrame, CameraError> {
        if !self.open {
            return Err(CameraError::NotOpen);
        }
        if self.transient_failures > 0 {
            self.transient_failures -= 1;
            return Err(CameraError::Timeout(0));
        }
        if self.fail_after.is_some_and(|limit| self.sequence >= limit) {
            return Err(CameraError::FrameRead("synthetic stream ended".into()));
        }

        let mut frame = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        frame.sequence = self.sequence;
        self.sequence += 1;
        Ok(frame)
    }

    fn close(&mut self) {
        if self.open {
            debug!(frames = self.sequence, "Synthetic source closed");
        }
        self.open = false;
        self.released.store(true, Ordering::SeqCst);
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Replays PNG/JPEG stills from a directory in name order
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: usize,
    sequence: u32,
    open: bool,
}

impl ImageDirSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            files: Vec::new(),
            cursor: 0,
            sequence: 0,
            open: false,
        }
    }
}

impl FrameSource for ImageDirSource {
    fn name(&self) -> &str {
        "image-dir"
    }

    fn open(&mut self) -> Result<(), CameraError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| CameraError::DeviceUnavailable(format!("{}: {}", self.dir.display(), e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CameraError::DeviceUnavailable(format!(
                "no images in {}",
                self.dir.display()
            )));
        }

        info!(dir = %self.dir.display(), images = files.len(), "Image directory opened");
        self.files = files;
        self.cursor = 0;
        self.open = true;
        Ok(())
    }

    fn next_frame(&mut self) -> Result<VideoFrame, CameraError> {
        if !self.open {
            return Err(CameraError::NotOpen);
        }
        let path = &self.files[self.cursor];
        let img = image::open(path).map_err(|e| {
            warn!(path = %path.display(), "Failed to decode still: {}", e);
            CameraError::FrameRead(e.to_string())
        })?;
        self.cursor = (self.cursor + 1) % self.files.len();
        let frame = VideoFrame::from_rgb_image(img.to_rgb8(), 0, self.sequence);
        self.sequence += 1;
        Ok(frame)
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looping_sequence_numbers() {
        let mut source = SyntheticSource::looping(vec![
            VideoFrame::solid(4, 4, [0, 0, 0]),
            VideoFrame::solid(4, 4, [255, 255, 255]),
        ]);
        source.open().unwrap();
        let a = source.next_frame().unwrap();
        let b = source.next_frame().unwrap();
        let c = source.next_frame().unwrap();
        assert_eq!((a.sequence, b.sequence, c.sequence), (0, 1, 2));
        assert_eq!(a.data, c.data);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_read_before_open() {
        let mut source = SyntheticSource::blank();
        assert!(matches!(source.next_frame(), Err(CameraError::NotOpen)));
    }

    #[test]
    fn test_failure_injection() {
        let mut source = SyntheticSource::blank()
            .with_transient_failures(1)
            .failing_after(1);
        source.open().unwrap();
        assert!(matches!(source.next_frame(), Err(CameraError::Timeout(_))));
        assert!(source.next_frame().is_ok());
        assert!(matches!(source.next_frame(), Err(CameraError::FrameRead(_))));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut source = SyntheticSource::blank();
        let released = source.release_flag();
        source.open().unwrap();
        source.close();
        source.close();
        assert!(!source.is_open());
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_image_dir_replay() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::from_pixel(32, 24, image::Rgb([9, 8, 7]))
            .save(dir.path().join("a.png"))
            .unwrap();

        let mut source = ImageDirSource::new(dir.path());
        source.open().unwrap();
        let frame = source.next_frame().unwrap();
        assert_eq!((frame.width, frame.height), (32, 24));
        assert_eq!(frame.get_pixel(0, 0), Some([9, 8, 7]));
    }

    #[test]
    fn test_image_dir_empty_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = ImageDirSource::new(dir.path());
        assert!(matches!(source.open(), Err(CameraError::DeviceUnavailable(_))));
    }
}
