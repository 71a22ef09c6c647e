//! Video frame types and processing

use image::{imageops, GrayImage, RgbImage};

use crate::{BoundingBox, CameraError};

/// Decoded RGB video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (nanoseconds)
    pub timestamp_ns: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ns: u64,
        sequence: u32,
    ) -> Result<Self, CameraError> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || data.len() != expected {
            return Err(CameraError::Format(format!(
                "expected {}x{}x3 = {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp_ns,
            sequence,
        })
    }

    /// Frame filled with a single colour
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self {
            data,
            width,
            height,
            timestamp_ns: 0,
            sequence: 0,
        }
    }

    /// Wrap an `image` RGB buffer
    pub fn from_rgb_image(img: RgbImage, timestamp_ns: u64, sequence: u32) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            timestamp_ns,
            sequence,
        }
    }

    /// Copy into an `image` RGB buffer
    pub fn to_rgb_image(&self) -> RgbImage {
        // Length is validated at construction
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    /// Decode a JPEG/MJPEG payload
    pub fn decode_jpeg(bytes: &[u8], timestamp_ns: u64, sequence: u32) -> Result<Self, CameraError> {
        let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Jpeg)
            .map_err(|e| CameraError::Format(e.to_string()))?;
        Ok(Self::from_rgb_image(img.to_rgb8(), timestamp_ns, sequence))
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Convert to grayscale
    pub fn to_grayscale(&self) -> GrayImage {
        let mut gray = GrayImage::new(self.width, self.height);
        for (pixel, out) in self.data.chunks_exact(3).zip(gray.pixels_mut()) {
            // Luminance formula: 0.299*R + 0.587*G + 0.114*B
            let y = pixel[0] as f32 * 0.299 + pixel[1] as f32 * 0.587 + pixel[2] as f32 * 0.114;
            out.0[0] = y as u8;
        }
        gray
    }

    /// Crop a region of the frame
    pub fn crop(&self, bbox: &BoundingBox) -> Option<VideoFrame> {
        if !bbox.fits_within(self.width, self.height) {
            return None;
        }

        let mut cropped = Vec::with_capacity((bbox.width * bbox.height * 3) as usize);
        for row in bbox.y..(bbox.y + bbox.height) {
            let start = ((row * self.width + bbox.x) * 3) as usize;
            let end = start + (bbox.width * 3) as usize;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Some(VideoFrame {
            data: cropped,
            width: bbox.width,
            height: bbox.height,
            timestamp_ns: self.timestamp_ns,
            sequence: self.sequence,
        })
    }

    /// Resize frame using bilinear interpolation
    pub fn resize(&self, new_width: u32, new_height: u32) -> VideoFrame {
        let resized = imageops::resize(
            &self.to_rgb_image(),
            new_width,
            new_height,
            imageops::FilterType::Triangle,
        );
        VideoFrame::from_rgb_image(resized, self.timestamp_ns, self.sequence)
    }

    /// Resize to the given resolution unless already there
    pub fn normalized(self, width: u32, height: u32) -> VideoFrame {
        if self.width == width && self.height == height {
            self
        } else {
            self.resize(width, height)
        }
    }
}
