//! Eye region isolation inside a face crop

use camera_capture::BoundingBox;
use image::GrayImage;

/// Eye region detection capability.
///
/// Boxes are relative to the face crop handed in.
pub trait EyeDetector: Send + Sync {
    fn detect(&self, face: &GrayImage) -> Vec<BoundingBox>;
}

/// Eye regions split by side of the face midline (image left / image right)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EyePair {
    pub left: Option<BoundingBox>,
    pub right: Option<BoundingBox>,
}

impl EyePair {
    /// Assign detected eyes to a side by their center against `midline`
    /// (fraction of face width). A later eye on the same side replaces an
    /// earlier one.
    pub fn split(eyes: &[BoundingBox], face_width: u32, midline: f32) -> Self {
        let cut = face_width as f32 * midline;
        let mut pair = EyePair::default();
        for eye in eyes {
            if eye.center_x() < cut {
                pair.left = Some(*eye);
            } else {
                pair.right = Some(*eye);
            }
        }
        pair
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Anthropometric eye regions, kept only when they show eye-like contrast.
///
/// An open eye (dark iris on light sclera) has high luminance spread; a
/// closed lid or an occluded region is close to uniform.
pub struct ProportionalEyeDetector {
    min_contrast: f32,
}

impl ProportionalEyeDetector {
    /// Vertical band of the face holding the eyes
    const TOP: f32 = 0.2;
    const BOTTOM: f32 = 0.55;
    /// Horizontal extents of each eye region
    const LEFT_SPAN: (f32, f32) = (0.12, 0.45);
    const RIGHT_SPAN: (f32, f32) = (0.55, 0.88);

    pub fn new(min_contrast: f32) -> Self {
        Self { min_contrast }
    }

    fn region(face_w: u32, face_h: u32, span: (f32, f32)) -> Option<BoundingBox> {
        let x = (face_w as f32 * span.0) as u32;
        let y = (face_h as f32 * Self::TOP) as u32;
        let w = (face_w as f32 * (span.1 - span.0)) as u32;
        let h = (face_h as f32 * (Self::BOTTOM - Self::TOP)) as u32;
        BoundingBox::new(x, y, w, h)
    }

    fn contrast(face: &GrayImage, region: &BoundingBox) -> f32 {
        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for y in region.y..region.bottom() {
            for x in region.x..region.right() {
                let v = face.get_pixel(x, y).0[0] as f64;
                sum += v;
                sum_sq += v * v;
            }
        }
        let n = region.area() as f64;
        let mean = sum / n;
        ((sum_sq / n - mean * mean).max(0.0)).sqrt() as f32
    }
}

impl EyeDetector for ProportionalEyeDetector {
    fn detect(&self, face: &GrayImage) -> Vec<BoundingBox> {
        let (w, h) = face.dimensions();
        [Self::LEFT_SPAN, Self::RIGHT_SPAN]
            .into_iter()
            .filter_map(|span| Self::region(w, h, span))
            .filter(|region| region.fits_within(w, h))
            .filter(|region| Self::contrast(face, region) >= self.min_contrast)
            .collect()
    }
}
