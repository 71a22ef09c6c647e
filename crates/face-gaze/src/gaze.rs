//! Gaze direction estimation with last-known geometry carry-over

use std::sync::Arc;

use camera_capture::{BoundingBox, VideoFrame};
use image::{imageops, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{locate_pupil, EyeDetector, EyePair, GazeConfig, PupilParams};

/// Where the subject is looking, from the camera's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazeDirection {
    Center,
    Left,
    Right,
    /// Face present but no eye region resolved
    Blinking,
    #[default]
    Unknown,
}

impl GazeDirection {
    pub fn is_off_screen(&self) -> bool {
        matches!(self, GazeDirection::Left | GazeDirection::Right)
    }
}

/// Gaze estimate for the latest frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GazeState {
    pub direction: GazeDirection,
    /// Pupil centers in frame coordinates, last known when not found now
    pub left_pupil: Option<(u32, u32)>,
    pub right_pupil: Option<(u32, u32)>,
    /// Averaged, calibrated horizontal ratio when a pupil was found
    pub horizontal_ratio: Option<f32>,
}

/// Per-session gaze estimator.
///
/// Holds the last face box and pupil positions so overlays stay stable
/// across frames where the face or eyes drop out.
pub struct GazeEstimator {
    config: GazeConfig,
    params: PupilParams,
    eyes: Arc<dyn EyeDetector>,
    last_face: Option<BoundingBox>,
    state: GazeState,
}

impl GazeEstimator {
    pub fn new(config: GazeConfig, eyes: Arc<dyn EyeDetector>) -> Self {
        let params = PupilParams::from(&config);
        Self {
            config,
            params,
            eyes,
            last_face: None,
            state: GazeState::default(),
        }
    }

    pub fn state(&self) -> GazeState {
        self.state
    }

    pub fn last_face(&self) -> Option<BoundingBox> {
        self.last_face
    }

    /// Recompute gaze for `frame` given the located face, if any
    pub fn refresh(&mut self, frame: &VideoFrame, face: Option<&BoundingBox>) -> GazeState {
        let face = match face.and_then(|f| f.clamp_to(frame.width, frame.height)) {
            Some(face) => face,
            None => {
                self.state.direction = GazeDirection::Unknown;
                self.state.horizontal_ratio = None;
                return self.state;
            }
        };
        self.last_face = Some(face);

        let gray = frame.to_grayscale();
        let face_img = crop(&gray, &face);
        let pair = EyePair::split(&self.eyes.detect(&face_img), face.width, self.config.midline);

        if pair.is_empty() {
            self.state.direction = GazeDirection::Blinking;
            self.state.horizontal_ratio = None;
            return self.state;
        }

        let mut ratios = Vec::with_capacity(2);
        if let Some(eye) = pair.left {
            if let Some((pupil, ratio)) = self.measure(&face_img, &face, &eye) {
                self.state.left_pupil = Some(pupil);
                ratios.push(ratio);
            }
        }
        if let Some(eye) = pair.right {
            if let Some((pupil, ratio)) = self.measure(&face_img, &face, &eye) {
                self.state.right_pupil = Some(pupil);
                ratios.push(ratio);
            }
        }

        if ratios.is_empty() {
            self.state.direction = GazeDirection::Unknown;
            self.state.horizontal_ratio = None;
            return self.state;
        }

        let ratio =
            ratios.iter().sum::<f32>() / ratios.len() as f32 + self.config.calibration_offset;
        self.state.direction = self.classify(ratio);
        self.state.horizontal_ratio = Some(ratio);
        trace!(ratio, direction = ?self.state.direction, "Gaze refreshed");
        self.state
    }

    /// Pupil position in frame coordinates and its horizontal ratio
    fn measure(
        &self,
        face_img: &GrayImage,
        face: &BoundingBox,
        eye: &BoundingBox,
    ) -> Option<((u32, u32), f32)> {
        let eye = eye.clamp_to(face.width, face.height)?;
        let (px, py) = locate_pupil(&crop(face_img, &eye), &self.params)?;
        let span = eye.width.saturating_sub(self.config.ratio_margin).max(1) as f32;
        let abs = face.offset(&eye);
        Some(((abs.x + px as u32, abs.y + py as u32), px / span))
    }

    fn classify(&self, ratio: f32) -> GazeDirection {
        if ratio <= self.config.right_cut {
            GazeDirection::Right
        } else if ratio >= self.config.left_cut {
            GazeDirection::Left
        } else {
            GazeDirection::Center
        }
    }

    /// Draw the last known face box and pupils
    pub fn annotate(&self, image: &mut RgbImage) {
        if let Some(face) = self.last_face {
            draw_hollow_rect_mut(
                image,
                Rect::at(face.x as i32, face.y as i32).of_size(face.width, face.height),
                Rgb([255, 255, 0]),
            );
        }
        for (x, y) in [self.state.left_pupil, self.state.right_pupil].into_iter().flatten() {
            draw_cross_mut(image, Rgb([0, 255, 0]), x as i32, y as i32);
        }
    }
}

fn crop(image: &GrayImage, bbox: &BoundingBox) -> GrayImage {
    imageops::crop_imm(image, bbox.x, bbox.y, bbox.width, bbox.height).to_image()
}
