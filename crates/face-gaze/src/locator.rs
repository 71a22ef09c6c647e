//! Face location policy over an opaque face model

use std::sync::Arc;

use camera_capture::{BoundingBox, VideoFrame};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{FaceMode, GazeError, LocatorConfig, OnnxFaceModel};

/// Raw face candidate as produced by a model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceCandidate {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Face detection capability.
///
/// Implementations are stateless after construction and shared across
/// sessions, hence `Send + Sync`.
pub trait FaceModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidates in detector order, boxes in frame coordinates
    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceCandidate>, GazeError>;
}

/// Fixed-geometry fallback used when no face model is configured.
///
/// Assumes a seated subject centered in front of the camera.
pub struct FixedFaceModel;

impl FaceModel for FixedFaceModel {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceCandidate>, GazeError> {
        let bbox = BoundingBox::new(
            (frame.width as f32 * 0.3) as u32,
            (frame.height as f32 * 0.2) as u32,
            (frame.width as f32 * 0.4).max(1.0) as u32,
            (frame.height as f32 * 0.5).max(1.0) as u32,
        );
        Ok(bbox
            .map(|bbox| FaceCandidate { bbox, confidence: 0.95 })
            .into_iter()
            .collect())
    }
}

/// Faces found in one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaceScan {
    /// All faces, highest confidence first
    pub faces: Vec<BoundingBox>,
    /// Tallest face, first encountered on ties
    pub primary: Option<BoundingBox>,
}

impl FaceScan {
    pub fn count(&self) -> usize {
        self.faces.len()
    }

    /// Faces a locator in `mode` reports: every face, or only the primary
    pub fn located(&self, mode: FaceMode) -> Vec<BoundingBox> {
        match mode {
            FaceMode::All => self.faces.clone(),
            FaceMode::Largest => self.primary.into_iter().collect(),
        }
    }
}

/// Face locator
pub struct FaceLocator {
    model: Arc<dyn FaceModel>,
    mode: FaceMode,
}

impl FaceLocator {
    pub fn new(model: Arc<dyn FaceModel>, mode: FaceMode) -> Self {
        Self { model, mode }
    }

    /// Build from configuration, loading the ONNX model when a path is set
    pub fn from_config(config: &LocatorConfig) -> Result<Self, GazeError> {
        let model: Arc<dyn FaceModel> = match &config.model_path {
            Some(path) => {
                info!("Loading face detection model from {}", path);
                Arc::new(OnnxFaceModel::load(path, config.confidence, config.nms_iou)?)
            }
            None => {
                warn!("No face model path configured. Using fixed-geometry fallback.");
                Arc::new(FixedFaceModel)
            }
        };
        Ok(Self::new(model, config.mode))
    }

    pub fn mode(&self) -> FaceMode {
        self.mode
    }

    /// Faces in `frame` according to the locator's mode.
    ///
    /// No face is a normal outcome and yields an empty vec.
    pub fn locate(&self, frame: &VideoFrame) -> Result<Vec<BoundingBox>, GazeError> {
        Ok(self.scan(frame)?.located(self.mode))
    }

    /// Run the model once and derive both the full list and the primary face
    pub fn scan(&self, frame: &VideoFrame) -> Result<FaceScan, GazeError> {
        let candidates: Vec<FaceCandidate> = self
            .model
            .detect(frame)?
            .into_iter()
            .filter_map(|c| {
                c.bbox
                    .clamp_to(frame.width, frame.height)
                    .map(|bbox| FaceCandidate { bbox, ..c })
            })
            .collect();

        let primary = select_largest(&candidates);

        let mut ranked = candidates;
        ranked.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        debug!(faces = ranked.len(), model = self.model.name(), "Face scan");
        Ok(FaceScan {
            faces: ranked.into_iter().map(|c| c.bbox).collect(),
            primary,
        })
    }
}

/// Tallest candidate; ties keep the first encountered
pub fn select_largest(candidates: &[FaceCandidate]) -> Option<BoundingBox> {
    let mut best: Option<&FaceCandidate> = None;
    for candidate in candidates {
        if best.map_or(true, |b| candidate.bbox.height > b.bbox.height) {
            best = Some(candidate);
        }
    }
    best.map(|c| c.bbox)
}
