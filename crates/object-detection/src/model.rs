//! Object detection models

use camera_capture::{BoundingBox, VideoFrame};
use image::imageops;
use tract_onnx::prelude::*;
use tracing::error;

use crate::DetectionError;

/// Model output before thresholding and suppression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    /// 1-based class id
    pub class_id: u32,
    pub confidence: f32,
    /// Box in frame coordinates
    pub bbox: BoundingBox,
}

/// Object detection capability.
///
/// Shared across sessions once loaded, hence `Send + Sync`.
pub trait ObjectModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, frame: &VideoFrame) -> Result<Vec<RawDetection>, DetectionError>;
}

/// Model that never detects anything, used when no weights are configured
pub struct EmptyObjectModel;

impl ObjectModel for EmptyObjectModel {
    fn name(&self) -> &'static str {
        "empty"
    }

    fn detect(&self, _frame: &VideoFrame) -> Result<Vec<RawDetection>, DetectionError> {
        Ok(Vec::new())
    }
}

type Runner = Box<dyn Fn(TVec<TValue>) -> TractResult<TVec<TValue>> + Send + Sync>;

/// SSD-MobileNet style detector on tract.
///
/// Input `1x3xSxS` RGB scaled as `(p - 127.5) / 127.5`. The single output
/// holds DetectionOutput rows of 7 values
/// `[batch, class_id, confidence, x1, y1, x2, y2]` with normalized corners.
pub struct OnnxObjectModel {
    runner: Runner,
    input_size: u32,
}

impl OnnxObjectModel {
    const MEAN: f32 = 127.5;
    const SCALE: f32 = 1.0 / 127.5;

    pub fn load(path: &str, input_size: u32) -> Result<Self, DetectionError> {
        let side = input_size as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, side, side]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| {
                error!("Failed to load object model: {}", e);
                DetectionError::ModelLoad(format!("{}: {}", path, e))
            })?;

        Ok(Self {
            runner: Box::new(move |inputs| plan.run(inputs)),
            input_size,
        })
    }

    fn input_tensor(&self, frame: &VideoFrame) -> Tensor {
        let side = self.input_size;
        let resized = imageops::resize(
            &frame.to_rgb_image(),
            side,
            side,
            imageops::FilterType::Triangle,
        );
        let side = side as usize;
        tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            (resized.get_pixel(x as u32, y as u32)[c] as f32 - Self::MEAN) * Self::SCALE
        })
        .into()
    }
}

impl ObjectModel for OnnxObjectModel {
    fn name(&self) -> &'static str {
        "ssd-onnx"
    }

    fn detect(&self, frame: &VideoFrame) -> Result<Vec<RawDetection>, DetectionError> {
        let input = self.input_tensor(frame);
        let outputs = (self.runner)(tvec!(input.into()))
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let rows = outputs
            .first()
            .ok_or_else(|| DetectionError::Inference("model produced no output".to_string()))?
            .as_slice::<f32>()
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        Ok(decode_detection_output(rows, frame.width, frame.height))
    }
}

/// Decode DetectionOutput rows into frame-space detections.
///
/// Rows with a negative batch index mark the end of valid output.
pub fn decode_detection_output(rows: &[f32], frame_w: u32, frame_h: u32) -> Vec<RawDetection> {
    let (w, h) = (frame_w as f32, frame_h as f32);
    rows.chunks_exact(7)
        .take_while(|row| row[0] >= 0.0)
        .filter(|row| row[1] >= 1.0)
        .filter_map(|row| {
            BoundingBox::from_corners(row[3] * w, row[4] * h, row[5] * w, row[6] * h, frame_w, frame_h)
                .map(|bbox| RawDetection {
                    class_id: row[1] as u32,
                    confidence: row[2],
                    bbox,
                })
        })
        .collect()
}
