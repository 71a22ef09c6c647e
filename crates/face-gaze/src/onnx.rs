//! ONNX face detector (UltraFace RFB-320 layout) on tract

use camera_capture::{non_max_suppression, BoundingBox, VideoFrame};
use image::imageops;
use tract_onnx::prelude::*;
use tracing::error;

use crate::{FaceCandidate, FaceModel, GazeError};

const INPUT_WIDTH: usize = 320;
const INPUT_HEIGHT: usize = 240;

type Runner = Box<dyn Fn(TVec<TValue>) -> TractResult<TVec<TValue>> + Send + Sync>;

/// UltraFace-style detector.
///
/// Input `1x3x240x320` RGB, `(p - 127) / 128`. Outputs `scores [1,N,2]`
/// (background, face) and `boxes [1,N,4]` as normalized corners.
pub struct OnnxFaceModel {
    runner: Runner,
    confidence_threshold: f32,
    nms_iou: f32,
}

impl OnnxFaceModel {
    pub fn load(path: &str, confidence_threshold: f32, nms_iou: f32) -> Result<Self, GazeError> {
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| {
                m.with_input_fact(
                    0,
                    f32::fact([1, 3, INPUT_HEIGHT, INPUT_WIDTH]).into(),
                )
            })
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| {
                error!("Failed to load face model: {}", e);
                GazeError::ModelLoad(format!("{}: {}", path, e))
            })?;

        Ok(Self {
            runner: Box::new(move |inputs| plan.run(inputs)),
            confidence_threshold,
            nms_iou,
        })
    }

    fn input_tensor(frame: &VideoFrame) -> Tensor {
        let resized = imageops::resize(
            &frame.to_rgb_image(),
            INPUT_WIDTH as u32,
            INPUT_HEIGHT as u32,
            imageops::FilterType::Triangle,
        );
        tract_ndarray::Array4::from_shape_fn((1, 3, INPUT_HEIGHT, INPUT_WIDTH), |(_, c, y, x)| {
            (resized.get_pixel(x as u32, y as u32)[c] as f32 - 127.0) / 128.0
        })
        .into()
    }
}

impl FaceModel for OnnxFaceModel {
    fn name(&self) -> &'static str {
        "ultraface-onnx"
    }

    fn detect(&self, frame: &VideoFrame) -> Result<Vec<FaceCandidate>, GazeError> {
        let input = Self::input_tensor(frame);
        let outputs = (self.runner)(tvec!(input.into()))
            .map_err(|e| GazeError::Inference(e.to_string()))?;

        if outputs.len() < 2 {
            return Err(GazeError::Inference(format!(
                "expected scores and boxes outputs, got {}",
                outputs.len()
            )));
        }
        let scores = outputs[0]
            .as_slice::<f32>()
            .map_err(|e| GazeError::Inference(e.to_string()))?;
        let boxes = outputs[1]
            .as_slice::<f32>()
            .map_err(|e| GazeError::Inference(e.to_string()))?;

        Ok(decode_ultraface(
            scores,
            boxes,
            frame.width,
            frame.height,
            self.confidence_threshold,
            self.nms_iou,
        ))
    }
}

/// Threshold, scale and de-duplicate raw UltraFace outputs
fn decode_ultraface(
    scores: &[f32],
    boxes: &[f32],
    frame_w: u32,
    frame_h: u32,
    confidence_threshold: f32,
    nms_iou: f32,
) -> Vec<FaceCandidate> {
    let (w, h) = (frame_w as f32, frame_h as f32);
    let candidates: Vec<(BoundingBox, f32)> = scores
        .chunks_exact(2)
        .zip(boxes.chunks_exact(4))
        .filter(|(score, _)| score[1] >= confidence_threshold)
        .filter_map(|(score, corners)| {
            BoundingBox::from_corners(
                corners[0] * w,
                corners[1] * h,
                corners[2] * w,
                corners[3] * h,
                frame_w,
                frame_h,
            )
            .map(|bbox| (bbox, score[1]))
        })
        .collect();

    non_max_suppression(&candidates, nms_iou)
        .into_iter()
        .map(|i| FaceCandidate {
            bbox: candidates[i].0,
            confidence: candidates[i].1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_filters_and_scales() {
        let scores = [0.9, 0.1, 0.05, 0.95, 0.1, 0.9];
        let boxes = [
            0.0, 0.0, 0.1, 0.1, // below threshold
            0.25, 0.25, 0.5, 0.75, // face
            0.26, 0.25, 0.5, 0.75, // duplicate of the face
        ];
        let faces = decode_ultraface(&scores, &boxes, 640, 480, 0.7, 0.3);
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bbox, BoundingBox::new(160, 120, 160, 240).unwrap());
        assert!((faces[0].confidence - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_missing_model_is_load_error() {
        let err = OnnxFaceModel::load("/nonexistent/face.onnx", 0.7, 0.3).err().unwrap();
        assert!(matches!(err, GazeError::ModelLoad(_)));
    }
}
