//! Prohibited Item Detection
//!
//! Frame-level object detection for exam proctoring:
//! - SSD-style ONNX model on tract (DetectionOutput rows)
//! - Confidence filtering and greedy NMS
//! - COCO label vocabulary (1-based class ids)
//! - Prohibited-item policy and frame annotation

pub mod annotate;
pub mod config;
pub mod detector;
pub mod labels;
pub mod model;

pub use annotate::annotate_detections;
pub use config::DetectorConfig;
pub use detector::{Detection, ObjectDetector};
pub use labels::LabelMap;
pub use model::{EmptyObjectModel, ObjectModel, OnnxObjectModel, RawDetection};

use thiserror::Error;

/// Object detection error types
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Label vocabulary unavailable: {0}")]
    Labels(String),
}
