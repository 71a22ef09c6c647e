//! Object detector configuration

use serde::{Deserialize, Serialize};

/// Object detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Detections below this confidence are discarded
    pub confidence: f32,

    /// IoU above which overlapping detections are suppressed
    pub nms_iou: f32,

    /// Square model input side (pixels)
    pub input_size: u32,

    /// Label vocabulary file, one name per line
    pub labels_path: Option<String>,

    /// ONNX model path (DetectionOutput layout)
    pub model_path: Option<String>,

    /// Labels that count as prohibited items (case-insensitive)
    pub prohibited: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence: 0.5,
            nms_iou: 0.2,
            input_size: 320,
            labels_path: None,
            model_path: None,
            prohibited: vec!["cell phone".to_string(), "laptop".to_string()],
        }
    }
}

impl DetectorConfig {
    /// Lower confidence bar and a wider prohibited list
    pub fn strict() -> Self {
        Self {
            confidence: 0.4,
            prohibited: ["cell phone", "laptop", "book", "tv", "keyboard", "remote"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ..Default::default()
        }
    }

    /// Only confident phone sightings
    pub fn lenient() -> Self {
        Self {
            confidence: 0.65,
            prohibited: vec!["cell phone".to_string()],
            ..Default::default()
        }
    }
}
