//! Thresholding, suppression and labelling over an object model

use std::sync::Arc;

use camera_capture::{non_max_suppression, BoundingBox, VideoFrame};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{DetectionError, DetectorConfig, EmptyObjectModel, LabelMap, ObjectModel, OnnxObjectModel};

/// Labelled detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Object detector
pub struct ObjectDetector {
    model: Arc<dyn ObjectModel>,
    labels: LabelMap,
    confidence_threshold: f32,
    nms_iou: f32,
    prohibited: Vec<String>,
}

impl ObjectDetector {
    pub fn new(model: Arc<dyn ObjectModel>, labels: LabelMap, config: &DetectorConfig) -> Self {
        Self {
            model,
            labels,
            confidence_threshold: config.confidence,
            nms_iou: config.nms_iou,
            prohibited: config.prohibited.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Load labels and weights named by `config`
    pub fn from_config(config: &DetectorConfig) -> Result<Self, DetectionError> {
        let labels = match &config.labels_path {
            Some(path) => LabelMap::load(path)?,
            None => LabelMap::coco(),
        };

        let model: Arc<dyn ObjectModel> = match &config.model_path {
            Some(path) => {
                info!("Loading object detection model from {}", path);
                Arc::new(OnnxObjectModel::load(path, config.input_size)?)
            }
            None => {
                warn!("No object model path configured. Prohibited item detection disabled.");
                Arc::new(EmptyObjectModel)
            }
        };

        Ok(Self::new(model, labels, config))
    }

    /// Detections at or above the confidence threshold after NMS, highest
    /// confidence first
    pub fn detect(&self, frame: &VideoFrame) -> Result<Vec<Detection>, DetectionError> {
        let raw: Vec<_> = self
            .model
            .detect(frame)?
            .into_iter()
            .filter(|d| d.confidence >= self.confidence_threshold)
            .collect();

        let candidates: Vec<(BoundingBox, f32)> =
            raw.iter().map(|d| (d.bbox, d.confidence)).collect();

        let detections: Vec<Detection> = non_max_suppression(&candidates, self.nms_iou)
            .into_iter()
            .map(|i| {
                let d = &raw[i];
                Detection {
                    label: self
                        .labels
                        .name(d.class_id)
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("class {}", d.class_id)),
                    confidence: d.confidence,
                    bbox: d.bbox,
                }
            })
            .collect();

        debug!(
            raw = raw.len(),
            kept = detections.len(),
            model = self.model.name(),
            "Object detection"
        );
        Ok(detections)
    }

    pub fn is_prohibited(&self, detection: &Detection) -> bool {
        let label = detection.label.to_lowercase();
        self.prohibited.iter().any(|p| *p == label)
    }

    /// True if any detection is a prohibited item
    pub fn any_prohibited(&self, detections: &[Detection]) -> bool {
        detections.iter().any(|d| self.is_prohibited(d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RawDetection;
    use proptest::prelude::*;

    struct ScriptedModel(Vec<RawDetection>);

    impl ObjectModel for ScriptedModel {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn detect(&self, _frame: &VideoFrame) -> Result<Vec<RawDetection>, DetectionError> {
            Ok(self.0.clone())
        }
    }

    fn raw(class_id: u32, confidence: f32, x: u32) -> RawDetection {
        RawDetection {
            class_id,
            confidence,
            bbox: BoundingBox::new(x, 100, 100, 100).unwrap(),
        }
    }

    fn detector(raws: Vec<RawDetection>) -> ObjectDetector {
        ObjectDetector::new(
            Arc::new(ScriptedModel(raws)),
            LabelMap::coco(),
            &DetectorConfig::default(),
        )
    }

    fn frame() -> VideoFrame {
        VideoFrame::solid(640, 480, [0, 0, 0])
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let dets = detector(vec![raw(77, 0.5, 0), raw(73, 0.49, 300)])
            .detect(&frame())
            .unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, "cell phone");
    }

    #[test]
    fn test_nms_suppresses_overlap() {
        // IoU of boxes offset by 30px is 70/130 > 0.2
        let dets = detector(vec![raw(1, 0.7, 0), raw(1, 0.9, 30), raw(73, 0.8, 400)])
            .detect(&frame())
            .unwrap();
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].bbox.x, 30);
        assert_eq!(dets[1].label, "laptop");
    }

    #[test]
    fn test_prohibited_labels() {
        let detector = detector(vec![raw(77, 0.9, 0), raw(1, 0.9, 300)]);
        let dets = detector.detect(&frame()).unwrap();
        assert!(detector.any_prohibited(&dets));
        let person: Vec<_> = dets.iter().filter(|d| d.label == "person").cloned().collect();
        assert!(!detector.any_prohibited(&person));
    }

    #[test]
    fn test_prohibited_case_insensitive() {
        let config = DetectorConfig {
            prohibited: vec!["CELL PHONE".to_string()],
            ..Default::default()
        };
        let detector = ObjectDetector::new(
            Arc::new(ScriptedModel(vec![raw(77, 0.9, 0)])),
            LabelMap::coco(),
            &config,
        );
        let dets = detector.detect(&frame()).unwrap();
        assert!(detector.is_prohibited(&dets[0]));
    }

    #[test]
    fn test_unknown_class_labelled_by_id() {
        let dets = detector(vec![raw(200, 0.9, 0)]).detect(&frame()).unwrap();
        assert_eq!(dets[0].label, "class 200");
    }

    #[test]
    fn test_no_model_configured() {
        let detector = ObjectDetector::from_config(&DetectorConfig::default()).unwrap();
        assert!(detector.detect(&frame()).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_kept_boxes_do_not_overlap(
            xs in proptest::collection::vec((0u32..500, 0.5f32..1.0), 0..12)
        ) {
            let raws = xs.iter().map(|&(x, c)| raw(1, c, x)).collect();
            let dets = detector(raws).detect(&frame()).unwrap();
            for (i, a) in dets.iter().enumerate() {
                for b in &dets[i + 1..] {
                    prop_assert!(a.bbox.iou(&b.bbox) <= 0.2);
                }
                prop_assert!(a.confidence >= 0.5);
            }
        }
    }
}
