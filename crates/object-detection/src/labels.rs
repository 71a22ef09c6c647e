//! Class vocabulary

use std::path::Path;

use tracing::info;

use crate::DetectionError;

/// COCO vocabulary in the 91-slot layout used by the TF object detection zoo
const COCO_91: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "street sign", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe",
    "hat", "backpack", "umbrella", "shoe", "eye glasses", "handbag", "tie", "suitcase",
    "frisbee", "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "plate", "wine glass", "cup", "fork",
    "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange", "broccoli", "carrot",
    "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant", "bed", "mirror",
    "dining table", "window", "desk", "toilet", "door", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "blender", "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
    "hair brush",
];

/// Class id to name lookup. Class ids are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    names: Vec<String>,
}

impl LabelMap {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Built-in COCO vocabulary
    pub fn coco() -> Self {
        Self::new(COCO_91.iter().map(|s| s.to_string()).collect())
    }

    /// Parse a `coco.names` style file: one label per line, trailing
    /// newlines ignored
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.trim_end_matches(&['\n', '\r'][..])
                .lines()
                .map(|l| l.trim_end_matches('\r').to_string())
                .collect(),
        )
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DetectionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DetectionError::Labels(format!("{}: {}", path.display(), e)))?;
        let labels = Self::parse(&text);
        if labels.is_empty() {
            return Err(DetectionError::Labels(format!("{}: empty", path.display())));
        }
        info!(count = labels.len(), "Loaded label vocabulary from {}", path.display());
        Ok(labels)
    }

    /// Name for a 1-based class id
    pub fn name(&self, class_id: u32) -> Option<&str> {
        let idx = (class_id as usize).checked_sub(1)?;
        self.names.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for LabelMap {
    fn default() -> Self {
        Self::coco()
    }
}
