//! Bounding box geometry shared by the face and object detectors

use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates of the frame it came from.
///
/// Width and height are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Create a box, `None` if it would be empty
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Build from floating point corners, clamped to the frame.
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32, frame_w: u32, frame_h: u32) -> Option<Self> {
        if !(x1.is_finite() && y1.is_finite() && x2.is_finite() && y2.is_finite()) {
            return None;
        }
        let clamp = |v: f32, max: u32| v.round().clamp(0.0, max as f32) as u32;
        let left = clamp(x1.min(x2), frame_w);
        let top = clamp(y1.min(y2), frame_h);
        let right = clamp(x1.max(x2), frame_w);
        let bottom = clamp(y1.max(y2), frame_h);
        Self::new(left, top, right.saturating_sub(left), bottom.saturating_sub(top))
    }

    /// Clip the box to a `frame_w` x `frame_h` frame
    pub fn clamp_to(&self, frame_w: u32, frame_h: u32) -> Option<Self> {
        let x = self.x.min(frame_w);
        let y = self.y.min(frame_h);
        let right = self.right().min(frame_w);
        let bottom = self.bottom().min(frame_h);
        Self::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }

    /// True when the box lies entirely inside the frame
    pub fn fits_within(&self, frame_w: u32, frame_h: u32) -> bool {
        self.right() <= frame_w && self.bottom() <= frame_h
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Horizontal center in pixels
    pub fn center_x(&self) -> f32 {
        self.x as f32 + self.width as f32 / 2.0
    }

    /// Translate a box expressed relative to this box into frame coordinates
    pub fn offset(&self, inner: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x: self.x + inner.x,
            y: self.y + inner.y,
            width: inner.width,
            height: inner.height,
        }
    }

    /// Intersection over union
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return 0.0;
        }
        let inter = u64::from(right - left) * u64::from(bottom - top);
        let union = self.area() + other.area() - inter;
        inter as f32 / union as f32
    }
}

/// Greedy non-maximum suppression.
///
/// Returns indices into `candidates` of the boxes kept, highest score first.
/// Equal scores keep their input order.
pub fn non_max_suppression(candidates: &[(BoundingBox, f32)], iou_threshold: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .1
            .partial_cmp(&candidates[a].1)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<usize> = Vec::new();
    for idx in order {
        let bbox = &candidates[idx].0;
        if kept
            .iter()
            .all(|&k| candidates[k].0.iou(bbox) <= iou_threshold)
        {
            kept.push(idx);
        }
    }
    kept
}
