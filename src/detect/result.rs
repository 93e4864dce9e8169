use serde::{Deserialize, Serialize};

use super::options::DetectOptions;

/// One detected box in frame pixel coordinates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub label: String,
    pub confidence: f32,
}

impl BoundingBox {
    /// Intersection-over-union with another box. Zero for degenerate boxes.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let area_a = (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0);
        let area_b = (other.x2 - other.x1).max(0.0) * (other.y2 - other.y1).max(0.0);
        let union = area_a + area_b - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Result of running detection on one frame.
///
/// An empty `boxes` vector is the canonical representation of "no objects
/// found"; there is no separate empty-result case anywhere downstream.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    pub boxes: Vec<BoundingBox>,
}

impl DetectionResult {
    pub fn new(boxes: Vec<BoundingBox>) -> Self {
        Self { boxes }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Apply the configured post-filters: confidence threshold, class
    /// filter, then greedy IoU duplicate suppression.
    pub fn filtered(mut self, options: &DetectOptions) -> Self {
        self.boxes.retain(|b| b.confidence >= options.confidence);
        if let Some(classes) = &options.classes {
            self.boxes.retain(|b| classes.iter().any(|c| c == &b.label));
        }
        suppress_overlaps(&mut self.boxes, options.iou);
        self
    }
}

/// Greedy non-maximum suppression: keep boxes in descending confidence
/// order, dropping any box whose IoU with an already kept box exceeds the
/// threshold.
pub fn suppress_overlaps(boxes: &mut Vec<BoundingBox>, iou_threshold: f32) {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut kept: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes.drain(..) {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    *boxes = kept;
}
