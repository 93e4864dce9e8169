use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, DetectionResult};
use crate::error::PipelineError;
use crate::frame::Frame;

/// Stub backend for tests and demos. Returns one fixed box per frame,
/// centered in the frame, labeled `person`.
pub struct StubBackend {
    confidence: f32,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { confidence: 0.85 }
    }

    /// Override the reported confidence (useful for threshold tests).
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&self, frame: &Frame) -> Result<DetectionResult, PipelineError> {
        let w = frame.width() as f32;
        let h = frame.height() as f32;
        Ok(DetectionResult::new(vec![BoundingBox {
            x1: w * 0.25,
            y1: h * 0.25,
            x2: w * 0.75,
            y2: h * 0.75,
            label: "person".to_string(),
            confidence: self.confidence,
        }]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_returns_one_centered_box() {
        let backend = StubBackend::new();
        let frame = Frame::new(vec![0u8; 8 * 8 * 3], 8, 8, 1);
        let result = backend.detect(&frame).unwrap();
        assert_eq!(result.boxes.len(), 1);
        assert_eq!(result.boxes[0].label, "person");
        assert_eq!(result.boxes[0].x1, 2.0);
        assert_eq!(result.boxes[0].x2, 6.0);
    }
}
