use serde::Deserialize;

/// Detection post-processing options.
///
/// Defaults match the upstream detector's conventional values: confidence
/// 0.25, IoU 0.7, 640px model input.
#[derive(Clone, Debug, Deserialize)]
pub struct DetectOptions {
    /// Minimum confidence for a box to be reported.
    pub confidence: f32,
    /// IoU threshold for duplicate-box suppression.
    pub iou: f32,
    /// Square model input size; frames are resized before inference.
    pub image_size: u32,
    /// Restrict reported classes to these labels. `None` reports all.
    pub classes: Option<Vec<String>>,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            confidence: 0.25,
            iou: 0.7,
            image_size: 640,
            classes: None,
        }
    }
}

impl DetectOptions {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "confidence must be in [0, 1], got {}",
                self.confidence
            ));
        }
        if !(0.0..=1.0).contains(&self.iou) {
            return Err(format!("iou must be in [0, 1], got {}", self.iou));
        }
        if self.image_size == 0 {
            return Err("image_size must be non-zero".to_string());
        }
        Ok(())
    }
}
