#![cfg(feature = "backend-tract")]

//! Tract-based ONNX detection backend.
//!
//! Loads a YOLO-family detection model exported to ONNX and decodes its
//! `[1, 4 + classes, anchors]` output into labeled boxes in frame pixel
//! coordinates. The model is loaded once at construction and shared
//! read-only; `run` on the optimized plan is `&self`, so concurrent detect
//! calls from independent sessions are safe.

use std::path::Path;

use anyhow::Context;
use image::RgbImage;
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::options::DetectOptions;
use crate::detect::result::{suppress_overlaps, BoundingBox, DetectionResult};
use crate::error::PipelineError;
use crate::frame::Frame;

/// COCO class labels, the label set YOLO detection exports ship with.
const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

pub struct TractBackend {
    model: TypedSimplePlan<TypedModel>,
    input_size: u32,
    confidence: f32,
    iou: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference at the
    /// configured square input size.
    pub fn new<P: AsRef<Path>>(model_path: P, options: &DetectOptions) -> Result<Self, PipelineError> {
        Self::load(model_path.as_ref(), options)
            .map_err(|e| PipelineError::SourceUnavailable(format!("{:#}", e)))
    }

    fn load(model_path: &Path, options: &DetectOptions) -> anyhow::Result<Self> {
        let size = options.image_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size: options.image_size,
            confidence: options.confidence,
            iou: options.iou,
        })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor, PipelineError> {
        let size = self.input_size;
        let image = RgbImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
            .ok_or_else(|| {
                PipelineError::InferenceFailure("frame buffer does not match dimensions".into())
            })?;
        let resized = image::imageops::resize(
            &image,
            size,
            size,
            image::imageops::FilterType::Triangle,
        );
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, size as usize, size as usize),
            |(_, channel, y, x)| resized.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0,
        );
        Ok(input.into_tensor())
    }

    fn decode_output(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<DetectionResult, PipelineError> {
        let output = outputs
            .first()
            .ok_or_else(|| PipelineError::InferenceFailure("model produced no outputs".into()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| PipelineError::InferenceFailure(format!("output not f32: {}", e)))?;
        let shape = view.shape();
        if shape.len() != 3 || shape[1] < 5 {
            return Err(PipelineError::InferenceFailure(format!(
                "unexpected output shape {:?}",
                shape
            )));
        }
        let class_count = shape[1] - 4;
        let anchors = shape[2];

        // Model-input pixels back to frame pixels.
        let scale_x = frame.width() as f32 / self.input_size as f32;
        let scale_y = frame.height() as f32 / self.input_size as f32;

        let mut boxes = Vec::new();
        for anchor in 0..anchors {
            let mut best_class = 0usize;
            let mut best_score = 0f32;
            for class in 0..class_count {
                let score = view[[0, 4 + class, anchor]];
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }
            if best_score < self.confidence {
                continue;
            }
            let cx = view[[0, 0, anchor]];
            let cy = view[[0, 1, anchor]];
            let w = view[[0, 2, anchor]];
            let h = view[[0, 3, anchor]];
            boxes.push(BoundingBox {
                x1: (cx - w / 2.0) * scale_x,
                y1: (cy - h / 2.0) * scale_y,
                x2: (cx + w / 2.0) * scale_x,
                y2: (cy + h / 2.0) * scale_y,
                label: class_label(best_class, class_count),
                confidence: best_score,
            });
        }
        suppress_overlaps(&mut boxes, self.iou);
        Ok(DetectionResult::new(boxes))
    }
}

fn class_label(index: usize, class_count: usize) -> String {
    if class_count == COCO_LABELS.len() {
        COCO_LABELS[index].to_string()
    } else {
        format!("class{}", index)
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&self, frame: &Frame) -> Result<DetectionResult, PipelineError> {
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| PipelineError::InferenceFailure(format!("ONNX inference failed: {}", e)))?;
        self.decode_output(outputs, frame)
    }

    fn warm_up(&self) -> Result<(), PipelineError> {
        let size = self.input_size as usize;
        let zeros = tract_ndarray::Array4::<f32>::zeros((1, 3, size, size));
        self.model
            .run(tvec!(zeros.into_tensor().into()))
            .map_err(|e| PipelineError::InferenceFailure(format!("warm-up failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_label_lookup() {
        assert_eq!(class_label(0, 80), "person");
        assert_eq!(class_label(2, 80), "car");
        assert_eq!(class_label(3, 10), "class3");
    }
}
