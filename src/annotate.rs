//! Synchronous pull mode.
//!
//! `AnnotatedStream` is a lazy iterator over a source: each frame is run
//! through the detector and yielded either as a JPEG with boxes drawn on it
//! or as a JSON result chunk. It reuses the detector adapter but none of the
//! session or registry machinery; the requester drives consumption and the
//! sequence ends when the source does.

use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::ImageEncoder;

use crate::detect::{BoundingBox, DetectOptions, DetectionResult, DetectorBackend};
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::source::{FrameSource, SourceConfig};

/// What each chunk carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullMode {
    /// JPEG-encoded frame with detection boxes drawn on it.
    AnnotatedJpeg,
    /// Serialized detection result, no image data.
    Json,
}

#[derive(Clone, Debug)]
pub enum AnnotatedChunk {
    Jpeg(Vec<u8>),
    Json(String),
}

pub struct AnnotatedStream {
    source: FrameSource,
    detector: Arc<dyn DetectorBackend>,
    options: DetectOptions,
    mode: PullMode,
    done: bool,
}

impl AnnotatedStream {
    /// Open the source eagerly (failures surface here, not mid-iteration).
    pub fn open(
        config: &SourceConfig,
        detector: Arc<dyn DetectorBackend>,
        options: DetectOptions,
        mode: PullMode,
    ) -> Result<Self, PipelineError> {
        let source = FrameSource::open(config)?;
        Ok(Self {
            source,
            detector,
            options,
            mode,
            done: false,
        })
    }

    fn chunk_for(&self, frame: Frame, result: DetectionResult) -> Result<AnnotatedChunk, PipelineError> {
        match self.mode {
            PullMode::Json => serde_json::to_string(&result)
                .map(AnnotatedChunk::Json)
                .map_err(|e| PipelineError::DeliveryFailure(format!("serialize result: {}", e))),
            PullMode::AnnotatedJpeg => {
                let width = frame.width();
                let height = frame.height();
                let mut pixels = frame.into_pixels();
                for bbox in &result.boxes {
                    draw_box(&mut pixels, width, height, bbox);
                }
                encode_jpeg(&pixels, width, height).map(AnnotatedChunk::Jpeg)
            }
        }
    }
}

impl Iterator for AnnotatedStream {
    type Item = Result<AnnotatedChunk, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            let frame = match self.source.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    self.done = true;
                    self.source.close();
                    return None;
                }
                Err(err) => {
                    self.done = true;
                    self.source.close();
                    return Some(Err(err));
                }
            };
            match self.detector.detect(&frame) {
                Ok(result) => {
                    let result = result.filtered(&self.options);
                    return Some(self.chunk_for(frame, result));
                }
                Err(err) => {
                    // Same policy as the session loop: skip the frame.
                    log::warn!("pull stream: skipping frame {}: {}", frame.index(), err);
                }
            }
        }
    }
}

/// Draw a 2px rectangle outline in-place. Coordinates are clamped to the
/// frame; degenerate boxes draw nothing visible.
fn draw_box(pixels: &mut [u8], width: u32, height: u32, bbox: &BoundingBox) {
    const COLOR: [u8; 3] = [0, 255, 64];
    const THICKNESS: i64 = 2;

    let x1 = bbox.x1 as i64;
    let y1 = bbox.y1 as i64;
    let x2 = bbox.x2 as i64;
    let y2 = bbox.y2 as i64;

    // Iteration bounds clamped to the frame; a box that misses the frame
    // entirely yields empty ranges. Edge positions keep the raw coordinates
    // so off-frame edges stay invisible instead of snapping to the border.
    let span_x1 = x1.max(0);
    let span_y1 = y1.max(0);
    let span_x2 = x2.min(width as i64 - 1);
    let span_y2 = y2.min(height as i64 - 1);

    let mut put = |x: i64, y: i64| {
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            return;
        }
        let offset = (y as usize * width as usize + x as usize) * 3;
        pixels[offset..offset + 3].copy_from_slice(&COLOR);
    };

    for t in 0..THICKNESS {
        for x in span_x1..=span_x2 {
            put(x, y1.saturating_add(t));
            put(x, y2.saturating_sub(t));
        }
        for y in span_y1..=span_y2 {
            put(x1.saturating_add(t), y);
            put(x2.saturating_sub(t), y);
        }
    }
}

fn encode_jpeg(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PipelineError> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new(&mut buffer);
    encoder
        .write_image(pixels, width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| PipelineError::DeliveryFailure(format!("encode jpeg: {}", e)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubBackend;

    #[test]
    fn finite_source_yields_one_chunk_per_frame() {
        let stream = AnnotatedStream::open(
            &SourceConfig::new("stub://cam?frames=3"),
            Arc::new(StubBackend::new()),
            DetectOptions::default(),
            PullMode::Json,
        )
        .unwrap();
        let chunks: Vec<_> = stream.collect();
        assert_eq!(chunks.len(), 3);
        for chunk in chunks {
            match chunk.unwrap() {
                AnnotatedChunk::Json(json) => assert!(json.contains("person")),
                AnnotatedChunk::Jpeg(_) => panic!("expected json chunks"),
            }
        }
    }

    #[test]
    fn jpeg_mode_produces_jpeg_magic() {
        let mut stream = AnnotatedStream::open(
            &SourceConfig::new("stub://cam?frames=1"),
            Arc::new(StubBackend::new()),
            DetectOptions::default(),
            PullMode::AnnotatedJpeg,
        )
        .unwrap();
        match stream.next().unwrap().unwrap() {
            AnnotatedChunk::Jpeg(bytes) => {
                assert!(bytes.starts_with(&[0xFF, 0xD8]));
            }
            AnnotatedChunk::Json(_) => panic!("expected jpeg chunk"),
        }
        assert!(stream.next().is_none());
    }

    #[test]
    fn huge_box_coordinates_are_clipped_not_iterated() {
        // Iteration must be bounded by the frame, not the box; coordinates
        // far beyond any frame would otherwise loop practically forever.
        let mut pixels = vec![0u8; 8 * 8 * 3];
        let bbox = BoundingBox {
            x1: 0.0,
            y1: 0.0,
            x2: 1e18,
            y2: 1e18,
            label: "person".to_string(),
            confidence: 0.9,
        };
        draw_box(&mut pixels, 8, 8, &bbox);
        assert_eq!(&pixels[0..3], &[0, 255, 64]);
    }

    #[test]
    fn fully_off_frame_box_draws_nothing() {
        let mut pixels = vec![0u8; 8 * 8 * 3];
        let bbox = BoundingBox {
            x1: 100.0,
            y1: 100.0,
            x2: 200.0,
            y2: 200.0,
            label: "person".to_string(),
            confidence: 0.9,
        };
        draw_box(&mut pixels, 8, 8, &bbox);
        assert!(pixels.iter().all(|&p| p == 0));
    }

    #[test]
    fn jpeg_mode_survives_a_detector_reporting_huge_boxes() {
        use crate::error::PipelineError;

        struct OversizedBoxDetector;
        impl DetectorBackend for OversizedBoxDetector {
            fn name(&self) -> &'static str {
                "oversized"
            }
            fn detect(&self, _frame: &Frame) -> Result<DetectionResult, PipelineError> {
                Ok(DetectionResult::new(vec![BoundingBox {
                    x1: 0.0,
                    y1: 0.0,
                    x2: 1e18,
                    y2: 1e18,
                    label: "person".to_string(),
                    confidence: 0.99,
                }]))
            }
        }

        let mut stream = AnnotatedStream::open(
            &SourceConfig::new("stub://cam?frames=1"),
            Arc::new(OversizedBoxDetector),
            DetectOptions::default(),
            PullMode::AnnotatedJpeg,
        )
        .unwrap();
        match stream.next().unwrap().unwrap() {
            AnnotatedChunk::Jpeg(bytes) => assert!(bytes.starts_with(&[0xFF, 0xD8])),
            AnnotatedChunk::Json(_) => panic!("expected jpeg chunk"),
        }
    }

    #[test]
    fn draw_box_clamps_out_of_bounds_coordinates() {
        let mut pixels = vec![0u8; 8 * 8 * 3];
        let bbox = BoundingBox {
            x1: 2.0,
            y1: 2.0,
            x2: 100.0,
            y2: 100.0,
            label: "person".to_string(),
            confidence: 0.9,
        };
        draw_box(&mut pixels, 8, 8, &bbox);
        // Top edge is drawn; the parts past the frame are silently clipped.
        let offset = (2 * 8 + 2) * 3;
        assert_eq!(&pixels[offset..offset + 3], &[0, 255, 64]);
    }
}
