//! Decoded video frames.
//!
//! A `Frame` is an RGB24 pixel buffer plus the metadata the pipeline needs:
//! dimensions and a monotonic per-source index. The pixel buffer is private;
//! detectors and the annotation path read it through `pixels()`, and nothing
//! in the crate logs or serializes raw pixel content.

/// One decoded frame. Produced only by the source layer.
///
/// `index` starts at 1 for the first frame a source yields and increases by
/// one per read. It is carried into the published result envelope so
/// subscribers can verify in-order delivery.
#[derive(Debug)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    index: u64,
}

impl Frame {
    /// Create a new frame. Called only by the source layer.
    pub(crate) fn new(pixels: Vec<u8>, width: u32, height: u32, index: u64) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 3);
        Self {
            pixels,
            width,
            height,
            index,
        }
    }

    /// Raw RGB24 pixel data, row-major, no padding.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Monotonic frame index within the owning source (1-based).
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Consume the frame, returning the pixel buffer.
    ///
    /// Used by the annotation path, which draws onto the buffer in place.
    pub(crate) fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_exposes_metadata() {
        let frame = Frame::new(vec![0u8; 2 * 2 * 3], 2, 2, 7);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 7);
        assert_eq!(frame.pixels().len(), 12);
    }
}
