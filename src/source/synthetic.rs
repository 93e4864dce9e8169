//! Synthetic frame source for tests and demos.
//!
//! Selected by `stub://` URIs. Generates deterministic RGB frames with a
//! slowly changing pattern, optionally bounded to a fixed frame count via
//! `stub://name?frames=N`.

use crate::error::PipelineError;

pub(crate) struct SyntheticSource {
    remaining: Option<u64>,
    width: u32,
    height: u32,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    /// Parse a `stub://name[?frames=N]` URI. `frames=0` is an immediately
    /// exhausted source; no `frames` parameter means unbounded.
    pub(crate) fn from_uri(uri: &str, width: u32, height: u32) -> Result<Self, PipelineError> {
        let rest = uri.trim_start_matches("stub://");
        let mut remaining = None;
        if let Some((_, query)) = rest.split_once('?') {
            for pair in query.split('&') {
                match pair.split_once('=') {
                    Some(("frames", value)) => {
                        let frames: u64 = value.parse().map_err(|_| {
                            PipelineError::SourceUnavailable(format!(
                                "invalid frames parameter in '{}'",
                                uri
                            ))
                        })?;
                        remaining = Some(frames);
                    }
                    _ => {
                        return Err(PipelineError::SourceUnavailable(format!(
                            "unrecognized stub parameter '{}' in '{}'",
                            pair, uri
                        )));
                    }
                }
            }
        }
        Ok(Self {
            remaining,
            width,
            height,
            frame_count: 0,
            scene_state: 0,
        })
    }

    pub(crate) fn read_rgb(&mut self) -> Result<Option<(Vec<u8>, u32, u32)>, PipelineError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }
        self.frame_count += 1;
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let pixel_count = self.width as usize * self.height as usize * 3;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        Ok(Some((pixels, self.width, self.height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_source_exhausts() {
        let mut source = SyntheticSource::from_uri("stub://cam?frames=2", 4, 4).unwrap();
        assert!(source.read_rgb().unwrap().is_some());
        assert!(source.read_rgb().unwrap().is_some());
        assert!(source.read_rgb().unwrap().is_none());
    }

    #[test]
    fn zero_frames_is_immediately_exhausted() {
        let mut source = SyntheticSource::from_uri("stub://cam?frames=0", 4, 4).unwrap();
        assert!(source.read_rgb().unwrap().is_none());
    }

    #[test]
    fn frames_differ_between_reads() {
        let mut source = SyntheticSource::from_uri("stub://cam", 4, 4).unwrap();
        let (a, _, _) = source.read_rgb().unwrap().unwrap();
        let (b, _, _) = source.read_rgb().unwrap().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn unknown_parameter_rejected() {
        assert!(SyntheticSource::from_uri("stub://cam?loop=1", 4, 4).is_err());
    }
}
