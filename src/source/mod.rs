//! Frame sources.
//!
//! A `FrameSource` reads sequential RGB frames from a video file or network
//! stream. Sources are responsible for:
//! - Failing fast at `open` when the source is unreachable
//! - Decoding frames in-memory and normalizing them to RGB24
//! - Stamping each frame with a monotonic index
//!
//! End-of-stream is sticky: once `read_frame` has returned `Ok(None)`, every
//! subsequent call also returns `Ok(None)`. A source is never silently
//! re-opened.
//!
//! `stub://` URIs select the synthetic source used by tests and demos. Real
//! files and stream URLs are decoded via FFmpeg behind the `source-ffmpeg`
//! feature.

#[cfg(feature = "source-ffmpeg")]
pub(crate) mod ffmpeg;
mod synthetic;

use crate::error::PipelineError;
use crate::frame::Frame;

use synthetic::SyntheticSource;

/// Configuration for opening a frame source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// File path, stream URL, or `stub://name[?frames=N]`.
    pub uri: String,
    /// Frame width for synthetic sources.
    pub width: u32,
    /// Frame height for synthetic sources.
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            uri: "stub://camera".to_string(),
            width: 640,
            height: 480,
        }
    }
}

impl SourceConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }
}

/// A frame source bound to one video file or stream.
pub struct FrameSource {
    backend: Backend,
    uri: String,
    frames_read: u64,
    finished: bool,
    closed: bool,
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("uri", &self.uri)
            .field("frames_read", &self.frames_read)
            .field("finished", &self.finished)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

enum Backend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "source-ffmpeg")]
    Ffmpeg(ffmpeg::FfmpegSource),
}

impl FrameSource {
    /// Open a source. Fails fast with `SourceUnavailable` when the URI is
    /// malformed, the file is missing, or the decoder cannot be initialized.
    /// Nothing is retried; a failed open leaves no resources behind.
    pub fn open(config: &SourceConfig) -> Result<Self, PipelineError> {
        let backend = if config.uri.starts_with("stub://") {
            Backend::Synthetic(SyntheticSource::from_uri(
                &config.uri,
                config.width,
                config.height,
            )?)
        } else if config.uri.trim().is_empty() {
            return Err(PipelineError::SourceUnavailable(
                "empty source uri".to_string(),
            ));
        } else {
            #[cfg(feature = "source-ffmpeg")]
            {
                Backend::Ffmpeg(ffmpeg::FfmpegSource::open(&config.uri)?)
            }
            #[cfg(not(feature = "source-ffmpeg"))]
            {
                return Err(PipelineError::SourceUnavailable(format!(
                    "'{}' requires the source-ffmpeg feature",
                    config.uri
                )));
            }
        };
        log::info!("source opened: {}", config.uri);
        Ok(Self {
            backend,
            uri: config.uri.clone(),
            frames_read: 0,
            finished: false,
            closed: false,
        })
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` exactly when the stream is exhausted or the source
    /// has been closed, and keeps returning it afterwards. Read errors are
    /// terminal to the caller's loop but do not poison the process.
    pub fn read_frame(&mut self) -> Result<Option<Frame>, PipelineError> {
        if self.finished || self.closed {
            return Ok(None);
        }
        let decoded = match &mut self.backend {
            Backend::Synthetic(source) => source.read_rgb(),
            #[cfg(feature = "source-ffmpeg")]
            Backend::Ffmpeg(source) => source.read_rgb(),
        }?;
        match decoded {
            Some((pixels, width, height)) => {
                self.frames_read += 1;
                Ok(Some(Frame::new(pixels, width, height, self.frames_read)))
            }
            None => {
                self.finished = true;
                log::debug!("source exhausted after {} frames: {}", self.frames_read, self.uri);
                Ok(None)
            }
        }
    }

    /// Release the source. Idempotent; reads after close see end-of-stream.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        match &mut self.backend {
            Backend::Synthetic(_) => {}
            #[cfg(feature = "source-ffmpeg")]
            Backend::Ffmpeg(source) => source.close(),
        }
        log::debug!("source closed: {}", self.uri);
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Frames read so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_source_yields_indexed_frames() {
        let mut source = FrameSource::open(&SourceConfig::new("stub://cam?frames=3")).unwrap();
        let first = source.read_frame().unwrap().unwrap();
        assert_eq!(first.index(), 1);
        assert_eq!(first.width(), 640);
        let second = source.read_frame().unwrap().unwrap();
        assert_eq!(second.index(), 2);
    }

    #[test]
    fn end_of_stream_is_sticky() {
        let mut source = FrameSource::open(&SourceConfig::new("stub://cam?frames=1")).unwrap();
        assert!(source.read_frame().unwrap().is_some());
        assert!(source.read_frame().unwrap().is_none());
        assert!(source.read_frame().unwrap().is_none());
        assert_eq!(source.frames_read(), 1);
    }

    #[test]
    fn close_is_idempotent_and_ends_the_stream() {
        let mut source = FrameSource::open(&SourceConfig::new("stub://cam")).unwrap();
        assert!(source.read_frame().unwrap().is_some());
        source.close();
        source.close();
        assert!(source.read_frame().unwrap().is_none());
    }

    #[test]
    fn bad_stub_uri_is_unavailable() {
        let err = FrameSource::open(&SourceConfig::new("stub://cam?frames=banana")).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    }

    #[test]
    fn empty_uri_is_unavailable() {
        let err = FrameSource::open(&SourceConfig::new("")).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    }

    #[cfg(not(feature = "source-ffmpeg"))]
    #[test]
    fn real_uri_requires_ffmpeg_feature() {
        let err = FrameSource::open(&SourceConfig::new("/no/such/file.mp4")).unwrap_err();
        assert!(matches!(err, PipelineError::SourceUnavailable(_)));
    }
}
