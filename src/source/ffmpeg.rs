#![cfg(feature = "source-ffmpeg")]

//! FFmpeg-backed frame decode for local files and network stream URLs.
//!
//! Frames are decoded in-memory and scaled to RGB24. The demuxer handles
//! both container files and network protocols (RTSP/HTTP), so one backend
//! serves every non-stub URI.

use anyhow::Context;
use ffmpeg_next as ffmpeg;
use std::path::Path;

use crate::error::PipelineError;

/// Socket timeout for network opens and reads, in microseconds.
const OPEN_TIMEOUT_MICROS: &str = "10000000";

pub(crate) struct FfmpegSource {
    input: Option<ffmpeg::format::context::Input>,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    draining: bool,
}

impl FfmpegSource {
    /// Open a file path or stream URL. All setup errors surface as
    /// `SourceUnavailable`; nothing is retried.
    pub(crate) fn open(uri: &str) -> Result<Self, PipelineError> {
        Self::open_inner(uri).map_err(|e| PipelineError::SourceUnavailable(format!("{:#}", e)))
    }

    fn open_inner(uri: &str) -> anyhow::Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;

        let input = if is_network_uri(uri) {
            // An unreachable host must fail the open within the timeout
            // instead of blocking on the TCP connect. "rw_timeout" covers
            // the generic I/O layer, "timeout" the RTSP/TCP demuxers.
            let mut options = ffmpeg::Dictionary::new();
            options.set("rw_timeout", OPEN_TIMEOUT_MICROS);
            options.set("timeout", OPEN_TIMEOUT_MICROS);
            ffmpeg::format::input_with_dictionary(&uri, options)
        } else {
            // Local paths get an existence check so a typo fails immediately
            // instead of surfacing as an opaque demuxer error.
            if !Path::new(uri).exists() {
                anyhow::bail!("no such file: {}", uri);
            }
            ffmpeg::format::input(&uri)
        }
        .with_context(|| format!("failed to open '{}'", uri))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("'{}' has no video track", uri))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create RGB scaler")?;

        Ok(Self {
            input: Some(input),
            stream_index,
            decoder,
            scaler,
            draining: false,
        })
    }

    /// Decode the next frame. `Ok(None)` once the demuxer and decoder are
    /// both drained.
    pub(crate) fn read_rgb(&mut self) -> Result<Option<(Vec<u8>, u32, u32)>, PipelineError> {
        loop {
            if let Some(frame) = self.receive_decoded()? {
                return Ok(Some(frame));
            }
            if self.draining {
                return Ok(None);
            }
            let Some(input) = self.input.as_mut() else {
                return Ok(None);
            };
            match input.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.stream_index {
                        continue;
                    }
                    self.decoder.send_packet(&packet).map_err(|e| {
                        PipelineError::ReadFailure(format!("send packet to decoder: {}", e))
                    })?;
                }
                None => {
                    // Demuxer exhausted; flush the decoder once, then drain.
                    self.decoder.send_eof().map_err(|e| {
                        PipelineError::ReadFailure(format!("flush decoder: {}", e))
                    })?;
                    self.draining = true;
                }
            }
        }
    }

    fn receive_decoded(&mut self) -> Result<Option<(Vec<u8>, u32, u32)>, PipelineError> {
        let mut decoded = ffmpeg::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb)
            .map_err(|e| PipelineError::ReadFailure(format!("scale frame to RGB: {}", e)))?;
        frame_to_pixels(&rgb).map(Some)
    }

    /// Drop the demuxer context, releasing file handles / network sockets.
    pub(crate) fn close(&mut self) {
        self.input = None;
        self.draining = true;
    }
}

fn is_network_uri(uri: &str) -> bool {
    uri.contains("://")
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32), PipelineError> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = width as usize * 3;
    let stride = frame.stride(0) as usize;
    let data = frame.data(0);

    if stride == row_bytes {
        return Ok((data.to_vec(), width, height));
    }

    // Strip per-row alignment padding.
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        let slice = data
            .get(start..end)
            .ok_or_else(|| PipelineError::ReadFailure("frame row out of bounds".to_string()))?;
        pixels.extend_from_slice(slice);
    }
    Ok((pixels, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_uris_get_timeout_options() {
        assert!(is_network_uri("rtsp://camera-1/stream"));
        assert!(is_network_uri("http://host/clip.mp4"));
        assert!(!is_network_uri("/videos/clip.mp4"));
        assert!(!is_network_uri("clip.mp4"));
    }
}
