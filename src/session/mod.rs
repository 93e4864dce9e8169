//! Session loop: the per-stream capture-detect-publish state machine.
//!
//! One session owns one frame source, one publisher, and one cancellation
//! token, and runs on its own thread. The loop is strictly sequential:
//! check cancellation, read a frame, detect, publish, wait out the cadence
//! interval, repeat. Per-frame failures are contained here; nothing a
//! session does can stall or corrupt another session.
//!
//! State transitions are one-directional:
//! `Starting -> Streaming -> Stopping -> Terminated`. `Starting` (opening
//! the source) happens on the caller's thread in the service layer so that
//! open failures surface synchronously and never register a session.

mod cancel;

pub use cancel::CancelToken;

use std::sync::Arc;
use std::time::Duration;

use crate::detect::{DetectOptions, DetectorBackend};
use crate::publish::{ResultMessage, ResultPublisher};
use crate::registry::SessionRegistry;
use crate::source::FrameSource;

/// Session lifecycle states, in transition order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Streaming,
    Stopping,
    Terminated,
}

/// Per-session settings.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Delay between frame reads. Deliberately throttles both source
    /// consumption and detector load. Zero disables throttling.
    pub cadence: Duration,
    /// Post-filtering applied to every detection result.
    pub options: DetectOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cadence: Duration::from_secs(1),
            options: DetectOptions::default(),
        }
    }
}

/// Drive one session until cancellation, end-of-stream, or a read error.
///
/// Runs on the session's own thread. On exit the source is closed and the
/// session's registry entry removed, whichever path ended the loop.
pub(crate) fn run_session(
    id: String,
    config: SessionConfig,
    mut source: FrameSource,
    detector: Arc<dyn DetectorBackend>,
    mut publisher: Box<dyn ResultPublisher>,
    cancel: Arc<CancelToken>,
    registry: Arc<SessionRegistry>,
) {
    log::debug!("session {}: {:?}", id, SessionState::Streaming);
    loop {
        // (a) Cancellation first: first-observed-wins against end-of-stream.
        if cancel.is_cancelled() {
            log::info!("session {}: cancelled", id);
            break;
        }
        // (b) Read one frame.
        let frame = match source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::info!(
                    "session {}: end of stream after {} frames",
                    id,
                    source.frames_read()
                );
                break;
            }
            Err(err) => {
                // Terminal, like end-of-stream. No retry.
                log::warn!("session {}: read failed: {}", id, err);
                break;
            }
        };
        // (c) Detect. One bad frame never terminates the session.
        match detector.detect(&frame) {
            Ok(result) => {
                let result = result.filtered(&config.options);
                let message = ResultMessage {
                    session_id: id.clone(),
                    frame_index: frame.index(),
                    boxes: result.boxes,
                };
                // (d) Publish. Delivery failures are reported, not fatal;
                // the disconnect path cancels us if the subscriber is gone.
                if let Err(err) = publisher.publish(&message) {
                    log::warn!("session {}: {}", id, err);
                }
            }
            Err(err) => {
                log::warn!(
                    "session {}: skipping frame {}: {}",
                    id,
                    frame.index(),
                    err
                );
            }
        }
        // (e) Cadence wait, waking early on cancellation.
        if cancel.wait(config.cadence) {
            log::info!("session {}: cancelled during cadence wait", id);
            break;
        }
    }

    log::debug!("session {}: {:?}", id, SessionState::Stopping);
    source.close();
    if !registry.remove(&id) {
        // Lost the race with an external remove; nothing left to do.
        log::debug!("session {}: registry entry already removed", id);
    }
    log::debug!("session {}: {:?}", id, SessionState::Terminated);
}
