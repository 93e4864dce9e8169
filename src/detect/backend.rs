use crate::error::PipelineError;
use crate::frame::Frame;

use super::result::DetectionResult;

/// Detector backend trait.
///
/// # Concurrency contract
///
/// One backend instance is constructed at process start and shared by
/// reference (`Arc<dyn DetectorBackend>`) across every active session, so
/// `detect` takes `&self` and implementations must be safe to call
/// concurrently. Backends with mutable internal state must synchronize it
/// themselves; model weights loaded at construction are read-only.
///
/// Implementations must treat the frame as read-only and must not retain it
/// beyond the call.
pub trait DetectorBackend: Send + Sync {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// A failure here is scoped to the one frame: callers skip the frame and
    /// keep going. Latency is bounded but variable; callers must not assume
    /// a fixed rate.
    fn detect(&self, frame: &Frame) -> Result<DetectionResult, PipelineError>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}
