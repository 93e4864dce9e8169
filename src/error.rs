//! Pipeline error taxonomy.
//!
//! Each variant maps to a distinct caller policy:
//! - `SourceUnavailable`: fatal to session creation, surfaced synchronously.
//! - `ReadFailure`: terminal to the owning session, treated like end-of-stream.
//! - `InferenceFailure`: recoverable, the frame is skipped and the loop continues.
//! - `DeliveryFailure`: recoverable, logged, the session continues.
//! - `DuplicateSession` / `SessionNotFound`: registry races, reported to the
//!   caller and never fatal to the process.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The frame source could not be opened (bad URL, missing file,
    /// unsupported codec). No retry; a new session must be created.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// A frame read failed mid-stream. Terminal to the session.
    #[error("frame read failed: {0}")]
    ReadFailure(String),

    /// A single detect call failed. The frame is skipped.
    #[error("inference failed: {0}")]
    InferenceFailure(String),

    /// The subscriber could not be reached. The session continues until
    /// its own cancellation signal or stream exhaustion.
    #[error("result delivery failed: {0}")]
    DeliveryFailure(String),

    /// A session with this identifier is already registered.
    #[error("session '{0}' already registered")]
    DuplicateSession(String),

    /// No session with this identifier is registered.
    #[error("session '{0}' not found")]
    SessionNotFound(String),
}

impl PipelineError {
    /// True for errors the session loop absorbs without terminating.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::InferenceFailure(_) | PipelineError::DeliveryFailure(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification() {
        assert!(PipelineError::InferenceFailure("x".into()).is_recoverable());
        assert!(PipelineError::DeliveryFailure("x".into()).is_recoverable());
        assert!(!PipelineError::SourceUnavailable("x".into()).is_recoverable());
        assert!(!PipelineError::ReadFailure("x".into()).is_recoverable());
    }

    #[test]
    fn display_names_the_session() {
        let err = PipelineError::DuplicateSession("abc123".into());
        assert!(err.to_string().contains("abc123"));
    }
}
