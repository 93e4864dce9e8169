//! detect-stream
//!
//! Session-scoped video detection pipeline: open a frame source, pull frames
//! at a controlled cadence, run each through an object-detection backend,
//! and push serialized results to exactly one subscriber per session, for an
//! arbitrary number of concurrently active sessions.
//!
//! # Architecture
//!
//! Data flows `source -> session loop -> detector -> publisher`:
//!
//! - `source`: frame acquisition from files, stream URLs, or `stub://`
//!   synthetic sources; fail-fast open, sticky end-of-stream.
//! - `detect`: the `DetectorBackend` trait plus stub and ONNX backends,
//!   result types, and post-filtering (confidence, classes, IoU).
//! - `session`: the per-stream loop and its cancellation token; one thread
//!   per session, sequential within a session.
//! - `registry`: the process-wide id -> session table with atomic
//!   insert/remove.
//! - `service`: `StreamService`, the create/cancel surface that wires the
//!   pieces together.
//! - `publish`: the `ResultPublisher` trait and channel / JSON-lines / MQTT
//!   implementations.
//! - `annotate`: the synchronous pull mode yielding annotated JPEG or JSON
//!   chunks, bypassing the session machinery.
//!
//! # Failure isolation
//!
//! Per-frame errors stay inside their session: an inference failure skips
//! the frame, a delivery failure is logged, a read failure ends that session
//! only. Session-creation failures surface synchronously to the caller and
//! register nothing.

pub mod annotate;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod publish;
pub mod registry;
pub mod service;
pub mod session;
pub mod source;

pub use annotate::{AnnotatedChunk, AnnotatedStream, PullMode};
pub use detect::{BoundingBox, DetectOptions, DetectionResult, DetectorBackend, StubBackend};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use error::PipelineError;
pub use frame::Frame;
pub use publish::{ChannelPublisher, JsonLinesPublisher, ResultMessage, ResultPublisher};
#[cfg(feature = "publish-mqtt")]
pub use publish::MqttPublisher;
pub use registry::SessionRegistry;
pub use service::StreamService;
pub use session::{CancelToken, SessionConfig, SessionState};
pub use source::{FrameSource, SourceConfig};
