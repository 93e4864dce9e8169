//! Session creation and teardown surface.
//!
//! `StreamService` wires the pieces together: it opens a frame source, binds
//! a publisher to a fresh session, registers it, and spawns the session
//! thread. The detector is constructed once and shared by reference across
//! every session (see the `DetectorBackend` concurrency contract).

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;

use crate::detect::{DetectOptions, DetectorBackend};
use crate::error::PipelineError;
use crate::publish::ResultPublisher;
use crate::registry::SessionRegistry;
use crate::session::{run_session, CancelToken, SessionConfig};
use crate::source::{FrameSource, SourceConfig};

pub struct StreamService {
    registry: Arc<SessionRegistry>,
    detector: Arc<dyn DetectorBackend>,
    cadence: Duration,
    options: DetectOptions,
}

impl StreamService {
    pub fn new(detector: Arc<dyn DetectorBackend>) -> Self {
        Self {
            registry: Arc::new(SessionRegistry::new()),
            detector,
            cadence: Duration::from_secs(1),
            options: DetectOptions::default(),
        }
    }

    /// Seconds between frame reads for every session this service creates.
    pub fn with_cadence(mut self, cadence: Duration) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_options(mut self, options: DetectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        self.registry.clone()
    }

    /// Create a session with a generated identifier.
    ///
    /// Opens the source first: on `SourceUnavailable` nothing is registered
    /// and no thread is spawned. Returns the new session id.
    pub fn create_session(
        &self,
        source_uri: &str,
        publisher: Box<dyn ResultPublisher>,
    ) -> Result<String, PipelineError> {
        let source = self.open_source(source_uri)?;
        // Generated ids collide only if 64 random bits repeat while the
        // older session is still live; retry covers it.
        loop {
            let id = random_session_id();
            let cancel = Arc::new(CancelToken::new());
            match self.registry.register(&id, cancel.clone()) {
                Ok(()) => {
                    self.spawn_session(&id, source, publisher, cancel);
                    return Ok(id);
                }
                Err(PipelineError::DuplicateSession(_)) => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Create a session under a caller-supplied identifier (typically the
    /// transport layer's connection id). Fails with `DuplicateSession` when
    /// the id is already active; the source is not opened in that case.
    pub fn create_session_with_id(
        &self,
        id: &str,
        source_uri: &str,
        publisher: Box<dyn ResultPublisher>,
    ) -> Result<(), PipelineError> {
        if self.registry.contains(id) {
            return Err(PipelineError::DuplicateSession(id.to_string()));
        }
        let source = self.open_source(source_uri)?;
        let cancel = Arc::new(CancelToken::new());
        self.registry.register(id, cancel.clone())?;
        self.spawn_session(id, source, publisher, cancel);
        Ok(())
    }

    /// Set a session's cancellation signal. No-op for unknown or already
    /// terminated ids; calling it twice is a no-op.
    pub fn cancel_session(&self, id: &str) {
        if !self.registry.cancel(id) {
            log::debug!("cancel for unknown session '{}'", id);
        }
    }

    pub fn active_sessions(&self) -> Vec<String> {
        self.registry.ids()
    }

    /// Cancel every session and wait for their threads to finish.
    pub fn shutdown(&self) {
        let joins = self.registry.cancel_all();
        let count = joins.len();
        for join in joins {
            if join.join().is_err() {
                log::error!("session thread panicked during shutdown");
            }
        }
        if count > 0 {
            log::info!("shut down {} session(s)", count);
        }
    }

    fn open_source(&self, source_uri: &str) -> Result<FrameSource, PipelineError> {
        FrameSource::open(&SourceConfig::new(source_uri))
    }

    fn spawn_session(
        &self,
        id: &str,
        source: FrameSource,
        publisher: Box<dyn ResultPublisher>,
        cancel: Arc<CancelToken>,
    ) {
        let config = SessionConfig {
            cadence: self.cadence,
            options: self.options.clone(),
        };
        let detector = self.detector.clone();
        let registry = self.registry.clone();
        let session_id = id.to_string();
        let join = std::thread::spawn(move || {
            run_session(
                session_id, config, source, detector, publisher, cancel, registry,
            );
        });
        if let Some(join) = self.registry.attach_join(id, join) {
            // The loop already finished and removed its entry; the thread is
            // done, so the handle can be dropped.
            drop(join);
        }
        log::info!("session {} started", id);
    }
}

fn random_session_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
