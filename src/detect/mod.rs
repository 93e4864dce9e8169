//! Object detection: backend trait, result types, post-filtering.

mod backend;
mod backends;
mod options;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use options::DetectOptions;
pub use result::{suppress_overlaps, BoundingBox, DetectionResult};
