//! Result delivery.
//!
//! A `ResultPublisher` serializes detection results into a transport-agnostic
//! message keyed by session identifier and delivers it to the subscriber
//! bound to that session. Delivery failures are reported to the session loop
//! and logged there; they never terminate the session directly, since the
//! subscriber-disconnect path sets the cancellation signal instead.
//!
//! Publishes are naturally serialized per session because they originate
//! from the single-threaded session loop.

mod channel;
#[cfg(feature = "publish-mqtt")]
mod mqtt;
mod writer;

pub use channel::ChannelPublisher;
#[cfg(feature = "publish-mqtt")]
pub use mqtt::MqttPublisher;
pub use writer::JsonLinesPublisher;

use serde::{Deserialize, Serialize};

use crate::detect::BoundingBox;
use crate::error::PipelineError;

/// The wire envelope for one processed frame.
///
/// `frame_index` is monotonically increasing within a session; an empty
/// `boxes` array means no objects were found and is still delivered.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultMessage {
    pub session_id: String,
    pub frame_index: u64,
    pub boxes: Vec<BoundingBox>,
}

impl ResultMessage {
    pub fn to_json(&self) -> Result<String, PipelineError> {
        serde_json::to_string(self)
            .map_err(|e| PipelineError::DeliveryFailure(format!("serialize result: {}", e)))
    }
}

/// Delivers serialized detection results to one subscriber.
pub trait ResultPublisher: Send {
    fn publish(&mut self, message: &ResultMessage) -> Result<(), PipelineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_with_session_key() {
        let message = ResultMessage {
            session_id: "abc123".to_string(),
            frame_index: 4,
            boxes: vec![BoundingBox {
                x1: 1.0,
                y1: 2.0,
                x2: 3.0,
                y2: 4.0,
                label: "person".to_string(),
                confidence: 0.9,
            }],
        };
        let json = message.to_json().unwrap();
        assert!(json.contains(r#""session_id":"abc123""#));
        assert!(json.contains(r#""frame_index":4"#));
        assert!(json.contains(r#""label":"person""#));
    }

    #[test]
    fn empty_boxes_still_serialize() {
        let message = ResultMessage {
            session_id: "abc123".to_string(),
            frame_index: 1,
            boxes: vec![],
        };
        assert!(message.to_json().unwrap().contains(r#""boxes":[]"#));
    }
}
