use std::sync::mpsc::{channel, Receiver, Sender};

use super::{ResultMessage, ResultPublisher};
use crate::error::PipelineError;

/// In-process publisher backed by an unbounded mpsc channel.
///
/// The receiving half is the subscriber; when it is dropped, publishing
/// fails with `DeliveryFailure`, which the session loop logs and survives.
pub struct ChannelPublisher {
    sender: Sender<ResultMessage>,
}

impl ChannelPublisher {
    pub fn new() -> (Self, Receiver<ResultMessage>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }
}

impl ResultPublisher for ChannelPublisher {
    fn publish(&mut self, message: &ResultMessage) -> Result<(), PipelineError> {
        self.sender
            .send(message.clone())
            .map_err(|_| PipelineError::DeliveryFailure("subscriber disconnected".to_string()))
    }
}
