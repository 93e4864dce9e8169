use std::io::Write;

use super::{ResultMessage, ResultPublisher};
use crate::error::PipelineError;

/// Publisher that writes one JSON line per result to any writer.
///
/// The daemon uses this with stdout; tests use it with an in-memory buffer.
pub struct JsonLinesPublisher<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesPublisher<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> ResultPublisher for JsonLinesPublisher<W> {
    fn publish(&mut self, message: &ResultMessage) -> Result<(), PipelineError> {
        let json = message.to_json()?;
        writeln!(self.writer, "{}", json)
            .and_then(|_| self.writer.flush())
            .map_err(|e| PipelineError::DeliveryFailure(format!("write result: {}", e)))
    }
}
