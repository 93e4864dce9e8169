#![cfg(feature = "publish-mqtt")]

//! MQTT publisher.
//!
//! Publishes each result envelope to `<prefix>/<session_id>` at QoS 1. The
//! connection event loop runs on its own thread; publish calls only enqueue.

use std::time::Duration;

use rumqttc::v5::{mqttbytes::QoS, Client, MqttOptions};

use super::{ResultMessage, ResultPublisher};
use crate::error::PipelineError;

pub struct MqttPublisher {
    client: Client,
    topic_prefix: String,
}

impl MqttPublisher {
    /// Connect to a broker and start the connection event loop.
    pub fn connect(
        host: &str,
        port: u16,
        client_id: &str,
        topic_prefix: &str,
    ) -> Result<Self, PipelineError> {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(Duration::from_secs(60));
        options.set_clean_start(true);

        let (client, mut connection) = Client::new(options, 10);
        std::thread::spawn(move || {
            for event in connection.iter() {
                if let Err(err) = event {
                    log::warn!("mqtt connection error: {}", err);
                }
            }
        });

        Ok(Self {
            client,
            topic_prefix: topic_prefix.trim_end_matches('/').to_string(),
        })
    }
}

impl ResultPublisher for MqttPublisher {
    fn publish(&mut self, message: &ResultMessage) -> Result<(), PipelineError> {
        let topic = format!("{}/{}", self.topic_prefix, message.session_id);
        let payload = message.to_json()?.into_bytes();
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| PipelineError::DeliveryFailure(format!("mqtt publish: {}", e)))
    }
}
