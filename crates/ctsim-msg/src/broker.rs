//! ---
//! ctsim_section: "02-messaging"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Kafka publisher backed by the synchronous kafka client."
//! ctsim_version: "v0.0.0-prealpha"
//! ctsim_owner: "tbd"
//! ---
use std::time::Duration;

use kafka::producer::{Producer, Record, RequiredAcks};
use tracing::{debug, info};

use crate::publisher::Publisher;
use crate::{PublishError, Result};

const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(1);

/// Publishes payloads to a Kafka broker, one produce request per payload.
///
/// Acknowledgement is awaited inside `send`, so `shutdown` only has to drop the
/// connection. `publish` blocks the calling thread for up to the ack timeout;
/// async callers need the multi-thread runtime so other tasks keep running.
pub struct KafkaPublisher {
    broker: String,
    producer: Option<Producer>,
}

impl KafkaPublisher {
    /// Connect to `broker` (`host:port`) with leader acknowledgements.
    pub fn connect(broker: &str) -> Result<Self> {
        Self::connect_with_timeout(broker, DEFAULT_ACK_TIMEOUT)
    }

    /// Connect with an explicit acknowledgement timeout.
    pub fn connect_with_timeout(broker: &str, ack_timeout: Duration) -> Result<Self> {
        let producer = Producer::from_hosts(vec![broker.to_owned()])
            .with_ack_timeout(ack_timeout)
            .with_required_acks(RequiredAcks::One)
            .create()
            .map_err(|err| PublishError::Connect {
                broker: broker.to_owned(),
                reason: err.to_string(),
            })?;
        info!(broker, "kafka producer connected");
        Ok(Self {
            broker: broker.to_owned(),
            producer: Some(producer),
        })
    }
}

impl Publisher for KafkaPublisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        let producer = self.producer.as_mut().ok_or(PublishError::Closed)?;
        producer
            .send(&Record::from_value(topic, payload))
            .map_err(|err| PublishError::Send {
                topic: topic.to_owned(),
                reason: err.to_string(),
            })
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.producer.take().is_some() {
            debug!(broker = %self.broker, "kafka producer closed");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "kafka"
    }
}

impl std::fmt::Debug for KafkaPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaPublisher")
            .field("broker", &self.broker)
            .field("connected", &self.producer.is_some())
            .finish()
    }
}
