//! ---
//! ctsim_section: "02-messaging"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Telemetry record schema and broker publishers."
//! ctsim_version: "v0.0.0-prealpha"
//! ctsim_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Wire schema for coiled tubing telemetry and the publishers that carry it
//! to a broker. Delivery guarantees belong to the publisher implementation.

#[cfg(feature = "kafka")]
pub mod broker;
pub mod publisher;
pub mod record;

/// Shared result type for publishing operations.
pub type Result<T> = std::result::Result<T, PublishError>;

/// Errors raised by publishers.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The broker could not be reached when the publisher was created.
    #[error("unable to connect to broker {broker}: {reason}")]
    Connect {
        /// Broker address that was dialled.
        broker: String,
        /// Underlying client error.
        reason: String,
    },
    /// The broker rejected or failed to acknowledge a payload.
    #[error("failed to send to topic {topic}: {reason}")]
    Send {
        /// Destination topic.
        topic: String,
        /// Underlying client error.
        reason: String,
    },
    /// The publisher was used after `shutdown`.
    #[error("publisher already shut down")]
    Closed,
    /// Wrapper for IO errors from writer-backed publishers.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization problems.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "kafka")]
pub use broker::KafkaPublisher;
pub use publisher::{InMemoryPublisher, PublishedMessage, Publisher, WriterPublisher};
pub use record::{OperationMode, TelemetryRecord, TelemetrySample};
