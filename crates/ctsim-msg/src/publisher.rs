//! ---
//! ctsim_section: "02-messaging"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Publisher trait with in-memory and writer-backed implementations."
//! ctsim_version: "v0.0.0-prealpha"
//! ctsim_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::record::TelemetryRecord;
use crate::{PublishError, Result};

/// Minimal broker surface used by the job runner.
pub trait Publisher {
    /// Hand one payload to the broker for `topic`.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()>;
    /// Flush outstanding payloads and release the connection.
    fn shutdown(&mut self) -> Result<()>;
    /// Human-readable publisher name for logging.
    fn name(&self) -> &'static str;
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        (**self).publish(topic, payload)
    }

    fn shutdown(&mut self) -> Result<()> {
        (**self).shutdown()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Payload captured by the [`InMemoryPublisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    /// Destination topic.
    pub topic: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct InMemoryState {
    messages: Vec<PublishedMessage>,
    shutdown_calls: usize,
    fail_after: Option<usize>,
}

/// In-memory collector shared between clones, primarily for tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublisher {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryPublisher {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every publish once `accepted` payloads have been stored.
    pub fn failing_after(accepted: usize) -> Self {
        let publisher = Self::default();
        publisher.state.lock().fail_after = Some(accepted);
        publisher
    }

    /// Snapshot of everything published so far.
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.state.lock().messages.clone()
    }

    /// Number of payloads published so far.
    pub fn len(&self) -> usize {
        self.state.lock().messages.len()
    }

    /// Whether nothing has been published yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode every payload as a [`TelemetryRecord`].
    pub fn records(&self) -> Result<Vec<TelemetryRecord>> {
        self.state
            .lock()
            .messages
            .iter()
            .map(|message| {
                serde_json::from_slice::<TelemetryRecord>(&message.payload)
                    .map_err(PublishError::from)
            })
            .collect()
    }

    /// How many times [`Publisher::shutdown`] has been invoked.
    pub fn shutdown_calls(&self) -> usize {
        self.state.lock().shutdown_calls
    }
}

impl Publisher for InMemoryPublisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<()> {
        let mut guard = self.state.lock();
        if guard.shutdown_calls > 0 {
            return Err(PublishError::Closed);
        }
        if let Some(limit) = guard.fail_after {
            if guard.messages.len() >= limit {
                return Err(PublishError::Send {
                    topic: topic.to_owned(),
                    reason: "in-memory failure injected".to_owned(),
                });
            }
        }
        guard.messages.push(PublishedMessage {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.state.lock().shutdown_calls += 1;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

/// Writes each payload as one line, e.g. newline-delimited JSON on stdout.
#[derive(Debug)]
pub struct WriterPublisher<W: Write> {
    writer: Option<W>,
}

impl WriterPublisher<io::Stdout> {
    /// Publisher for dry runs that prints payloads instead of sending them.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> WriterPublisher<W> {
    /// Wrap an arbitrary writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    /// Recover the writer after shutdown, if it has not been dropped.
    pub fn into_inner(self) -> Option<W> {
        self.writer
    }
}

impl<W: Write> Publisher for WriterPublisher<W> {
    fn publish(&mut self, _topic: &str, payload: &[u8]) -> Result<()> {
        let writer = self.writer.as_mut().ok_or(PublishError::Closed)?;
        writer.write_all(payload)?;
        writer.write_all(b"\n")?;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "writer"
    }
}
