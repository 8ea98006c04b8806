//! ---
//! ctsim_section: "11-simulation"
//! ctsim_subsection: "01-bootstrap"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Simulation runtime module exports and shared types."
//! ctsim_version: "v0.1.0"
//! ctsim_owner: "tbd"
//! ---
//! Coiled tubing job simulation: a fixed phase sequence per job type, a
//! per-tick physical state update, and the loop that publishes one telemetry
//! record per tick.

pub mod job;
pub mod noise;
pub mod phases;
pub mod physics;
pub mod runner;
pub mod state;

use ctsim_msg::PublishError;

/// Errors that abort a simulated job.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

pub use ctsim_msg::{OperationMode, TelemetryRecord};
pub use job::{JobType, SimulationConfig};
pub use noise::{ConstantNoise, NoiseSource, SeededNoise};
pub use phases::{phase_plan, Phase};
pub use physics::TickModel;
pub use runner::{
    JobOutcome, JobReport, JobRunner, PhaseSummary, ShutdownSignal, ShutdownTrigger,
};
pub use state::SimulationState;
