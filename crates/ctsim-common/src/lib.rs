//! ---
//! ctsim_section: "01-core-functionality"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Shared primitives and utilities for the simulator runtime."
//! ctsim_version: "v0.0.0-prealpha"
//! ctsim_owner: "tbd"
//! ---
//! Core shared primitives for the coiled tubing simulator workspace.
//! This crate exposes configuration loading, logging, and version metadata
//! utilities consumed by the simulation engine and the CLI.

pub mod config;
pub mod logging;
pub mod version;

pub use config::{
    JitterRange, JobDefaults, LoadedConfig, LoggingConfig, PacingConfig, PhysicsConfig,
    SimulatorFileConfig,
};
pub use logging::{init_tracing, log_job_event, JobEventOutcome, LogContext, LogFormat};
pub use version::VersionInfo;
