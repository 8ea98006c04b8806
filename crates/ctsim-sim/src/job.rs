//! ---
//! ctsim_section: "11-simulation"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Job identity, job types and immutable job parameters."
//! ctsim_version: "v0.1.0"
//! ctsim_owner: "tbd"
//! ---
use std::fmt;

use ctsim_common::config::JobDefaults;

use crate::SimulationError;

pub const DEFAULT_TARGET_DEPTH_FT: u32 = 10_000;
pub const DEFAULT_BROKER: &str = "localhost:9092";
pub const DEFAULT_TOPIC: &str = "ct.telemetry";

/// Coiled tubing service line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobType {
    /// Cleanout.
    #[default]
    Cln,
    /// Nitrogen lift.
    N2l,
    /// Acid treatment.
    Act,
    /// Milling.
    Mil,
    /// Fishing.
    Fsh,
    /// Logging.
    Log,
}

impl JobType {
    pub const ALL: [JobType; 6] = [
        JobType::Cln,
        JobType::N2l,
        JobType::Act,
        JobType::Mil,
        JobType::Fsh,
        JobType::Log,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            JobType::Cln => "CLN",
            JobType::N2l => "N2L",
            JobType::Act => "ACT",
            JobType::Mil => "MIL",
            JobType::Fsh => "FSH",
            JobType::Log => "LOG",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            JobType::Cln => "cleanout",
            JobType::N2l => "nitrogen lift",
            JobType::Act => "acid treatment",
            JobType::Mil => "milling",
            JobType::Fsh => "fishing",
            JobType::Log => "logging",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Immutable parameters of one simulated job.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub job_id: String,
    pub ct_unit_id: String,
    pub job_type: JobType,
    pub target_depth_ft: f64,
    pub rih_speed_fpm: f64,
    pub pooh_speed_fpm: f64,
    pub pump_rate_bpm: f64,
    pub max_pressure_psi: f64,
    pub broker: String,
    pub topic: String,
}

impl SimulationConfig {
    /// Job with the default speeds, rates, broker and topic.
    pub fn new(
        job_id: impl Into<String>,
        ct_unit_id: impl Into<String>,
        job_type: JobType,
        target_depth_ft: u32,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            ct_unit_id: ct_unit_id.into(),
            job_type,
            target_depth_ft: f64::from(target_depth_ft),
            ..Self::from_defaults(&JobDefaults::default())
        }
    }

    fn from_defaults(defaults: &JobDefaults) -> Self {
        Self {
            job_id: String::new(),
            ct_unit_id: String::new(),
            job_type: JobType::default(),
            target_depth_ft: f64::from(DEFAULT_TARGET_DEPTH_FT),
            rih_speed_fpm: defaults.rih_speed_fpm,
            pooh_speed_fpm: defaults.pooh_speed_fpm,
            pump_rate_bpm: defaults.pump_rate_bpm,
            max_pressure_psi: f64::from(defaults.max_pressure_psi),
            broker: DEFAULT_BROKER.to_owned(),
            topic: DEFAULT_TOPIC.to_owned(),
        }
    }

    /// Override speeds, pump rate and pressure limit from a config file section.
    pub fn with_job_defaults(mut self, defaults: &JobDefaults) -> Self {
        self.rih_speed_fpm = defaults.rih_speed_fpm;
        self.pooh_speed_fpm = defaults.pooh_speed_fpm;
        self.pump_rate_bpm = defaults.pump_rate_bpm;
        self.max_pressure_psi = f64::from(defaults.max_pressure_psi);
        self
    }

    pub fn with_broker(mut self, broker: impl Into<String>, topic: impl Into<String>) -> Self {
        self.broker = broker.into();
        self.topic = topic.into();
        self
    }

    pub fn with_rih_speed(mut self, rih_speed_fpm: f64) -> Self {
        self.rih_speed_fpm = rih_speed_fpm;
        self
    }

    pub fn with_pooh_speed(mut self, pooh_speed_fpm: f64) -> Self {
        self.pooh_speed_fpm = pooh_speed_fpm;
        self
    }

    pub fn with_max_pressure(mut self, max_pressure_psi: f64) -> Self {
        self.max_pressure_psi = max_pressure_psi;
        self
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        let invalid = |reason: &str| Err(SimulationError::InvalidConfig(reason.to_owned()));
        if self.job_id.trim().is_empty() {
            return invalid("job id cannot be empty");
        }
        if self.ct_unit_id.trim().is_empty() {
            return invalid("unit id cannot be empty");
        }
        if !self.target_depth_ft.is_finite() || self.target_depth_ft <= 0.0 {
            return invalid("target depth must be greater than zero");
        }
        if !self.rih_speed_fpm.is_finite() || self.rih_speed_fpm <= 0.0 {
            return invalid("rih speed must be positive");
        }
        if !self.pooh_speed_fpm.is_finite() || self.pooh_speed_fpm <= 0.0 {
            return invalid("pooh speed must be positive");
        }
        if !self.pump_rate_bpm.is_finite() || self.pump_rate_bpm < 0.0 {
            return invalid("pump rate cannot be negative");
        }
        if !self.max_pressure_psi.is_finite() || self.max_pressure_psi <= 0.0 {
            return invalid("max pressure must be greater than zero");
        }
        if self.topic.trim().is_empty() {
            return invalid("topic cannot be empty");
        }
        Ok(())
    }
}
