//! ---
//! ctsim_section: "01-core-functionality"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Simulator config file schema, defaults, loading and validation."
//! ctsim_version: "v0.0.0-prealpha"
//! ctsim_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use tracing::debug;

use crate::logging::LogFormat;

fn default_rih_speed() -> f64 {
    60.0
}

fn default_pooh_speed() -> f64 {
    80.0
}

fn default_pump_rate() -> f64 {
    2.5
}

fn default_max_pressure() -> u32 {
    5000
}

fn default_unit_weight() -> f64 {
    2.45
}

fn default_fluid_gradient() -> f64 {
    0.465
}

fn default_friction() -> f64 {
    200.0
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_phase_pause() -> Duration {
    Duration::from_secs(2)
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Top-level configuration file for the simulator.
///
/// Everything in here is optional; a missing file yields the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulatorFileConfig {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub job: JobDefaults,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where a [`SimulatorFileConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SimulatorFileConfig,
    /// `None` when no file was found and defaults are in effect.
    pub source: Option<PathBuf>,
}

impl SimulatorFileConfig {
    pub const ENV_CONFIG_PATH: &'static str = "CTSIM_CONFIG";

    /// Load configuration, respecting the `CTSIM_CONFIG` override and falling back to defaults.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedConfig {
                    config,
                    source: Some(path),
                });
            }
        }
        Self::load_from_candidates(candidates)
    }

    /// Load the first existing candidate, ignoring the environment override.
    pub fn load_from_candidates<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedConfig> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!(
            inspected = candidates.len(),
            "no configuration file found; using defaults"
        );
        Ok(LoadedConfig {
            config: Self::default(),
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<SimulatorFileConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.job.validate()?;
        self.physics.validate()?;
        self.pacing.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for SimulatorFileConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: SimulatorFileConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Job parameters that the CLI does not expose directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefaults {
    #[serde(default = "default_rih_speed")]
    pub rih_speed_fpm: f64,
    #[serde(default = "default_pooh_speed")]
    pub pooh_speed_fpm: f64,
    #[serde(default = "default_pump_rate")]
    pub pump_rate_bpm: f64,
    #[serde(default = "default_max_pressure")]
    pub max_pressure_psi: u32,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            rih_speed_fpm: default_rih_speed(),
            pooh_speed_fpm: default_pooh_speed(),
            pump_rate_bpm: default_pump_rate(),
            max_pressure_psi: default_max_pressure(),
        }
    }
}

impl JobDefaults {
    pub fn validate(&self) -> Result<()> {
        if !self.rih_speed_fpm.is_finite() || self.rih_speed_fpm <= 0.0 {
            return Err(anyhow!("job.rih_speed_fpm must be positive"));
        }
        if !self.pooh_speed_fpm.is_finite() || self.pooh_speed_fpm <= 0.0 {
            return Err(anyhow!("job.pooh_speed_fpm must be positive"));
        }
        if !self.pump_rate_bpm.is_finite() || self.pump_rate_bpm < 0.0 {
            return Err(anyhow!("job.pump_rate_bpm cannot be negative"));
        }
        if self.max_pressure_psi == 0 {
            return Err(anyhow!("job.max_pressure_psi must be greater than zero"));
        }
        Ok(())
    }
}

/// Closed interval a multiplicative or additive jitter is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JitterRange {
    pub low: f64,
    pub high: f64,
}

impl JitterRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(anyhow!("jitter range '{}' must be finite", name));
        }
        if self.low > self.high {
            return Err(anyhow!(
                "jitter range '{}' is inverted ({} > {})",
                name,
                self.low,
                self.high
            ));
        }
        Ok(())
    }

    /// Like [`JitterRange::validate`], and every draw must also be strictly positive.
    pub fn validate_positive(&self, name: &str) -> Result<()> {
        self.validate(name)?;
        if self.low <= 0.0 {
            return Err(anyhow!(
                "jitter range '{}' must stay above zero (low = {})",
                name,
                self.low
            ));
        }
        Ok(())
    }
}

/// Illustrative physical constants and jitter bounds used by the per-tick update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Buoyed string weight per foot of tubing in hole.
    #[serde(default = "default_unit_weight")]
    pub unit_weight_lbs_per_ft: f64,
    #[serde(default = "default_fluid_gradient")]
    pub fluid_gradient_psi_per_ft: f64,
    #[serde(default = "default_friction")]
    pub friction_psi_per_bpm: f64,
    #[serde(default = "PhysicsConfig::default_speed_jitter")]
    pub rih_speed_jitter: JitterRange,
    #[serde(default = "PhysicsConfig::default_speed_jitter")]
    pub pooh_speed_jitter: JitterRange,
    #[serde(default = "PhysicsConfig::default_rih_weight_jitter")]
    pub rih_weight_jitter: JitterRange,
    #[serde(default = "PhysicsConfig::default_circulate_weight_jitter")]
    pub circulate_weight_jitter: JitterRange,
    #[serde(default = "PhysicsConfig::default_pooh_weight_jitter")]
    pub pooh_weight_jitter: JitterRange,
    /// Additive psi noise on pump pressure while circulating.
    #[serde(default = "PhysicsConfig::default_pump_pressure_jitter")]
    pub pump_pressure_jitter_psi: JitterRange,
    /// Fraction of hydrostatic pressure seen in the annulus while circulating.
    #[serde(default = "PhysicsConfig::default_annulus_fraction")]
    pub annulus_fraction: JitterRange,
}

impl PhysicsConfig {
    const fn default_speed_jitter() -> JitterRange {
        JitterRange::new(0.9, 1.1)
    }

    const fn default_rih_weight_jitter() -> JitterRange {
        JitterRange::new(0.8, 0.95)
    }

    const fn default_circulate_weight_jitter() -> JitterRange {
        JitterRange::new(0.95, 1.05)
    }

    const fn default_pooh_weight_jitter() -> JitterRange {
        JitterRange::new(1.1, 1.25)
    }

    const fn default_pump_pressure_jitter() -> JitterRange {
        JitterRange::new(50.0, 150.0)
    }

    const fn default_annulus_fraction() -> JitterRange {
        JitterRange::new(0.1, 0.3)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("unit_weight_lbs_per_ft", self.unit_weight_lbs_per_ft),
            ("fluid_gradient_psi_per_ft", self.fluid_gradient_psi_per_ft),
            ("friction_psi_per_bpm", self.friction_psi_per_bpm),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(anyhow!("physics.{} must be a non-negative number", name));
            }
        }
        self.rih_speed_jitter.validate_positive("rih_speed_jitter")?;
        self.pooh_speed_jitter.validate_positive("pooh_speed_jitter")?;
        self.rih_weight_jitter.validate("rih_weight_jitter")?;
        self.circulate_weight_jitter
            .validate("circulate_weight_jitter")?;
        self.pooh_weight_jitter.validate("pooh_weight_jitter")?;
        self.pump_pressure_jitter_psi
            .validate("pump_pressure_jitter_psi")?;
        self.annulus_fraction.validate("annulus_fraction")?;
        Ok(())
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            unit_weight_lbs_per_ft: default_unit_weight(),
            fluid_gradient_psi_per_ft: default_fluid_gradient(),
            friction_psi_per_bpm: default_friction(),
            rih_speed_jitter: Self::default_speed_jitter(),
            pooh_speed_jitter: Self::default_speed_jitter(),
            rih_weight_jitter: Self::default_rih_weight_jitter(),
            circulate_weight_jitter: Self::default_circulate_weight_jitter(),
            pooh_weight_jitter: Self::default_pooh_weight_jitter(),
            pump_pressure_jitter_psi: Self::default_pump_pressure_jitter(),
            annulus_fraction: Self::default_annulus_fraction(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    #[serde(rename = "tick_interval_ms", default = "default_tick_interval")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub tick_interval: Duration,
    /// Idle gap between consecutive phases; no telemetry is emitted during it.
    #[serde(rename = "phase_pause_ms", default = "default_phase_pause")]
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub phase_pause: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
            phase_pause: default_phase_pause(),
        }
    }
}

impl PacingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(anyhow!("pacing.tick_interval_ms must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
    /// Send console logs to stderr, keeping stdout free for telemetry.
    #[serde(default)]
    pub console_stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
            console_stderr: false,
        }
    }
}
