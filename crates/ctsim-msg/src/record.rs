//! ---
//! ctsim_section: "02-messaging"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Telemetry record wire schema, rounding and timestamp format."
//! ctsim_version: "v0.0.0-prealpha"
//! ctsim_owner: "tbd"
//! ---
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Ratio between injector chain force and hookload.
const INJECTOR_FORCE_RATIO: f64 = 0.8;

/// Operation the coiled tubing unit is performing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationMode {
    /// No operation in progress.
    #[default]
    Idle,
    /// Running in hole.
    Rih,
    /// Pumping with the string stationary.
    Circulate,
    /// Pulling out of hole.
    Pooh,
}

impl OperationMode {
    /// Wire label, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationMode::Idle => "IDLE",
            OperationMode::Rih => "RIH",
            OperationMode::Circulate => "CIRCULATE",
            OperationMode::Pooh => "POOH",
        }
    }
}

impl fmt::Display for OperationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw physical readings for one tick, before wire rounding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetrySample {
    /// Measured depth in feet.
    pub depth_ft: f64,
    /// Injector speed in ft/min; negative while pulling out.
    pub injector_speed_ft_min: f64,
    /// Surface weight in lbs; negative means compressive.
    pub surface_weight_lbs: f64,
    /// Pump pressure in psi.
    pub pump_pressure_psi: f64,
    /// Annulus pressure in psi.
    pub annulus_pressure_psi: f64,
    /// Pump rate in barrels per minute.
    pub pump_rate_bpm: f64,
    /// Operation in progress when the sample was taken.
    pub operation: OperationMode,
}

/// One telemetry point as published to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Capture time, ISO-8601 UTC with a trailing `Z`.
    #[serde(serialize_with = "serialize_time")]
    pub time: DateTime<Utc>,
    /// Job identifier.
    pub job_id: String,
    /// Coiled tubing unit identifier.
    pub ct_unit_id: String,
    /// Depth in feet, two decimals.
    pub depth_ft: f64,
    /// Injector speed in ft/min, two decimals.
    pub speed_ft_min: f64,
    /// Signed surface weight in lbs.
    pub surface_weight_lbs: i64,
    /// Absolute surface weight in lbs.
    pub hookload_lbs: i64,
    /// Pump pressure in psi.
    pub pump_pressure_psi: i64,
    /// Annulus pressure in psi.
    pub annulus_pressure_psi: i64,
    /// Pump rate in bpm, two decimals.
    pub pump_rate_bpm: f64,
    /// Same value as `speed_ft_min`.
    pub injector_speed_ft_min: f64,
    /// Injector force in lbs.
    pub injector_force_lbs: i64,
    /// Operation label.
    pub operation_mode: OperationMode,
}

impl TelemetryRecord {
    /// Build the wire record for a sample captured at `time`.
    pub fn capture(
        job_id: &str,
        ct_unit_id: &str,
        sample: &TelemetrySample,
        time: DateTime<Utc>,
    ) -> Self {
        let speed = round2(sample.injector_speed_ft_min);
        let surface_weight = sample.surface_weight_lbs.trunc() as i64;
        let hookload = surface_weight.abs();
        Self {
            time,
            job_id: job_id.to_owned(),
            ct_unit_id: ct_unit_id.to_owned(),
            depth_ft: round2(sample.depth_ft),
            speed_ft_min: speed,
            surface_weight_lbs: surface_weight,
            hookload_lbs: hookload,
            pump_pressure_psi: sample.pump_pressure_psi.trunc() as i64,
            annulus_pressure_psi: sample.annulus_pressure_psi.trunc() as i64,
            pump_rate_bpm: round2(sample.pump_rate_bpm),
            injector_speed_ft_min: speed,
            injector_force_lbs: (hookload as f64 * INJECTOR_FORCE_RATIO).round() as i64,
            operation_mode: sample.operation,
        }
    }

    /// Serialize into the JSON payload handed to a publisher.
    pub fn to_payload(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Render the capture time the way it appears on the wire.
    pub fn time_label(&self) -> String {
        format_time(&self.time)
    }
}

fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    // Avoid publishing "-0.0".
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn serialize_time<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_time(time))
}
