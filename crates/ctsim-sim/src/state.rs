//! ---
//! ctsim_section: "11-simulation"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Mutable physical state of the simulated string."
//! ctsim_version: "v0.1.0"
//! ctsim_owner: "tbd"
//! ---
use ctsim_msg::{OperationMode, TelemetrySample};

/// Physical state advanced once per tick by the active phase.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimulationState {
    pub depth_ft: f64,
    pub operation: OperationMode,
    /// Negative while the string is in compression.
    pub surface_weight_lbs: f64,
    pub pump_pressure_psi: f64,
    pub annulus_pressure_psi: f64,
    pub pump_rate_bpm: f64,
    pub injector_speed_ft_min: f64,
}

impl SimulationState {
    /// String at surface, nothing running.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn sample(&self) -> TelemetrySample {
        TelemetrySample {
            depth_ft: self.depth_ft,
            injector_speed_ft_min: self.injector_speed_ft_min,
            surface_weight_lbs: self.surface_weight_lbs,
            pump_pressure_psi: self.pump_pressure_psi,
            annulus_pressure_psi: self.annulus_pressure_psi,
            pump_rate_bpm: self.pump_rate_bpm,
            operation: self.operation,
        }
    }
}
