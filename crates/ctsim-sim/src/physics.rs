//! ---
//! ctsim_section: "11-simulation"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Per-tick physical state update for each operation."
//! ctsim_version: "v0.1.0"
//! ctsim_owner: "tbd"
//! ---
//! Linear string-weight and pressure model. The values are illustrative
//! noise around plausible magnitudes, not a calibrated well model.

use ctsim_common::config::PhysicsConfig;
use ctsim_msg::OperationMode;

use crate::job::SimulationConfig;
use crate::noise::NoiseSource;
use crate::state::SimulationState;

/// One tick covers one second of job time; speeds are per minute.
const SECONDS_PER_MINUTE: f64 = 60.0;

/// Applies the per-operation update rules to a [`SimulationState`].
#[derive(Debug, Clone, Copy)]
pub struct TickModel<'a> {
    job: &'a SimulationConfig,
    physics: &'a PhysicsConfig,
}

impl<'a> TickModel<'a> {
    pub fn new(job: &'a SimulationConfig, physics: &'a PhysicsConfig) -> Self {
        Self { job, physics }
    }

    pub fn string_weight_lbs(&self, depth_ft: f64) -> f64 {
        depth_ft * self.physics.unit_weight_lbs_per_ft
    }

    pub fn hydrostatic_psi(&self, depth_ft: f64) -> f64 {
        depth_ft * self.physics.fluid_gradient_psi_per_ft
    }

    /// Lower the string; depth never passes the target.
    pub fn run_in(&self, state: &mut SimulationState, noise: &mut impl NoiseSource) {
        state.operation = OperationMode::Rih;
        state.injector_speed_ft_min =
            self.job.rih_speed_fpm * noise.sample(self.physics.rih_speed_jitter);
        state.depth_ft = (state.depth_ft + state.injector_speed_ft_min / SECONDS_PER_MINUTE)
            .clamp(0.0, self.job.target_depth_ft);
        state.surface_weight_lbs =
            -self.string_weight_lbs(state.depth_ft) * noise.sample(self.physics.rih_weight_jitter);
        self.pump_off(state);
    }

    /// Pump at the configured rate with the string stationary.
    pub fn circulate(&self, state: &mut SimulationState, noise: &mut impl NoiseSource) {
        state.operation = OperationMode::Circulate;
        state.injector_speed_ft_min = 0.0;
        state.surface_weight_lbs = self.string_weight_lbs(state.depth_ft)
            * noise.sample(self.physics.circulate_weight_jitter);
        state.pump_rate_bpm = self.job.pump_rate_bpm;

        let hydrostatic = self.hydrostatic_psi(state.depth_ft);
        let friction = state.pump_rate_bpm * self.physics.friction_psi_per_bpm;
        let pump_pressure =
            friction + hydrostatic + noise.sample(self.physics.pump_pressure_jitter_psi);
        state.pump_pressure_psi = pump_pressure.clamp(0.0, self.job.max_pressure_psi);
        state.annulus_pressure_psi = hydrostatic * noise.sample(self.physics.annulus_fraction);
    }

    /// Retrieve the string; depth never goes above surface.
    pub fn pull_out(&self, state: &mut SimulationState, noise: &mut impl NoiseSource) {
        state.operation = OperationMode::Pooh;
        state.injector_speed_ft_min =
            -self.job.pooh_speed_fpm * noise.sample(self.physics.pooh_speed_jitter);
        state.depth_ft = (state.depth_ft - state.injector_speed_ft_min.abs() / SECONDS_PER_MINUTE)
            .clamp(0.0, self.job.target_depth_ft);
        state.surface_weight_lbs =
            self.string_weight_lbs(state.depth_ft) * noise.sample(self.physics.pooh_weight_jitter);
        self.pump_off(state);
    }

    fn pump_off(&self, state: &mut SimulationState) {
        state.pump_rate_bpm = 0.0;
        state.pump_pressure_psi = 0.0;
        state.annulus_pressure_psi = self.hydrostatic_psi(state.depth_ft);
    }
}
