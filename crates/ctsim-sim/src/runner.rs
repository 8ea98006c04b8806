//! ---
//! ctsim_section: "11-simulation"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Job runner: phase sequencing and the tick-to-publish loop."
//! ctsim_version: "v0.1.0"
//! ctsim_owner: "tbd"
//! ---
use std::time::Duration;

use chrono::Utc;
use ctsim_common::config::{PacingConfig, PhysicsConfig};
use ctsim_common::logging::{log_job_event, JobEventOutcome, LogContext};
use ctsim_msg::{Publisher, TelemetryRecord};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::job::SimulationConfig;
use crate::noise::NoiseSource;
use crate::phases::{phase_plan, Phase};
use crate::physics::TickModel;
use crate::state::SimulationState;
use crate::SimulationError;

/// Sending half of a cooperative cancellation flag.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Request cancellation; idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving half observed by the runner once per tick.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, ShutdownSignal { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        Self::channel().1
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for `duration`, returning early if cancellation is requested.
    async fn pause(&mut self, duration: Duration) {
        if duration.is_zero() || self.is_triggered() {
            return;
        }
        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);
        let trigger_dropped = tokio::select! {
            _ = &mut sleep => false,
            changed = self.rx.wait_for(|stopped| *stopped) => changed.is_err(),
        };
        if trigger_dropped {
            sleep.await;
        }
    }
}

/// How a job run ended when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Cancelled,
}

/// Per-phase accounting returned in the [`JobReport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub ticks: u64,
    pub final_depth_ft: f64,
    /// False when cancellation interrupted the phase.
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub outcome: JobOutcome,
    pub records_published: u64,
    pub phases: Vec<PhaseSummary>,
    pub final_state: SimulationState,
}

/// Drives one job through its phase sequence, publishing one record per tick.
///
/// The publisher is owned for the whole run and shut down exactly once on
/// every exit path: completion, cancellation, or a fatal publish error.
/// `Publisher::publish` runs inline and may block (the Kafka publisher waits
/// for acks), so drive the runner on the multi-thread runtime.
pub struct JobRunner<P, N> {
    job: SimulationConfig,
    physics: PhysicsConfig,
    pacing: PacingConfig,
    publisher: P,
    noise: N,
    state: SimulationState,
    records_published: u64,
    phases: Vec<PhaseSummary>,
}

impl<P: Publisher, N: NoiseSource> JobRunner<P, N> {
    pub fn new(job: SimulationConfig, publisher: P, noise: N) -> Result<Self, SimulationError> {
        job.validate()?;
        Ok(Self {
            job,
            physics: PhysicsConfig::default(),
            pacing: PacingConfig::default(),
            publisher,
            noise,
            state: SimulationState::idle(),
            records_published: 0,
            phases: Vec::new(),
        })
    }

    pub fn with_physics(mut self, physics: PhysicsConfig) -> Self {
        self.physics = physics;
        self
    }

    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    /// Run the full phase sequence for the configured job type.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) -> Result<JobReport, SimulationError> {
        self.announce();
        let result = self.run_phases(&mut shutdown).await;
        let closed = self.publisher.shutdown();

        let ctx = LogContext::new()
            .with_job(&self.job.job_id)
            .with_unit(&self.job.ct_unit_id)
            .with_tick(self.records_published)
            .with_operation(self.state.operation.as_str());

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                if let Err(close_err) = closed {
                    warn!(error = %close_err, "publisher shutdown failed after job error");
                }
                log_job_event(
                    Some(&ctx),
                    "job.failed",
                    &err.to_string(),
                    JobEventOutcome::Fault,
                );
                return Err(err);
            }
        };
        closed?;

        match outcome {
            JobOutcome::Completed => log_job_event(
                Some(&ctx),
                "job.completed",
                "job sequence completed",
                JobEventOutcome::Success,
            ),
            JobOutcome::Cancelled => log_job_event(
                Some(&ctx),
                "job.cancelled",
                "job cancelled; publisher shut down",
                JobEventOutcome::Cancelled,
            ),
        }

        Ok(JobReport {
            outcome,
            records_published: self.records_published,
            phases: self.phases,
            final_state: self.state,
        })
    }

    fn announce(&self) {
        let plan = phase_plan(self.job.job_type)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        info!(
            job = %self.job.job_id,
            job_type = %self.job.job_type,
            description = self.job.job_type.description(),
            unit = %self.job.ct_unit_id,
            target_depth_ft = self.job.target_depth_ft,
            broker = %self.job.broker,
            topic = %self.job.topic,
            publisher = self.publisher.name(),
            plan = %plan,
            "coiled tubing simulation starting"
        );
    }

    async fn run_phases(&mut self, shutdown: &mut ShutdownSignal) -> Result<JobOutcome, SimulationError> {
        self.physics
            .validate()
            .and_then(|()| self.pacing.validate())
            .map_err(|err| SimulationError::InvalidConfig(format!("{:#}", err)))?;
        for (index, phase) in phase_plan(self.job.job_type).iter().enumerate() {
            if index > 0 {
                shutdown.pause(self.pacing.phase_pause).await;
            }
            if shutdown.is_triggered() {
                return Ok(JobOutcome::Cancelled);
            }
            let outcome = self.run_phase(*phase, shutdown).await?;
            if outcome == JobOutcome::Cancelled {
                return Ok(outcome);
            }
        }
        Ok(JobOutcome::Completed)
    }

    async fn run_phase(
        &mut self,
        phase: Phase,
        shutdown: &mut ShutdownSignal,
    ) -> Result<JobOutcome, SimulationError> {
        self.state.operation = phase.operation();
        {
            let ctx = LogContext::new()
                .with_job(&self.job.job_id)
                .with_unit(&self.job.ct_unit_id)
                .with_tick(self.records_published)
                .with_operation(phase.operation().as_str());
            let message = format!("{} starting at {:.1} ft", phase, self.state.depth_ft);
            log_job_event(Some(&ctx), "phase.started", &message, JobEventOutcome::Success);
        }

        let mut ticks = 0u64;
        let outcome = loop {
            if !self.phase_pending(phase, ticks) {
                break JobOutcome::Completed;
            }
            if shutdown.is_triggered() {
                break JobOutcome::Cancelled;
            }
            self.tick(phase)?;
            ticks += 1;
            shutdown.pause(self.pacing.tick_interval).await;
        };

        debug!(%phase, ticks, depth_ft = self.state.depth_ft, ?outcome, "phase finished");
        self.phases.push(PhaseSummary {
            phase,
            ticks,
            final_depth_ft: self.state.depth_ft,
            completed: outcome == JobOutcome::Completed,
        });
        Ok(outcome)
    }

    fn phase_pending(&self, phase: Phase, ticks: u64) -> bool {
        match phase {
            Phase::RunInHole => self.state.depth_ft < self.job.target_depth_ft,
            Phase::Circulate { duration } => ticks < duration.as_secs(),
            Phase::PullOutOfHole => self.state.depth_ft > 0.0,
        }
    }

    fn tick(&mut self, phase: Phase) -> Result<(), SimulationError> {
        let model = TickModel::new(&self.job, &self.physics);
        match phase {
            Phase::RunInHole => model.run_in(&mut self.state, &mut self.noise),
            Phase::Circulate { .. } => model.circulate(&mut self.state, &mut self.noise),
            Phase::PullOutOfHole => model.pull_out(&mut self.state, &mut self.noise),
        }

        let record = TelemetryRecord::capture(
            &self.job.job_id,
            &self.job.ct_unit_id,
            &self.state.sample(),
            Utc::now(),
        );
        let payload = record.to_payload()?;
        self.publisher.publish(&self.job.topic, &payload)?;
        self.records_published += 1;

        info!(
            time = %record.time_label(),
            depth_ft = record.depth_ft,
            weight_lbs = record.surface_weight_lbs,
            pump_pressure_psi = record.pump_pressure_psi,
            operation = %record.operation_mode,
            "telemetry published"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobType;
    use crate::noise::{ConstantNoise, SeededNoise};
    use ctsim_msg::{InMemoryPublisher, OperationMode, PublishError};

    fn shallow_job(job_type: JobType) -> SimulationConfig {
        SimulationConfig::new("job-1", "ct-7", job_type, 100)
    }

    #[tokio::test(start_paused = true)]
    async fn cleanout_runs_every_phase_in_order() {
        let collector = InMemoryPublisher::new();
        let runner = JobRunner::new(
            shallow_job(JobType::Cln),
            collector.clone(),
            ConstantNoise::midpoint(),
        )
        .unwrap();

        let report = runner.run(ShutdownSignal::never()).await.unwrap();

        assert_eq!(report.outcome, JobOutcome::Completed);
        let phases: Vec<Phase> = report.phases.iter().map(|summary| summary.phase).collect();
        assert_eq!(phases, phase_plan(JobType::Cln));
        // 60 ft/min at midpoint jitter is exactly 1 ft per tick.
        assert_eq!(report.phases[0].ticks, 100);
        assert_eq!(report.phases[0].final_depth_ft, 100.0);
        assert_eq!(report.phases[1].ticks, 300);
        assert_eq!(report.phases[2].final_depth_ft, 0.0);
        assert!(report.phases.iter().all(|summary| summary.completed));
        assert_eq!(report.records_published, collector.len() as u64);
        assert_eq!(collector.shutdown_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn records_respect_depth_and_pressure_bounds() {
        let collector = InMemoryPublisher::new();
        let job = SimulationConfig::new("job-1", "ct-7", JobType::Cln, 2_000)
            .with_rih_speed(600.0)
            .with_pooh_speed(900.0)
            .with_max_pressure(1_200.0);
        let runner = JobRunner::new(job, collector.clone(), SeededNoise::new(11)).unwrap();

        runner.run(ShutdownSignal::never()).await.unwrap();

        let records = collector.records().unwrap();
        assert!(!records.is_empty());
        for record in &records {
            assert!((0.0..=2_000.0).contains(&record.depth_ft));
            assert!(record.pump_pressure_psi <= 1_200);
            assert_eq!(record.hookload_lbs, record.surface_weight_lbs.abs());
            assert_eq!(
                record.injector_force_lbs,
                (0.8 * record.hookload_lbs as f64).round() as i64
            );
            assert_eq!(record.speed_ft_min, record.injector_speed_ft_min);
        }
        let rih: Vec<_> = records
            .iter()
            .filter(|record| record.operation_mode == OperationMode::Rih)
            .collect();
        assert_eq!(rih.last().map(|record| record.depth_ft), Some(2_000.0));
        assert!(rih.iter().all(|record| record.surface_weight_lbs <= 0));
        assert_eq!(records.last().map(|record| record.depth_ft), Some(0.0));
        assert!(records.iter().all(|record| record.job_id == "job-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn every_tick_publishes_to_the_configured_topic() {
        let collector = InMemoryPublisher::new();
        let job = shallow_job(JobType::Cln).with_broker("broker:9092", "rig.ct");
        let runner = JobRunner::new(job, collector.clone(), SeededNoise::new(5)).unwrap();

        let report = runner.run(ShutdownSignal::never()).await.unwrap();

        let ticks: u64 = report.phases.iter().map(|summary| summary.ticks).sum();
        assert_eq!(ticks, report.records_published);
        assert!(collector.messages().iter().all(|message| message.topic == "rig.ct"));
    }

    #[tokio::test(start_paused = true)]
    async fn equal_seeds_produce_identical_sequences() {
        async fn run(seed: u64) -> Vec<TelemetryRecord> {
            let collector = InMemoryPublisher::new();
            let runner =
                JobRunner::new(shallow_job(JobType::N2l), collector.clone(), SeededNoise::new(seed))
                    .unwrap();
            runner.run(ShutdownSignal::never()).await.unwrap();
            collector
                .records()
                .unwrap()
                .into_iter()
                .map(|mut record| {
                    record.time = chrono::DateTime::<chrono::Utc>::UNIX_EPOCH;
                    record
                })
                .collect()
        }

        let first = run(99).await;
        let second = run(99).await;
        assert_eq!(first, second);
        assert_ne!(first, run(100).await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_publishes_nothing() {
        let collector = InMemoryPublisher::new();
        let (trigger, signal) = ShutdownSignal::channel();
        trigger.trigger();
        let runner =
            JobRunner::new(shallow_job(JobType::Cln), collector.clone(), SeededNoise::new(1))
                .unwrap();

        let report = runner.run(signal).await.unwrap();

        assert_eq!(report.outcome, JobOutcome::Cancelled);
        assert!(collector.is_empty());
        assert!(report.phases.is_empty());
        assert_eq!(collector.shutdown_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_failure_still_shuts_down_once() {
        let collector = InMemoryPublisher::failing_after(3);
        let runner =
            JobRunner::new(shallow_job(JobType::Cln), collector.clone(), SeededNoise::new(1))
                .unwrap();

        let err = runner.run(ShutdownSignal::never()).await.unwrap_err();

        assert!(matches!(
            err,
            SimulationError::Publish(PublishError::Send { .. })
        ));
        assert_eq!(collector.len(), 3);
        assert_eq!(collector.shutdown_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_speed_range_fails_before_any_tick() {
        let collector = InMemoryPublisher::new();
        let mut physics = PhysicsConfig::default();
        physics.rih_speed_jitter = ctsim_common::config::JitterRange::new(0.0, 0.0);
        let runner = JobRunner::new(
            shallow_job(JobType::Cln),
            collector.clone(),
            ConstantNoise::midpoint(),
        )
        .unwrap()
        .with_physics(physics);

        let err = runner.run(ShutdownSignal::never()).await.unwrap_err();

        assert!(matches!(
            err,
            SimulationError::InvalidConfig(ref reason) if reason.contains("rih_speed_jitter")
        ));
        assert!(collector.is_empty());
        assert_eq!(collector.shutdown_calls(), 1);
    }

    #[test]
    fn invalid_job_is_rejected_before_running() {
        let job = SimulationConfig::new("", "ct-7", JobType::Cln, 100);
        let result = JobRunner::new(job, InMemoryPublisher::new(), SeededNoise::new(1));
        assert!(matches!(result, Err(SimulationError::InvalidConfig(_))));
    }
}
