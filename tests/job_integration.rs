//! ---
//! ctsim_section: "15-testing-qa-runbook"
//! ctsim_subsection: "integration-tests"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "End-to-end job runs against in-memory and writer publishers."
//! ctsim_version: "v0.1.0"
//! ctsim_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ctsim_msg::{InMemoryPublisher, PublishError, Publisher, WriterPublisher};
use ctsim_sim::{
    ConstantNoise, JobOutcome, JobRunner, JobType, OperationMode, SeededNoise, ShutdownSignal,
    ShutdownTrigger, SimulationConfig, SimulationError, TelemetryRecord,
};
use parking_lot::Mutex;

fn job(job_type: JobType, target_depth: u32) -> SimulationConfig {
    SimulationConfig::new("JOB-001", "CT-12", job_type, target_depth)
}

/// Triggers cancellation once a given number of CIRCULATE records went out.
struct CancelDuringCirculate {
    inner: InMemoryPublisher,
    trigger: ShutdownTrigger,
    after: usize,
    seen: usize,
}

impl Publisher for CancelDuringCirculate {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> ctsim_msg::Result<()> {
        self.inner.publish(topic, payload)?;
        let record: TelemetryRecord = serde_json::from_slice(payload)?;
        if record.operation_mode == OperationMode::Circulate {
            self.seen += 1;
            if self.seen == self.after {
                self.trigger.trigger();
            }
        }
        Ok(())
    }

    fn shutdown(&mut self) -> ctsim_msg::Result<()> {
        self.inner.shutdown()
    }

    fn name(&self) -> &'static str {
        "cancel-during-circulate"
    }
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn cleanout_job_honours_record_invariants() {
    let collector = InMemoryPublisher::new();
    let runner = JobRunner::new(job(JobType::Cln, 1_500), collector.clone(), SeededNoise::new(7))
        .expect("valid job");

    let report = runner.run(ShutdownSignal::never()).await.expect("job completes");

    assert_eq!(report.outcome, JobOutcome::Completed);
    let records = collector.records().expect("records decode");
    assert_eq!(records.len() as u64, report.records_published);
    for record in &records {
        assert!((0.0..=1_500.0).contains(&record.depth_ft));
        assert!(record.pump_pressure_psi <= 5_000);
        assert_eq!(record.hookload_lbs, record.surface_weight_lbs.abs());
        assert_eq!(
            record.injector_force_lbs,
            (0.8 * record.hookload_lbs as f64).round() as i64
        );
        assert_eq!(record.job_id, "JOB-001");
        assert_eq!(record.ct_unit_id, "CT-12");
    }

    let circulate: Vec<_> = records
        .iter()
        .filter(|record| record.operation_mode == OperationMode::Circulate)
        .collect();
    assert_eq!(circulate.len(), 300);
    assert!(circulate
        .iter()
        .all(|record| record.depth_ft == 1_500.0 && record.speed_ft_min == 0.0));
    assert!(circulate.iter().all(|record| record.pump_rate_bpm == 2.5));
    assert_eq!(collector.shutdown_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn operation_modes_follow_the_linear_sequence() {
    let collector = InMemoryPublisher::new();
    let runner = JobRunner::new(job(JobType::Act, 200), collector.clone(), SeededNoise::new(3))
        .expect("valid job");

    runner.run(ShutdownSignal::never()).await.expect("job completes");

    let mut modes: Vec<OperationMode> = Vec::new();
    for record in collector.records().expect("records decode") {
        if modes.last() != Some(&record.operation_mode) {
            modes.push(record.operation_mode);
        }
    }
    assert_eq!(
        modes,
        [OperationMode::Rih, OperationMode::Circulate, OperationMode::Pooh]
    );
}

#[tokio::test(start_paused = true)]
async fn shallow_job_reaches_target_one_foot_per_tick() {
    let collector = InMemoryPublisher::new();
    let runner = JobRunner::new(job(JobType::Cln, 100), collector.clone(), ConstantNoise::midpoint())
        .expect("valid job");

    let report = runner.run(ShutdownSignal::never()).await.expect("job completes");

    let rih = &report.phases[0];
    assert_eq!(rih.ticks, 100);
    assert_eq!(rih.final_depth_ft, 100.0);
    let records = collector.records().expect("records decode");
    assert_eq!(records[0].depth_ft, 1.0);
    assert_eq!(records[99].depth_ft, 100.0);
    assert_eq!(records.last().map(|record| record.depth_ft), Some(0.0));
}

#[tokio::test(start_paused = true)]
async fn cancelling_mid_circulation_stops_telemetry_and_shuts_down_once() {
    let collector = InMemoryPublisher::new();
    let (trigger, shutdown) = ShutdownSignal::channel();
    let publisher = CancelDuringCirculate {
        inner: collector.clone(),
        trigger,
        after: 10,
        seen: 0,
    };
    let runner =
        JobRunner::new(job(JobType::Cln, 100), publisher, SeededNoise::new(1)).expect("valid job");

    let report = runner.run(shutdown).await.expect("cancellation is not an error");

    assert_eq!(report.outcome, JobOutcome::Cancelled);
    assert_eq!(collector.shutdown_calls(), 1);
    let records = collector.records().expect("records decode");
    let last = records.last().expect("records before cancellation");
    assert_eq!(last.operation_mode, OperationMode::Circulate);
    assert!(records
        .iter()
        .all(|record| record.operation_mode != OperationMode::Pooh));
    assert_eq!(
        records
            .iter()
            .filter(|record| record.operation_mode == OperationMode::Circulate)
            .count(),
        10
    );
    let circulate = report.phases.last().expect("circulate summary");
    assert!(!circulate.completed);
    assert_eq!(circulate.ticks, 10);
}

#[tokio::test(start_paused = true)]
async fn cancellation_wakes_the_tick_wait_early() {
    let collector = InMemoryPublisher::new();
    let (trigger, shutdown) = ShutdownSignal::channel();
    let runner = JobRunner::new(job(JobType::Cln, 10_000), collector.clone(), SeededNoise::new(1))
        .expect("valid job");

    let handle = tokio::spawn(runner.run(shutdown));
    tokio::time::sleep(std::time::Duration::from_millis(4_500)).await;
    trigger.trigger();
    let report = handle.await.expect("runner task").expect("job cancels");

    assert_eq!(report.outcome, JobOutcome::Cancelled);
    assert_eq!(report.records_published, 5);
    assert_eq!(collector.shutdown_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn identical_seeds_replay_identical_telemetry() {
    async fn run(seed: u64) -> Vec<TelemetryRecord> {
        let collector = InMemoryPublisher::new();
        JobRunner::new(job(JobType::Mil, 300), collector.clone(), SeededNoise::new(seed))
            .expect("valid job")
            .run(ShutdownSignal::never())
            .await
            .expect("job completes");
        collector.records().expect("records decode")
    }

    let strip_time = |records: Vec<TelemetryRecord>| -> Vec<TelemetryRecord> {
        records
            .into_iter()
            .map(|mut record| {
                record.time = DateTime::<Utc>::UNIX_EPOCH;
                record
            })
            .collect()
    };

    assert_eq!(strip_time(run(2024).await), strip_time(run(2024).await));
}

#[tokio::test(start_paused = true)]
async fn broker_failure_is_fatal_but_still_closes_the_publisher() {
    let collector = InMemoryPublisher::failing_after(25);
    let runner = JobRunner::new(job(JobType::N2l, 500), collector.clone(), SeededNoise::new(9))
        .expect("valid job");

    let err = runner
        .run(ShutdownSignal::never())
        .await
        .expect_err("send failure aborts the job");

    assert!(matches!(
        err,
        SimulationError::Publish(PublishError::Send { .. })
    ));
    assert_eq!(collector.len(), 25);
    assert_eq!(collector.shutdown_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn dry_run_writes_one_json_line_per_tick() {
    let buffer = SharedBuffer::default();
    let runner = JobRunner::new(
        job(JobType::Log, 120),
        WriterPublisher::new(buffer.clone()),
        SeededNoise::new(4),
    )
    .expect("valid job");

    let report = runner.run(ShutdownSignal::never()).await.expect("job completes");

    let output = String::from_utf8(buffer.0.lock().clone()).expect("utf8 output");
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len() as u64, report.records_published);
    for line in lines {
        let value: serde_json::Value = serde_json::from_str(line).expect("json line");
        let object = value.as_object().expect("record object");
        assert_eq!(object.len(), 13);
        let time = object["time"].as_str().expect("time string");
        assert!(time.ends_with('Z'));
        assert!(matches!(
            object["operation_mode"].as_str(),
            Some("RIH" | "CIRCULATE" | "POOH")
        ));
    }
}
