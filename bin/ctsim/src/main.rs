//! ---
//! ctsim_section: "01-core-functionality"
//! ctsim_subsection: "binary"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Binary entrypoint that simulates one coiled tubing job."
//! ctsim_version: "v0.1.0"
//! ctsim_owner: "tbd"
//! ---
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use ctsim_common::config::SimulatorFileConfig;
use ctsim_common::logging::{init_tracing, LogFormat};
use ctsim_common::version::VersionInfo;
use ctsim_msg::{KafkaPublisher, Publisher, WriterPublisher};
use ctsim_sim::job::{DEFAULT_BROKER, DEFAULT_TARGET_DEPTH_FT, DEFAULT_TOPIC};
use ctsim_sim::{JobOutcome, JobRunner, JobType, SeededNoise, ShutdownSignal, SimulationConfig};
use tokio::signal;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "configs/ctsim.toml";

#[derive(Debug, Parser)]
#[command(
    author,
    disable_version_flag = true,
    about = "Publish simulated coiled tubing job telemetry",
    long_about = None
)]
struct Cli {
    /// Job identifier embedded in every record
    #[arg(long, required_unless_present = "version")]
    job_id: Option<String>,

    /// Coiled tubing unit identifier embedded in every record
    #[arg(long, required_unless_present = "version")]
    unit_id: Option<String>,

    /// Job type selecting the phase sequence
    #[arg(long, value_enum, ignore_case = true, default_value_t = CliJobType::Cln)]
    job_type: CliJobType,

    /// Target depth in feet
    #[arg(long, default_value_t = DEFAULT_TARGET_DEPTH_FT)]
    target_depth: u32,

    /// Broker address (host:port)
    #[arg(long, default_value = DEFAULT_BROKER)]
    kafka_broker: String,

    /// Topic the telemetry is published to
    #[arg(long, default_value = DEFAULT_TOPIC)]
    kafka_topic: String,

    /// Path to a TOML file with physics, pacing and logging settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Noise seed; overrides the config file, random when neither sets one
    #[arg(long)]
    seed: Option<u64>,

    /// Where telemetry goes
    #[arg(long, value_enum, default_value_t = Sink::Kafka)]
    sink: Sink,

    /// Override the console log format from the config file
    #[arg(long, value_enum)]
    log_format: Option<CliLogFormat>,

    /// Print extended version information and exit
    #[arg(short = 'V', long = "version", action = ArgAction::SetTrue)]
    version: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliJobType {
    #[value(name = "CLN")]
    Cln,
    #[value(name = "N2L")]
    N2l,
    #[value(name = "ACT")]
    Act,
    #[value(name = "MIL")]
    Mil,
    #[value(name = "FSH")]
    Fsh,
    #[value(name = "LOG")]
    Log,
}

impl From<CliJobType> for JobType {
    fn from(value: CliJobType) -> Self {
        match value {
            CliJobType::Cln => JobType::Cln,
            CliJobType::N2l => JobType::N2l,
            CliJobType::Act => JobType::Act,
            CliJobType::Mil => JobType::Mil,
            CliJobType::Fsh => JobType::Fsh,
            CliJobType::Log => JobType::Log,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Sink {
    /// Publish to the Kafka broker
    Kafka,
    /// Dry run: print newline-delimited JSON records on stdout
    Stdout,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogFormat {
    Pretty,
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Pretty => LogFormat::Pretty,
            CliLogFormat::Json => LogFormat::StructuredJson,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let version = VersionInfo::current();
    if cli.version {
        println!("{}", version.extended());
        return Ok(());
    }

    let loaded = SimulatorFileConfig::load_with_source(&config_candidates(&cli))?;
    let mut file_config = loaded.config;
    if let Some(format) = cli.log_format {
        file_config.logging.format = format.into();
    }
    if cli.sink == Sink::Stdout {
        file_config.logging.console_stderr = true;
    }
    init_tracing("ctsim", &file_config.logging)?;

    info!(banner = %version.banner(), profile = %version.profile, "ctsim starting");
    match &loaded.source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; using built-in defaults"),
    }

    let job = build_job(&cli, &file_config)?;
    let noise = match cli.seed.or(file_config.seed) {
        Some(seed) => SeededNoise::new(seed),
        None => SeededNoise::from_entropy(),
    };
    info!(seed = noise.seed(), "noise source seeded");

    let publisher = open_publisher(cli.sink, &job)?;
    let runner = JobRunner::new(job, publisher, noise)?
        .with_physics(file_config.physics)
        .with_pacing(file_config.pacing);

    let (trigger, shutdown) = ShutdownSignal::channel();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received; cancelling job");
                trigger.trigger();
            }
            Err(err) => warn!(error = %err, "unable to listen for ctrl-c"),
        }
    });

    let report = runner.run(shutdown).await?;
    let status = match report.outcome {
        JobOutcome::Completed => "completed",
        JobOutcome::Cancelled => "cancelled",
    };
    info!(
        status,
        records = report.records_published,
        phases = report.phases.len(),
        final_depth_ft = report.final_state.depth_ft,
        "simulation finished"
    );
    Ok(())
}

fn config_candidates(cli: &Cli) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from(DEFAULT_CONFIG_PATH));
    candidates
}

fn build_job(cli: &Cli, file_config: &SimulatorFileConfig) -> Result<SimulationConfig> {
    let job_id = cli
        .job_id
        .as_deref()
        .ok_or_else(|| anyhow!("--job-id is required"))?;
    let unit_id = cli
        .unit_id
        .as_deref()
        .ok_or_else(|| anyhow!("--unit-id is required"))?;
    let job = SimulationConfig::new(job_id, unit_id, cli.job_type.into(), cli.target_depth)
        .with_job_defaults(&file_config.job)
        .with_broker(cli.kafka_broker.as_str(), cli.kafka_topic.as_str());
    job.validate().context("invalid job parameters")?;
    Ok(job)
}

fn open_publisher(sink: Sink, job: &SimulationConfig) -> Result<Box<dyn Publisher>> {
    match sink {
        Sink::Kafka => {
            let publisher = KafkaPublisher::connect(&job.broker)
                .with_context(|| format!("unable to reach broker {}", job.broker))?;
            Ok(Box::new(publisher))
        }
        Sink::Stdout => Ok(Box::new(WriterPublisher::stdout())),
    }
}
