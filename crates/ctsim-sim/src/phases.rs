//! ---
//! ctsim_section: "11-simulation"
//! ctsim_subsection: "module"
//! ctsim_type: "source"
//! ctsim_scope: "code"
//! ctsim_description: "Static phase sequences per job type."
//! ctsim_version: "v0.1.0"
//! ctsim_owner: "tbd"
//! ---
use std::fmt;
use std::time::Duration;

use ctsim_msg::OperationMode;

use crate::job::JobType;

/// One step of a job sequence together with its stopping condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Runs until the target depth is reached.
    RunInHole,
    /// Runs for a fixed span of job time, one tick per simulated second.
    Circulate { duration: Duration },
    /// Runs until the string is back at surface.
    PullOutOfHole,
}

impl Phase {
    pub fn operation(&self) -> OperationMode {
        match self {
            Phase::RunInHole => OperationMode::Rih,
            Phase::Circulate { .. } => OperationMode::Circulate,
            Phase::PullOutOfHole => OperationMode::Pooh,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Circulate { duration } => {
                write!(f, "CIRCULATE({}m)", duration.as_secs() / 60)
            }
            other => f.write_str(other.operation().as_str()),
        }
    }
}

const fn standard_plan(circulate_minutes: u64) -> [Phase; 3] {
    [
        Phase::RunInHole,
        Phase::Circulate {
            duration: Duration::from_secs(circulate_minutes * 60),
        },
        Phase::PullOutOfHole,
    ]
}

static CLEANOUT_PLAN: [Phase; 3] = standard_plan(5);
static NITROGEN_LIFT_PLAN: [Phase; 3] = standard_plan(10);
static ACID_TREATMENT_PLAN: [Phase; 3] = standard_plan(15);
static GENERIC_PLAN: [Phase; 3] = standard_plan(8);

/// Ordered phases executed for `job_type`.
pub fn phase_plan(job_type: JobType) -> &'static [Phase] {
    match job_type {
        JobType::Cln => &CLEANOUT_PLAN,
        JobType::N2l => &NITROGEN_LIFT_PLAN,
        JobType::Act => &ACID_TREATMENT_PLAN,
        JobType::Mil | JobType::Fsh | JobType::Log => &GENERIC_PLAN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circulate_minutes(job_type: JobType) -> u64 {
        phase_plan(job_type)
            .iter()
            .find_map(|phase| match phase {
                Phase::Circulate { duration } => Some(duration.as_secs() / 60),
                _ => None,
            })
            .expect("every plan circulates")
    }

    #[test]
    fn cleanout_plan_is_rih_circulate_pooh() {
        assert_eq!(
            phase_plan(JobType::Cln),
            &[
                Phase::RunInHole,
                Phase::Circulate {
                    duration: Duration::from_secs(300)
                },
                Phase::PullOutOfHole,
            ]
        );
    }

    #[test]
    fn circulation_time_depends_on_job_type() {
        assert_eq!(circulate_minutes(JobType::Cln), 5);
        assert_eq!(circulate_minutes(JobType::N2l), 10);
        assert_eq!(circulate_minutes(JobType::Act), 15);
        for generic in [JobType::Mil, JobType::Fsh, JobType::Log] {
            assert_eq!(circulate_minutes(generic), 8);
        }
    }

    #[test]
    fn every_plan_is_strictly_linear() {
        for job_type in JobType::ALL {
            let operations: Vec<_> = phase_plan(job_type)
                .iter()
                .map(Phase::operation)
                .collect();
            assert_eq!(
                operations,
                vec![
                    OperationMode::Rih,
                    OperationMode::Circulate,
                    OperationMode::Pooh
                ]
            );
        }
    }

    #[test]
    fn display_includes_circulation_minutes() {
        let labels: Vec<String> = phase_plan(JobType::Act)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(labels, ["RIH", "CIRCULATE(15m)", "POOH"]);
    }
}
