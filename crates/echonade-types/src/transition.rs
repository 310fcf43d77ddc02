//! Transition events and detector faults

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::JobId;
use crate::job::{Job, Phase, Role};

/// A detected phase change of one job, consumed exactly once by the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub job_id: JobId,
    /// `None` when the job was not known before this observation
    pub previous_phase: Option<Phase>,
    pub new_phase: Phase,
    pub role: Role,
    /// The job as observed when the transition was detected
    pub job: Job,
}

impl TransitionEvent {
    pub fn new(previous_phase: Option<Phase>, job: Job) -> Self {
        Self {
            job_id: job.job_id,
            previous_phase,
            new_phase: job.phase,
            role: job.role,
            job,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.new_phase.is_terminal()
    }
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.previous_phase {
            Some(prev) => write!(
                f,
                "job #{} ({}) {} -> {}",
                self.job_id, self.role, prev, self.new_phase
            ),
            None => write!(f, "job #{} ({}) new -> {}", self.job_id, self.role, self.new_phase),
        }
    }
}

/// Why a snapshot entry was rejected by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum DetectorFault {
    /// Entry missing required fields or carrying invalid values
    Malformed { reason: String },
    /// Job reported under both roles, or under a different role than before
    RoleConflict,
    /// Job listed more than once under the same role
    DuplicateEntry,
    /// Job reported in an earlier phase than already seen
    PhaseRegression { from: Phase, to: Phase },
}

/// A per-job detector failure; other jobs in the same snapshot are unaffected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorError {
    pub job_id: Option<JobId>,
    #[serde(flatten)]
    pub fault: DetectorFault,
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let job = self
            .job_id
            .map(|id| format!("job #{}", id))
            .unwrap_or_else(|| "unidentified job".to_string());
        match &self.fault {
            DetectorFault::Malformed { reason } => write!(f, "{}: malformed entry ({})", job, reason),
            DetectorFault::RoleConflict => write!(f, "{}: reported under conflicting roles", job),
            DetectorFault::DuplicateEntry => write!(f, "{}: listed more than once", job),
            DetectorFault::PhaseRegression { from, to } => {
                write!(f, "{}: phase regressed from {} to {}", job, from, to)
            }
        }
    }
}
