use echonade_types::{AgentId, EchonadeError, JobId, Phase};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    #[error("Agent {0} is not registered")]
    UnknownAgent(AgentId),

    #[error("Job {0} does not exist")]
    UnknownJob(JobId),

    #[error("Agent {agent} is not the {expected} of job {job_id}")]
    NotParticipant {
        agent: AgentId,
        job_id: JobId,
        expected: &'static str,
    },

    #[error("Job {job_id} is in {actual}, expected {expected}")]
    WrongPhase {
        job_id: JobId,
        expected: Phase,
        actual: Phase,
    },

    #[error("Invalid job: {0}")]
    InvalidJob(String),
}

impl MarketError {
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Self::UnknownJob(job_id)
            | Self::NotParticipant { job_id, .. }
            | Self::WrongPhase { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }
}

impl From<MarketError> for EchonadeError {
    fn from(err: MarketError) -> Self {
        match err.job_id() {
            Some(job_id) => EchonadeError::precondition(job_id, err.to_string()),
            None => EchonadeError::invalid_input("market", err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MarketError>;
