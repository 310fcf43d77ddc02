use echonade_types::{EchonadeError, JobId};
use thiserror::Error;

use crate::kind::DeliverableKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProductionError {
    #[error("One or more required arguments are missing: {}", missing.join(", "))]
    MissingArguments { missing: Vec<String> },

    #[error("Job with id {job_id} not found in active seller jobs")]
    JobNotFound { job_id: JobId },

    #[error("{message}")]
    PreconditionFailed { job_id: JobId, message: String },

    #[error("Failed to make {}: {reason}", kind.noun())]
    GenerationFailed { kind: DeliverableKind, reason: String },

    #[error("Failed to make {}: no answer within {timeout_ms}ms", kind.noun())]
    Timeout { kind: DeliverableKind, timeout_ms: u64 },

    #[error("A deliverable has already been produced for job {job_id}")]
    DuplicateProduction { job_id: JobId },

    #[error("No producer registered for {kind}")]
    Unsupported { kind: DeliverableKind },
}

impl ProductionError {
    pub fn precondition(job_id: JobId, message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            job_id,
            message: message.into(),
        }
    }

    /// Whether the same call may succeed on a later cycle
    pub fn is_retriable(&self) -> bool {
        EchonadeError::from(self.clone()).is_retriable()
    }
}

impl From<ProductionError> for EchonadeError {
    fn from(err: ProductionError) -> Self {
        match err {
            ProductionError::MissingArguments { missing } => {
                EchonadeError::missing_arguments(missing.join(", "))
            }
            ProductionError::JobNotFound { job_id } => EchonadeError::JobNotFound {
                job_id,
                role: "seller".to_string(),
            },
            ProductionError::PreconditionFailed { job_id, message } => {
                EchonadeError::precondition(job_id, message)
            }
            ProductionError::GenerationFailed { kind, reason } => EchonadeError::ProductionFailed {
                deliverable: kind.noun().to_string(),
                reason,
            },
            ProductionError::Timeout { kind, timeout_ms } => EchonadeError::ProductionFailed {
                deliverable: kind.noun().to_string(),
                reason: format!("no answer within {}ms", timeout_ms),
            },
            ProductionError::DuplicateProduction { job_id } => {
                EchonadeError::DuplicateProduction { job_id }
            }
            ProductionError::Unsupported { kind } => {
                EchonadeError::invalid_input("deliverable", format!("no producer for {}", kind))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ProductionError>;
