//! Error types for Echonade
//!
//! Every failure is explicit and carries a message fit for a job's audit
//! trail. None of these errors is allowed to stop an agent's loop.

use thiserror::Error;

use crate::identity::JobId;
use crate::transition::DetectorError;

/// Result type for Echonade operations
pub type Result<T> = std::result::Result<T, EchonadeError>;

/// Echonade error types
#[derive(Debug, Clone, Error)]
pub enum EchonadeError {
    // ========================================================================
    // Producer Errors
    // ========================================================================

    /// Required producer arguments were missing or unreadable
    #[error("One or more required arguments are missing: {detail}")]
    MissingArguments { detail: String },

    /// Job absent from the registry under the expected role
    #[error("Job with id {job_id} not found in active {role} jobs")]
    JobNotFound { job_id: JobId, role: String },

    /// A kind-specific precondition did not hold
    #[error("{message}")]
    PreconditionFailed { job_id: JobId, message: String },

    /// External generation or issuing service failed
    #[error("Failed to produce {deliverable}: {reason}")]
    ProductionFailed { deliverable: String, reason: String },

    // ========================================================================
    // Ledger Errors
    // ========================================================================

    /// A produced item already exists for the job
    #[error("A deliverable has already been produced for job {job_id}")]
    DuplicateProduction { job_id: JobId },

    // ========================================================================
    // Detection & Dispatch Errors
    // ========================================================================

    /// A snapshot entry could not be processed
    #[error("Detector error: {0}")]
    Detector(DetectorError),

    /// The decision capability did not answer in time
    #[error("Dispatch for job {job_id} timed out after {timeout_ms}ms")]
    DispatchTimeout { job_id: JobId, timeout_ms: u64 },

    /// The decision capability reported a failure
    #[error("Decision for job {job_id} failed: {reason}")]
    DecisionFailed { job_id: JobId, reason: String },

    // ========================================================================
    // Collaborator Errors
    // ========================================================================

    /// Payment for a job failed
    #[error("Payment for job {job_id} failed: {reason}")]
    PaymentFailed { job_id: JobId, reason: String },

    /// The marketplace snapshot could not be fetched
    #[error("Marketplace snapshot unavailable: {reason}")]
    SnapshotUnavailable { reason: String },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Invalid input
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EchonadeError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing arguments error
    pub fn missing_arguments(detail: impl Into<String>) -> Self {
        Self::MissingArguments {
            detail: detail.into(),
        }
    }

    /// Create a precondition failure for a job
    pub fn precondition(job_id: JobId, message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            job_id,
            message: message.into(),
        }
    }

    /// Job the error is about, when there is one
    pub fn job_id(&self) -> Option<JobId> {
        match self {
            Self::JobNotFound { job_id, .. }
            | Self::PreconditionFailed { job_id, .. }
            | Self::DuplicateProduction { job_id }
            | Self::DispatchTimeout { job_id, .. }
            | Self::DecisionFailed { job_id, .. }
            | Self::PaymentFailed { job_id, .. } => Some(*job_id),
            Self::Detector(err) => err.job_id,
            _ => None,
        }
    }

    /// Whether the next polling cycle may succeed where this one failed
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::PreconditionFailed { .. }
                | Self::ProductionFailed { .. }
                | Self::DispatchTimeout { .. }
                | Self::DecisionFailed { .. }
                | Self::PaymentFailed { .. }
                | Self::SnapshotUnavailable { .. }
                | Self::Internal { .. }
        )
    }

    /// Get an error code for logs and audit entries
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingArguments { .. } => "MISSING_ARGUMENTS",
            Self::JobNotFound { .. } => "JOB_NOT_FOUND",
            Self::PreconditionFailed { .. } => "PRECONDITION_FAILED",
            Self::ProductionFailed { .. } => "PRODUCTION_FAILED",
            Self::DuplicateProduction { .. } => "DUPLICATE_PRODUCTION",
            Self::Detector(_) => "DETECTOR_ERROR",
            Self::DispatchTimeout { .. } => "DISPATCH_TIMEOUT",
            Self::DecisionFailed { .. } => "DECISION_FAILED",
            Self::PaymentFailed { .. } => "PAYMENT_FAILED",
            Self::SnapshotUnavailable { .. } => "SNAPSHOT_UNAVAILABLE",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<DetectorError> for EchonadeError {
    fn from(err: DetectorError) -> Self {
        Self::Detector(err)
    }
}
