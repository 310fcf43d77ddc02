//! Collaborator capabilities consumed by the kernel

use async_trait::async_trait;
use echonade_types::{AgentId, EchonadeError, JobId, MarketSnapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::Instruction;

/// What the decision capability reports back once it has acted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub summary: String,
}

impl DecisionOutcome {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum DecisionError {
    #[error("Action failed: {0}")]
    ActionFailed(String),
    #[error("Decision capability unavailable: {0}")]
    Unavailable(String),
}

/// Turns an instruction into an action. Opaque to the kernel; it may call
/// back into producers or the payment capability.
#[async_trait]
pub trait DecisionCapability: Send + Sync {
    async fn decide(&self, instruction: &Instruction) -> Result<DecisionOutcome, DecisionError>;
}

/// Read-only view of the marketplace. Reading must never advance a phase.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn get_state(&self, agent: AgentId) -> Result<MarketSnapshot, EchonadeError>;
}

/// Settles the payment of a job on behalf of the buyer
#[async_trait]
pub trait PaymentCapability: Send + Sync {
    async fn pay(&self, payer: AgentId, job_id: JobId) -> Result<(), EchonadeError>;
}
