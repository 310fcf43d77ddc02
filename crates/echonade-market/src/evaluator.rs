use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::job::MarketJob;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub approved: bool,
    pub reasoning: String,
}

impl Verdict {
    pub fn approve(reasoning: impl Into<String>) -> Self {
        Self {
            approved: true,
            reasoning: reasoning.into(),
        }
    }

    pub fn reject(reasoning: impl Into<String>) -> Self {
        Self {
            approved: false,
            reasoning: reasoning.into(),
        }
    }
}

/// Judges delivered jobs on behalf of the buyer
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, job: &MarketJob) -> Verdict;
}

/// Approves every deliverable
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl Evaluator for AutoApprove {
    async fn evaluate(&self, job: &MarketJob) -> Verdict {
        tracing::info!(job_id = %job.job_id, delivery = ?job.delivery, "evaluating deliverable");
        Verdict::approve("Trust me.")
    }
}
