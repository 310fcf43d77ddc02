//! Per-agent audit trail of detections, dispatches and ledger effects

use chrono::{DateTime, Utc};
use echonade_types::JobId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditStage {
    Detect,
    Dispatch,
    Ledger,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrailEvent {
    pub timestamp: DateTime<Utc>,
    pub stage: AuditStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditTrail {
    pub agent: String,
    pub created_at: DateTime<Utc>,
    pub events: Vec<AuditTrailEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

impl AuditTrail {
    pub fn new(agent: impl Into<String>, max_entries: Option<usize>) -> Self {
        Self {
            agent: agent.into(),
            created_at: Utc::now(),
            events: Vec::new(),
            max_entries,
        }
    }

    pub fn record(
        &mut self,
        stage: AuditStage,
        job_id: Option<JobId>,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        self.events.push(AuditTrailEvent {
            timestamp: Utc::now(),
            stage,
            job_id,
            message: message.into(),
            data,
        });
        if let Some(max) = self.max_entries {
            if self.events.len() > max {
                let overflow = self.events.len() - max;
                self.events.drain(0..overflow);
            }
        }
    }

    /// Entries about one job, oldest first
    pub fn entries_for(&self, job_id: JobId) -> Vec<&AuditTrailEvent> {
        self.events
            .iter()
            .filter(|e| e.job_id == Some(job_id))
            .collect()
    }

    pub fn count(&self, stage: AuditStage) -> usize {
        self.events.iter().filter(|e| e.stage == stage).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trail_is_capped() {
        let mut trail = AuditTrail::new("Lemo", Some(3));
        for i in 0..5 {
            trail.record(AuditStage::Detect, Some(JobId::new(i)), "transition detected", None);
        }

        assert_eq!(trail.events.len(), 3);
        assert_eq!(trail.events[0].job_id, Some(JobId::new(2)));
    }

    #[test]
    fn test_entries_for_job() {
        let mut trail = AuditTrail::new("Zestie", None);
        trail.record(AuditStage::Detect, Some(JobId::new(1)), "transition detected", None);
        trail.record(AuditStage::Dispatch, Some(JobId::new(2)), "dispatched", None);
        trail.record(AuditStage::Error, Some(JobId::new(1)), "decision failed", None);

        let entries = trail.entries_for(JobId::new(1));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].stage, AuditStage::Error);
        assert_eq!(trail.count(AuditStage::Dispatch), 1);
    }
}
