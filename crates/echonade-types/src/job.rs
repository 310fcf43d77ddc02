//! Job, phase and role types
//!
//! A job is a unit of commerce between two agents. Its phase only ever moves
//! forward along a fixed partial order, and only the marketplace advances it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::identity::JobId;

/// Lifecycle phase of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Request,
    Negotiation,
    Transaction,
    Evaluation,
    Completed,
    Rejected,
}

impl Phase {
    /// All phases in lifecycle order
    pub const ALL: [Phase; 6] = [
        Phase::Request,
        Phase::Negotiation,
        Phase::Transaction,
        Phase::Evaluation,
        Phase::Completed,
        Phase::Rejected,
    ];

    /// Position along the happy path. REJECTED has no position of its own;
    /// it is reachable from every non-terminal phase.
    fn rank(&self) -> u8 {
        match self {
            Phase::Request => 0,
            Phase::Negotiation => 1,
            Phase::Transaction => 2,
            Phase::Evaluation => 3,
            Phase::Completed | Phase::Rejected => 4,
        }
    }

    /// COMPLETED and REJECTED end a job
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Completed | Phase::Rejected)
    }

    /// Whether `next` is a legal forward move from this phase.
    ///
    /// Skipping phases is allowed (a poller may miss intermediate phases);
    /// staying in place, moving backwards, or leaving a terminal phase is not.
    pub fn can_advance_to(&self, next: Phase) -> bool {
        if self.is_terminal() || *self == next {
            return false;
        }
        next == Phase::Rejected || next.rank() > self.rank()
    }

    /// Terminal phase inferred for a job that disappeared from the marketplace
    /// without an explicit terminal report.
    pub fn inferred_terminal(&self) -> Option<Phase> {
        match self {
            Phase::Completed | Phase::Rejected => None,
            Phase::Evaluation => Some(Phase::Completed),
            _ => Some(Phase::Rejected),
        }
    }

    /// Protocol name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Request => "REQUEST",
            Phase::Negotiation => "NEGOTIATION",
            Phase::Transaction => "TRANSACTION",
            Phase::Evaluation => "EVALUATION",
            Phase::Completed => "COMPLETED",
            Phase::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown phase '{}'", s))
    }
}

/// Role of the observing agent relative to a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Seller,
    Buyer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Seller => "SELLER",
            Role::Buyer => "BUYER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job as seen by one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub phase: Phase,
    pub role: Role,
    pub counterparty: String,
    pub price: f64,
    /// Protocol fields the core does not interpret
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Wire shape of a job entry inside a marketplace snapshot
#[derive(Debug, Deserialize)]
struct JobEntry {
    #[serde(rename = "jobId")]
    job_id: JobId,
    phase: Phase,
    counterparty: String,
    price: f64,
    #[serde(flatten)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

/// A snapshot entry that could not be turned into a [`Job`]
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedEntry {
    /// The job id, when the entry carried a readable one
    pub job_id: Option<JobId>,
    pub reason: String,
}

impl Job {
    /// Parse a raw snapshot entry observed under `role`.
    ///
    /// The job id is read on its own first so a malformed entry can still be
    /// attributed to its job.
    pub fn from_entry(role: Role, entry: &serde_json::Value) -> Result<Self, MalformedEntry> {
        let job_id = entry.get("jobId").and_then(|v| v.as_u64()).map(JobId::new);

        if !entry.is_object() {
            return Err(MalformedEntry {
                job_id,
                reason: "job entry is not an object".to_string(),
            });
        }

        let parsed: JobEntry =
            serde_json::from_value(entry.clone()).map_err(|e| MalformedEntry {
                job_id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            job_id: parsed.job_id,
            phase: parsed.phase,
            role,
            counterparty: parsed.counterparty,
            price: parsed.price,
            metadata: parsed.metadata,
        })
    }

    /// Render the job back into its snapshot wire shape
    pub fn to_entry(&self) -> serde_json::Value {
        let mut map = self.metadata.clone();
        map.insert("jobId".to_string(), serde_json::json!(self.job_id));
        map.insert("phase".to_string(), serde_json::json!(self.phase));
        map.insert("counterparty".to_string(), serde_json::json!(self.counterparty));
        map.insert("price".to_string(), serde_json::json!(self.price));
        serde_json::Value::Object(map)
    }

    /// Copy of this job moved to `phase`
    pub fn with_phase(&self, phase: Phase) -> Self {
        Self {
            phase,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert!(Phase::Request.can_advance_to(Phase::Negotiation));
        assert!(Phase::Request.can_advance_to(Phase::Transaction));
        assert!(Phase::Transaction.can_advance_to(Phase::Rejected));
        assert!(Phase::Evaluation.can_advance_to(Phase::Completed));

        assert!(!Phase::Transaction.can_advance_to(Phase::Request));
        assert!(!Phase::Transaction.can_advance_to(Phase::Transaction));
        assert!(!Phase::Completed.can_advance_to(Phase::Rejected));
        assert!(!Phase::Rejected.can_advance_to(Phase::Completed));
    }

    #[test]
    fn test_inferred_terminal() {
        assert_eq!(Phase::Evaluation.inferred_terminal(), Some(Phase::Completed));
        assert_eq!(Phase::Negotiation.inferred_terminal(), Some(Phase::Rejected));
        assert_eq!(Phase::Completed.inferred_terminal(), None);
    }

    #[test]
    fn test_phase_wire_names() {
        assert_eq!(serde_json::to_string(&Phase::Transaction).unwrap(), "\"TRANSACTION\"");
        assert_eq!("evaluation".parse::<Phase>().unwrap(), Phase::Evaluation);
        assert!("SHIPPED".parse::<Phase>().is_err());
    }

    #[test]
    fn test_entry_round_trip_keeps_metadata() {
        let entry = serde_json::json!({
            "jobId": 101,
            "phase": "REQUEST",
            "counterparty": "Lemo",
            "price": 2.5,
            "desc": "a basket of lemons",
        });

        let job = Job::from_entry(Role::Seller, &entry).unwrap();
        assert_eq!(job.job_id, JobId::new(101));
        assert_eq!(job.phase, Phase::Request);
        assert_eq!(job.metadata.get("desc").unwrap(), "a basket of lemons");
        assert_eq!(job.to_entry(), entry);
    }

    #[test]
    fn test_malformed_entry_keeps_job_id() {
        let entry = serde_json::json!({ "jobId": 7, "phase": "SHIPPED", "counterparty": "x", "price": 1.0 });
        let err = Job::from_entry(Role::Buyer, &entry).unwrap_err();
        assert_eq!(err.job_id, Some(JobId::new(7)));

        let err = Job::from_entry(Role::Buyer, &serde_json::json!("garbage")).unwrap_err();
        assert_eq!(err.job_id, None);
    }
}
