//! Reaction policy: which instruction a transition produces

use echonade_types::{Job, JobId, Phase, Role, TransitionEvent};
use serde::{Deserialize, Serialize};

/// What the decision capability is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    /// Seller saw a new request: accept or reject, nothing more
    DecideAcceptance,
    /// Seller was paid: produce the deliverable and deliver it
    ProduceAndDeliver,
    /// Buyer-side reaction to any active phase
    RespondToTransaction,
}

/// A rendered instruction for one transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub job_id: JobId,
    pub role: Role,
    pub phase: Phase,
    pub kind: InstructionKind,
    /// The job as observed when the transition was detected
    pub job: Job,
    /// Natural-language text handed to the decision capability
    pub text: String,
}

/// Maps a transition to an instruction, or to none for phases without a
/// defined reaction
pub trait ReactionPolicy: Send + Sync {
    fn instruct(&self, event: &TransitionEvent) -> Option<Instruction>;
}

/// The fixed reaction table
///
/// | role   | phase                             | instruction            |
/// |--------|-----------------------------------|------------------------|
/// | SELLER | REQUEST                           | `DecideAcceptance`     |
/// | SELLER | TRANSACTION                       | `ProduceAndDeliver`    |
/// | BUYER  | REQUEST, NEGOTIATION, TRANSACTION | `RespondToTransaction` |
///
/// Everything else (seller NEGOTIATION, EVALUATION and the terminal phases)
/// has no instruction.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardReactionPolicy;

impl StandardReactionPolicy {
    pub fn kind_for(role: Role, phase: Phase) -> Option<InstructionKind> {
        match (role, phase) {
            (Role::Seller, Phase::Request) => Some(InstructionKind::DecideAcceptance),
            (Role::Seller, Phase::Transaction) => Some(InstructionKind::ProduceAndDeliver),
            (Role::Buyer, Phase::Request | Phase::Negotiation | Phase::Transaction) => {
                Some(InstructionKind::RespondToTransaction)
            }
            _ => None,
        }
    }
}

impl ReactionPolicy for StandardReactionPolicy {
    fn instruct(&self, event: &TransitionEvent) -> Option<Instruction> {
        let kind = Self::kind_for(event.role, event.new_phase)?;
        Some(Instruction {
            job_id: event.job_id,
            role: event.role,
            phase: event.new_phase,
            kind,
            job: event.job.clone(),
            text: render(kind, &event.job),
        })
    }
}

fn render(kind: InstructionKind, job: &Job) -> String {
    let payload = serde_json::to_string(&job.to_entry()).unwrap_or_else(|_| job.job_id.to_string());
    match kind {
        InstructionKind::DecideAcceptance => format!(
            "Respond to the following transaction:\n{}\n\n\
             Decide whether to accept the job or not.\n\
             Once you have responded to the job, do not proceed with producing the deliverable and wait.",
            payload
        ),
        InstructionKind::ProduceAndDeliver => format!(
            "Respond to the following transaction:\n{}\n\n\
             You should produce the deliverable and deliver it to the buyer.",
            payload
        ),
        InstructionKind::RespondToTransaction => {
            format!("Respond to the following transaction: {}", payload)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(role: Role, phase: Phase) -> TransitionEvent {
        let job = Job::from_entry(
            role,
            &serde_json::json!({ "jobId": 101, "phase": phase, "counterparty": "Zestie", "price": 1.5 }),
        )
        .unwrap();
        TransitionEvent::new(None, job)
    }

    #[test]
    fn test_reaction_table() {
        use InstructionKind::*;

        let cases = [
            (Role::Seller, Phase::Request, Some(DecideAcceptance)),
            (Role::Seller, Phase::Negotiation, None),
            (Role::Seller, Phase::Transaction, Some(ProduceAndDeliver)),
            (Role::Seller, Phase::Evaluation, None),
            (Role::Buyer, Phase::Request, Some(RespondToTransaction)),
            (Role::Buyer, Phase::Negotiation, Some(RespondToTransaction)),
            (Role::Buyer, Phase::Transaction, Some(RespondToTransaction)),
            (Role::Buyer, Phase::Evaluation, None),
            (Role::Buyer, Phase::Completed, None),
            (Role::Seller, Phase::Rejected, None),
        ];

        for (role, phase, expected) in cases {
            let instruction = StandardReactionPolicy.instruct(&event(role, phase));
            assert_eq!(instruction.map(|i| i.kind), expected, "{} {}", role, phase);
        }
    }

    #[test]
    fn test_acceptance_text_forbids_production() {
        let instruction = StandardReactionPolicy
            .instruct(&event(Role::Seller, Phase::Request))
            .unwrap();

        assert!(instruction.text.contains("\"jobId\":101"));
        assert!(instruction.text.contains("Decide whether to accept the job or not."));
        assert!(instruction.text.contains("do not proceed with producing the deliverable"));
    }
}
