use echonade_producers::DeliverableKind;
use echonade_types::AgentId;
use serde::{Deserialize, Serialize};

/// Declarative description of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTemplate {
    pub name: String,
    pub entity_id: AgentId,
    pub goal: String,
    pub description: String,
    /// What the agent sells; `None` for agents that only buy or evaluate
    #[serde(default)]
    pub deliverable: Option<DeliverableKind>,
    /// Pays for negotiated jobs it bought
    #[serde(default)]
    pub pays: bool,
    /// Judges delivered jobs on behalf of buyers
    #[serde(default)]
    pub evaluates: bool,
}

impl AgentTemplate {
    pub fn sells(&self) -> bool {
        self.deliverable.is_some()
    }

    /// Short role summary for listings
    pub fn roles(&self) -> Vec<&'static str> {
        let mut roles = Vec::new();
        if self.pays {
            roles.push("buyer");
        }
        if self.sells() {
            roles.push("seller");
        }
        if self.evaluates {
            roles.push("evaluator");
        }
        roles
    }
}
