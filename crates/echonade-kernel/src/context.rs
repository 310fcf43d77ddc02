//! Agent context: identity plus the registry and ledger the agent owns

use chrono::Utc;
use echonade_ledger::InventoryLedger;
use echonade_types::{AgentId, AgentStateView, InventoryView, JobsView, Role};

use crate::registry::JobRegistry;

/// One agent's identity and exclusively owned state.
///
/// Cloning hands out further handles to the same registry and ledger; the
/// producers of this agent hold such clones. Handles are never shared with
/// another agent.
#[derive(Clone)]
pub struct AgentContext {
    pub agent_id: AgentId,
    pub name: String,
    pub registry: JobRegistry,
    pub ledger: InventoryLedger,
}

impl AgentContext {
    pub fn new(agent_id: AgentId, name: impl Into<String>) -> Self {
        Self {
            agent_id,
            name: name.into(),
            registry: JobRegistry::new(),
            ledger: InventoryLedger::new(),
        }
    }

    /// Outward state view written after each cycle
    pub async fn state_view(&self, cycle: u64) -> AgentStateView {
        AgentStateView {
            agent_id: self.agent_id,
            name: self.name.clone(),
            cycle,
            jobs: JobsView {
                as_seller: self.registry.jobs_by_role(Role::Seller).await,
                as_buyer: self.registry.jobs_by_role(Role::Buyer).await,
            },
            inventory: InventoryView {
                acquired: self.ledger.acquired().await,
                produced: self.ledger.produced().await,
            },
            pending_dispatches: self.registry.pending_count().await,
            updated_at: Utc::now(),
        }
    }
}
