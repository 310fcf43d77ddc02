//! Marketplace snapshots and the outward agent state view

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::AgentId;
use crate::inventory::InventoryItem;
use crate::job::Job;

/// State of one agent as reported by the marketplace.
///
/// Job entries are kept raw: the detector parses them one by one so a single
/// malformed entry never spoils the rest of the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    #[serde(default)]
    pub active_jobs_as_seller: Vec<serde_json::Value>,
    #[serde(default)]
    pub active_jobs_as_buyer: Vec<serde_json::Value>,
    #[serde(default)]
    pub acquired_items: Vec<InventoryItem>,
}

/// Jobs section of [`AgentStateView`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsView {
    pub as_seller: Vec<Job>,
    pub as_buyer: Vec<Job>,
}

/// Inventory section of [`AgentStateView`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryView {
    pub acquired: Vec<InventoryItem>,
    pub produced: Vec<InventoryItem>,
}

/// Full agent state written out after every cycle. Write-only: nothing in the
/// engine reads it back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStateView {
    pub agent_id: AgentId,
    pub name: String,
    pub cycle: u64,
    pub jobs: JobsView,
    pub inventory: InventoryView,
    pub pending_dispatches: usize,
    pub updated_at: DateTime<Utc>,
}
