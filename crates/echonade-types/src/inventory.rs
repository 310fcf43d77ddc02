//! Inventory items held in an agent's ledger

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identity::JobId;

/// Payload kind of an inventory item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Text,
    Url,
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Text => f.write_str("text"),
            ItemType::Url => f.write_str("url"),
        }
    }
}

/// Whether an item was received from a counterparty or made by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Acquired,
    Produced,
}

/// One entry of an agent's inventory. Identity is `(job_id, direction)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(rename = "jobId")]
    pub job_id: JobId,
    pub direction: Direction,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub value: String,
}

impl InventoryItem {
    pub fn acquired(job_id: JobId, item_type: ItemType, value: impl Into<String>) -> Self {
        Self {
            job_id,
            direction: Direction::Acquired,
            item_type,
            value: value.into(),
        }
    }

    pub fn produced(job_id: JobId, item_type: ItemType, value: impl Into<String>) -> Self {
        Self {
            job_id,
            direction: Direction::Produced,
            item_type,
            value: value.into(),
        }
    }
}
