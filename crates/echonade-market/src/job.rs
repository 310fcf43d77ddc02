//! Marketplace-side job records

use chrono::{DateTime, Utc};
use echonade_types::{AgentId, InventoryItem, ItemType, JobId, Phase, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A note attached to a job by one of its participants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memo {
    pub memo_id: Uuid,
    pub author: AgentId,
    pub phase: Phase,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// The seller's deliverable as handed to the marketplace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketJob {
    pub job_id: JobId,
    pub buyer: AgentId,
    pub seller: AgentId,
    pub description: String,
    pub price: f64,
    pub phase: Phase,
    pub paid: bool,
    pub delivery: Option<Delivery>,
    pub memos: Vec<Memo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MarketJob {
    pub(crate) fn new(
        job_id: JobId,
        buyer: AgentId,
        seller: AgentId,
        description: String,
        price: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            buyer,
            seller,
            description,
            price,
            phase: Phase::Request,
            paid: false,
            delivery: None,
            memos: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Role `agent` plays in this job, if any
    pub fn role_of(&self, agent: AgentId) -> Option<Role> {
        if agent == self.seller {
            Some(Role::Seller)
        } else if agent == self.buyer {
            Some(Role::Buyer)
        } else {
            None
        }
    }

    pub(crate) fn advance(&mut self, author: AgentId, phase: Phase, note: impl Into<String>) {
        self.phase = phase;
        self.updated_at = Utc::now();
        self.memos.push(Memo {
            memo_id: Uuid::new_v4(),
            author,
            phase,
            content: note.into(),
            created_at: self.updated_at,
        });
    }

    /// The buyer's acquired item once the job completed
    pub fn acquired_item(&self) -> Option<InventoryItem> {
        if self.phase != Phase::Completed {
            return None;
        }
        self.delivery
            .as_ref()
            .map(|d| InventoryItem::acquired(self.job_id, d.item_type, d.value.clone()))
    }

    /// Snapshot entry naming `counterparty` as the other side
    pub fn entry_for(&self, counterparty: &str) -> serde_json::Value {
        let mut entry = serde_json::json!({
            "jobId": self.job_id,
            "phase": self.phase,
            "counterparty": counterparty,
            "price": self.price,
            "desc": self.description,
        });
        if let (Some(map), Some(delivery)) = (entry.as_object_mut(), &self.delivery) {
            map.insert(
                "deliverable".to_string(),
                serde_json::to_value(delivery).unwrap_or_default(),
            );
        }
        if let (Some(map), Some(memo)) = (entry.as_object_mut(), self.memos.last()) {
            map.insert("lastMemo".to_string(), serde_json::json!(memo.content));
        }
        entry
    }
}
