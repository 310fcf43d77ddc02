//! Echonade Ledger - Append-only inventory ledger for marketplace agents
//!
//! Each agent owns exactly one ledger. The ledger is:
//! - Agent-scoped (never shared between agents)
//! - Append-only (items are never mutated or removed)
//! - Ordered (queries return items in append order)
//!
//! # Invariants
//!
//! 1. At most one PRODUCED item per job
//! 2. The uniqueness check and the append happen under one write lock
//! 3. Every item carries a non-empty value

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use echonade_types::{Direction, EchonadeError, InventoryItem, ItemType, JobId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("A deliverable has already been produced for job {job_id}")]
    DuplicateProduction { job_id: JobId },

    #[error("Invalid item for job {job_id}: {message}")]
    InvalidItem { job_id: JobId, message: String },
}

impl From<LedgerError> for EchonadeError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DuplicateProduction { job_id } => {
                EchonadeError::DuplicateProduction { job_id }
            }
            LedgerError::InvalidItem { job_id, message } => {
                EchonadeError::invalid_input(format!("item for job {}", job_id), message)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// A single ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the append log, starting at 0
    pub sequence: u64,
    pub item: InventoryItem,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    produced_jobs: HashSet<JobId>,
    acquired_keys: HashSet<InventoryItem>,
}

impl LedgerState {
    fn append(&mut self, item: InventoryItem) -> LedgerEntry {
        let entry = LedgerEntry {
            sequence: self.entries.len() as u64,
            item,
            recorded_at: Utc::now(),
        };
        match entry.item.direction {
            Direction::Produced => {
                self.produced_jobs.insert(entry.item.job_id);
            }
            Direction::Acquired => {
                self.acquired_keys.insert(entry.item.clone());
            }
        }
        self.entries.push(entry.clone());
        entry
    }

    fn items(&self, direction: Direction) -> Vec<InventoryItem> {
        self.entries
            .iter()
            .filter(|e| e.item.direction == direction)
            .map(|e| e.item.clone())
            .collect()
    }
}

/// The inventory ledger of one agent.
///
/// Cloning yields another handle to the same ledger, so the agent's runtime
/// and its producers all see one append log.
#[derive(Clone, Default)]
pub struct InventoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InventoryLedger {
    /// Create a new, empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a PRODUCED item for a job.
    ///
    /// Fails with [`LedgerError::DuplicateProduction`] when the job already has
    /// one; the check and the append are atomic.
    pub async fn record_produced(
        &self,
        job_id: JobId,
        item_type: ItemType,
        value: impl Into<String>,
    ) -> Result<LedgerEntry> {
        let value = value.into();
        validate_value(job_id, &value)?;

        let mut state = self.state.write().await;
        if state.produced_jobs.contains(&job_id) {
            return Err(LedgerError::DuplicateProduction { job_id });
        }

        let entry = state.append(InventoryItem::produced(job_id, item_type, value));
        tracing::debug!(job_id = %job_id, sequence = entry.sequence, "produced item recorded");
        Ok(entry)
    }

    /// Append an item received from a counterparty
    pub async fn record_acquired(
        &self,
        job_id: JobId,
        item_type: ItemType,
        value: impl Into<String>,
    ) -> Result<LedgerEntry> {
        let value = value.into();
        validate_value(job_id, &value)?;

        let mut state = self.state.write().await;
        let entry = state.append(InventoryItem::acquired(job_id, item_type, value));
        tracing::debug!(job_id = %job_id, sequence = entry.sequence, "acquired item recorded");
        Ok(entry)
    }

    /// Record acquired items reported by the marketplace that are not in the
    /// ledger yet. Snapshots repeat their items, so re-syncing the same list
    /// is a no-op. Returns the number of items appended.
    pub async fn sync_acquired(&self, items: &[InventoryItem]) -> usize {
        let mut state = self.state.write().await;
        let mut added = 0;
        for item in items {
            if item.value.trim().is_empty() {
                tracing::warn!(job_id = %item.job_id, "skipping acquired item with empty value");
                continue;
            }
            let item = InventoryItem::acquired(item.job_id, item.item_type, item.value.clone());
            if state.acquired_keys.contains(&item) {
                continue;
            }
            state.append(item);
            added += 1;
        }
        added
    }

    /// Whether any ACQUIRED item matches `predicate`
    pub async fn has_acquired<F>(&self, predicate: F) -> bool
    where
        F: Fn(&InventoryItem) -> bool,
    {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .any(|e| e.item.direction == Direction::Acquired && predicate(&e.item))
    }

    /// Whether a PRODUCED item exists for the job
    pub async fn has_produced(&self, job_id: JobId) -> bool {
        self.state.read().await.produced_jobs.contains(&job_id)
    }

    /// The PRODUCED item of a job, if any
    pub async fn produced_for(&self, job_id: JobId) -> Option<InventoryItem> {
        let state = self.state.read().await;
        state
            .entries
            .iter()
            .find(|e| e.item.direction == Direction::Produced && e.item.job_id == job_id)
            .map(|e| e.item.clone())
    }

    /// All PRODUCED items in append order
    pub async fn produced(&self) -> Vec<InventoryItem> {
        self.state.read().await.items(Direction::Produced)
    }

    /// All ACQUIRED items in append order
    pub async fn acquired(&self) -> Vec<InventoryItem> {
        self.state.read().await.items(Direction::Acquired)
    }

    /// Every entry in append order
    pub async fn entries(&self) -> Vec<LedgerEntry> {
        self.state.read().await.entries.clone()
    }

    /// Number of entries
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn validate_value(job_id: JobId, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidItem {
            job_id,
            message: "item value must not be empty".to_string(),
        });
    }
    Ok(())
}
