//! Runtime configuration for one agent kernel
//!
//! Built explicitly and handed to each agent at construction; nothing in the
//! kernel reads the environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Delay between two polling cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Upper bound for one decision capability call
    #[serde(default = "default_decision_timeout")]
    pub decision_timeout_ms: u64,

    /// Upper bound for one snapshot fetch
    #[serde(default = "default_snapshot_timeout")]
    pub snapshot_timeout_ms: u64,

    /// Capacity of the transition channel feeding the dispatcher
    #[serde(default = "default_dispatch_buffer")]
    pub dispatch_buffer: usize,

    /// Audit trail cap (oldest entries are dropped first)
    #[serde(default = "default_trace_max_entries")]
    pub trace_max_entries: Option<usize>,

    /// Directory for the per-agent state snapshot and event log
    #[serde(default)]
    pub journal_dir: Option<PathBuf>,

    /// Stop after this many cycles (runs until shutdown when unset)
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            decision_timeout_ms: default_decision_timeout(),
            snapshot_timeout_ms: default_snapshot_timeout(),
            dispatch_buffer: default_dispatch_buffer(),
            trace_max_entries: default_trace_max_entries(),
            journal_dir: None,
            max_cycles: None,
        }
    }
}

impl RuntimeConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn decision_timeout(&self) -> Duration {
        Duration::from_millis(self.decision_timeout_ms)
    }

    pub fn snapshot_timeout(&self) -> Duration {
        Duration::from_millis(self.snapshot_timeout_ms)
    }
}

fn default_poll_interval() -> u64 {
    5_000
}

fn default_decision_timeout() -> u64 {
    60_000
}

fn default_snapshot_timeout() -> u64 {
    10_000
}

fn default_dispatch_buffer() -> usize {
    64
}

fn default_trace_max_entries() -> Option<usize> {
    Some(512)
}
