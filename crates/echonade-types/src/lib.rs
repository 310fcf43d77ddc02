//! Echonade Types - Canonical domain types for the job marketplace
//!
//! This crate contains the foundational types shared by every echonade crate,
//! with zero dependencies on other echonade crates:
//!
//! - Identity types (JobId, AgentId)
//! - Job phases, roles and the phase partial order
//! - Inventory items (acquired and produced deliverables)
//! - Transition events and marketplace snapshots
//! - The error taxonomy
//!
//! # Lifecycle
//!
//! ```text
//! REQUEST → NEGOTIATION → TRANSACTION → EVALUATION → COMPLETED
//!     └──────────┴─────────────┴─────────────┴──────→ REJECTED
//! ```

pub mod identity;
pub mod job;
pub mod inventory;
pub mod transition;
pub mod snapshot;
pub mod error;

pub use identity::*;
pub use job::*;
pub use inventory::*;
pub use transition::*;
pub use snapshot::*;
pub use error::*;

/// Version of the echonade types schema
pub const TYPES_VERSION: &str = "0.1.0";
