//! Echonade Kernel - per-agent job lifecycle and reactive dispatch runtime
//!
//! The kernel owns an agent's polling loop: it fetches marketplace snapshots,
//! detects phase transitions against the job registry, turns each transition
//! into a role- and phase-specific instruction, and dispatches it to the
//! decision capability with per-job ordering and per-job failure isolation.

pub mod capability;
pub mod config;
pub mod context;
pub mod detector;
pub mod dispatch;
pub mod journal;
pub mod kernel;
pub mod policy;
pub mod registry;
pub mod trace;

pub use capability::{
    DecisionCapability, DecisionError, DecisionOutcome, PaymentCapability, SnapshotSource,
};
pub use config::RuntimeConfig;
pub use context::AgentContext;
pub use detector::{detect_transitions, Detection};
pub use dispatch::{DispatchOutcome, DispatchStatus, Dispatcher};
pub use journal::AgentJournal;
pub use kernel::{AgentKernel, CycleReport, KernelConfig, KernelError, KernelSummary};
pub use policy::{Instruction, InstructionKind, ReactionPolicy, StandardReactionPolicy};
pub use registry::{Baseline, BaselineEntry, JobRegistry};
pub use trace::{AuditStage, AuditTrail, AuditTrailEvent};
