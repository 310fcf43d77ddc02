//! Echonade Market - in-process job marketplace
//!
//! Hosts jobs between registered agents and moves them through their
//! phases on behalf of the participants:
//!
//! ```text
//! initiate_job      respond(accept)      pay         deliver        evaluate
//!   REQUEST ──────► NEGOTIATION ──────► TRANSACTION ──► EVALUATION ──► COMPLETED
//!      │                                                     │
//!      └── respond(reject) ──► REJECTED ◄── evaluate(reject) ┘
//! ```
//!
//! Agents only read the marketplace through [`SnapshotSource`]; reading
//! never advances a job.
//!
//! [`SnapshotSource`]: echonade_kernel::SnapshotSource

pub mod error;
pub mod evaluator;
pub mod job;
pub mod marketplace;

pub use error::{MarketError, Result};
pub use evaluator::{AutoApprove, Evaluator, Verdict};
pub use job::{Delivery, MarketJob, Memo};
pub use marketplace::{EvaluationRecord, InMemoryMarketplace};
