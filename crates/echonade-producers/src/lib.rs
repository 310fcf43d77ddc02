//! Echonade Producers - deliverables a seller attaches to a job
//!
//! Every deliverable kind implements [`DeliverableProducer`]. The
//! [`Workshop`] runs the checks shared by all kinds before a producer is
//! allowed to touch the ledger:
//!
//! 1. required arguments present (`MissingArguments`)
//! 2. job active under the SELLER role (`JobNotFound`)
//! 3. job in TRANSACTION, nothing produced yet, kind-specific materials
//!    available (`PreconditionFailed`)
//!
//! Only then is the artifact made and exactly one PRODUCED item appended.
//! A failed call leaves the ledger untouched.

pub mod args;
pub mod config;
pub mod error;
pub mod generator;
pub mod harvest;
pub mod kind;
pub mod lemonade;
pub mod permit;
pub mod poster;
pub mod workshop;

pub use args::{ProduceArgs, ValidatedArgs};
pub use config::ProducerConfig;
pub use error::{ProductionError, Result};
pub use generator::{
    ContentGenerator, DigestImageGenerator, GenerationError, PermitIssuer, TimestampPermitIssuer,
};
pub use harvest::HarvestProducer;
pub use kind::{Artifact, DeliverableKind, DeliverableProducer};
pub use lemonade::LemonadeProducer;
pub use permit::PermitProducer;
pub use poster::PosterProducer;
pub use workshop::{Production, Workshop};
