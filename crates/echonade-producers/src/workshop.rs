//! The shared precondition pipeline in front of every producer

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use echonade_kernel::JobRegistry;
use echonade_ledger::{InventoryLedger, LedgerError};
use echonade_types::{EchonadeError, InventoryItem, JobId, Phase, Role};
use serde::{Deserialize, Serialize};

use crate::args::ProduceArgs;
use crate::config::ProducerConfig;
use crate::error::{ProductionError, Result};
use crate::generator::{ContentGenerator, PermitIssuer};
use crate::harvest::HarvestProducer;
use crate::kind::{DeliverableKind, DeliverableProducer};
use crate::lemonade::LemonadeProducer;
use crate::permit::PermitProducer;
use crate::poster::PosterProducer;

/// A recorded deliverable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub job_id: JobId,
    pub kind: DeliverableKind,
    pub item: InventoryItem,
    /// Confirmation handed back to the decision capability
    pub message: String,
}

/// Producers of one agent, bound to that agent's registry and ledger
#[derive(Clone)]
pub struct Workshop {
    registry: JobRegistry,
    ledger: InventoryLedger,
    producers: HashMap<DeliverableKind, Arc<dyn DeliverableProducer>>,
    generation_timeout: Duration,
}

impl Workshop {
    pub fn new(registry: JobRegistry, ledger: InventoryLedger, config: &ProducerConfig) -> Self {
        Self {
            registry,
            ledger,
            producers: HashMap::new(),
            generation_timeout: config.generation_timeout(),
        }
    }

    /// Workshop with every bundled producer registered
    pub fn standard(
        registry: JobRegistry,
        ledger: InventoryLedger,
        config: &ProducerConfig,
        generator: Arc<dyn ContentGenerator>,
        issuer: Arc<dyn PermitIssuer>,
    ) -> Self {
        Self::new(registry, ledger, config)
            .with_producer(Arc::new(PermitProducer::new(issuer)))
            .with_producer(Arc::new(LemonadeProducer))
            .with_producer(Arc::new(PosterProducer::new(generator)))
            .with_producer(Arc::new(HarvestProducer))
    }

    pub fn with_producer(mut self, producer: Arc<dyn DeliverableProducer>) -> Self {
        self.register(producer);
        self
    }

    /// Register a producer, replacing any earlier one of the same kind
    pub fn register(&mut self, producer: Arc<dyn DeliverableProducer>) {
        self.producers.insert(producer.kind(), producer);
    }

    pub fn supports(&self, kind: DeliverableKind) -> bool {
        self.producers.contains_key(&kind)
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    /// Validate, make and record one deliverable
    pub async fn produce(&self, kind: DeliverableKind, args: ProduceArgs) -> Result<Production> {
        let producer = self
            .producers
            .get(&kind)
            .ok_or(ProductionError::Unsupported { kind })?;

        let args = args.validate(kind)?;
        let job_id = args.job_id;

        let job = self
            .registry
            .find_active_by_role(Role::Seller, job_id)
            .await
            .map_err(|e| match e {
                EchonadeError::JobNotFound { job_id, .. } => ProductionError::JobNotFound { job_id },
                other => ProductionError::precondition(job_id, other.to_string()),
            })?;

        if job.phase != Phase::Transaction {
            return Err(ProductionError::precondition(
                job_id,
                format!(
                    "Job with id {} is in phase {}; deliverables are only made during TRANSACTION",
                    job_id, job.phase
                ),
            ));
        }

        if self.ledger.has_produced(job_id).await {
            return Err(ProductionError::precondition(job_id, kind.already_produced(job_id)));
        }

        producer.validate(&job, &self.ledger).await?;

        let artifact = tokio::time::timeout(self.generation_timeout, producer.produce(&job, &args))
            .await
            .map_err(|_| ProductionError::Timeout {
                kind,
                timeout_ms: self.generation_timeout.as_millis() as u64,
            })??;

        let entry = self
            .ledger
            .record_produced(job_id, artifact.item_type, artifact.value.clone())
            .await
            .map_err(|e| match e {
                LedgerError::DuplicateProduction { job_id } => {
                    ProductionError::DuplicateProduction { job_id }
                }
                LedgerError::InvalidItem { job_id, message } => ProductionError::GenerationFailed {
                    kind,
                    reason: format!("job {}: {}", job_id, message),
                },
            })?;

        tracing::info!(
            job_id = %job_id,
            kind = %kind,
            sequence = entry.sequence,
            "deliverable produced"
        );

        Ok(Production {
            job_id,
            kind,
            message: kind.confirmation(job_id, &args.reasoning, &artifact),
            item: entry.item,
        })
    }
}
