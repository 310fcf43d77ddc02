//! Deterministic decision capability
//!
//! Sellers accept every request for what they sell and deliver once paid;
//! buyers pay negotiated jobs when their template says so. Production goes
//! through the agent's [`Workshop`], so all producer checks still apply.

use std::sync::Arc;

use async_trait::async_trait;
use echonade_kernel::{
    DecisionCapability, DecisionError, DecisionOutcome, Instruction, InstructionKind,
    PaymentCapability,
};
use echonade_market::{Delivery, InMemoryMarketplace};
use echonade_producers::{DeliverableKind, ProduceArgs, Workshop};
use echonade_types::{AgentId, EchonadeError, InventoryItem, Job, JobId, Phase};

use crate::template::AgentTemplate;

/// Seller-side marketplace actions
#[async_trait]
pub trait JobActions: Send + Sync {
    async fn respond(
        &self,
        seller: AgentId,
        job_id: JobId,
        accept: bool,
        reasoning: &str,
    ) -> Result<Phase, EchonadeError>;

    async fn deliver(
        &self,
        seller: AgentId,
        job_id: JobId,
        item: &InventoryItem,
    ) -> Result<(), EchonadeError>;
}

#[async_trait]
impl JobActions for InMemoryMarketplace {
    async fn respond(
        &self,
        seller: AgentId,
        job_id: JobId,
        accept: bool,
        reasoning: &str,
    ) -> Result<Phase, EchonadeError> {
        Ok(InMemoryMarketplace::respond(self, seller, job_id, accept, reasoning).await?)
    }

    async fn deliver(
        &self,
        seller: AgentId,
        job_id: JobId,
        item: &InventoryItem,
    ) -> Result<(), EchonadeError> {
        let delivery = Delivery {
            item_type: item.item_type,
            value: item.value.clone(),
        };
        Ok(InMemoryMarketplace::deliver(self, seller, job_id, delivery).await?)
    }
}

pub struct ScriptedReasoner {
    agent_id: AgentId,
    name: String,
    deliverable: Option<DeliverableKind>,
    pays: bool,
    workshop: Workshop,
    actions: Arc<dyn JobActions>,
    payments: Arc<dyn PaymentCapability>,
}

impl ScriptedReasoner {
    pub fn new(
        template: &AgentTemplate,
        workshop: Workshop,
        actions: Arc<dyn JobActions>,
        payments: Arc<dyn PaymentCapability>,
    ) -> Self {
        Self {
            agent_id: template.entity_id,
            name: template.name.clone(),
            deliverable: template.deliverable,
            pays: template.pays,
            workshop,
            actions,
            payments,
        }
    }

    async fn decide_acceptance(&self, job: &Job) -> Result<DecisionOutcome, DecisionError> {
        let (accept, reasoning) = match self.deliverable {
            Some(kind) => (
                true,
                format!("{} can deliver {} to {}", self.name, kind.noun(), job.counterparty),
            ),
            None => (false, format!("{} has nothing to sell", self.name)),
        };

        let phase = self
            .actions
            .respond(self.agent_id, job.job_id, accept, &reasoning)
            .await
            .map_err(action_failed)?;
        Ok(DecisionOutcome::new(format!(
            "{} job #{} ({})",
            if accept { "Accepted" } else { "Rejected" },
            job.job_id,
            phase
        )))
    }

    async fn produce_and_deliver(&self, job: &Job) -> Result<DecisionOutcome, DecisionError> {
        let kind = self.deliverable.ok_or_else(|| {
            DecisionError::ActionFailed(format!("{} has no deliverable to produce", self.name))
        })?;

        let (item, message) = match self.workshop.ledger().produced_for(job.job_id).await {
            Some(item) => {
                let message = format!("Deliverable for job #{} was already produced", job.job_id);
                (item, message)
            }
            None => {
                let mut args = ProduceArgs::new(
                    job.job_id,
                    format!("{} paid {:.2} for it", job.counterparty, job.price),
                );
                if kind.requires_prompt() {
                    args = args.with_prompt(poster_prompt(job));
                }

                match self.workshop.produce(kind, args).await {
                    Ok(production) => (production.item, production.message),
                    Err(e) if e.is_retriable() => return Err(DecisionError::ActionFailed(e.to_string())),
                    Err(e) => {
                        tracing::warn!(agent = %self.name, job_id = %job.job_id, error = %e, "giving up on job");
                        return Ok(DecisionOutcome::new(format!(
                            "Could not produce {} for job #{}: {}",
                            kind.noun(),
                            job.job_id,
                            e
                        )));
                    }
                }
            }
        };

        self.actions
            .deliver(self.agent_id, job.job_id, &item)
            .await
            .map_err(action_failed)?;
        Ok(DecisionOutcome::new(format!("{}. Delivered to {}.", message, job.counterparty)))
    }

    async fn respond_as_buyer(&self, job: &Job) -> Result<DecisionOutcome, DecisionError> {
        if job.phase == Phase::Negotiation && self.pays {
            self.payments
                .pay(self.agent_id, job.job_id)
                .await
                .map_err(action_failed)?;
            return Ok(DecisionOutcome::new(format!(
                "Paid {:.2} to {} for job #{}",
                job.price, job.counterparty, job.job_id
            )));
        }
        Ok(DecisionOutcome::new(format!(
            "Acknowledged job #{} in {}",
            job.job_id, job.phase
        )))
    }
}

#[async_trait]
impl DecisionCapability for ScriptedReasoner {
    async fn decide(&self, instruction: &Instruction) -> Result<DecisionOutcome, DecisionError> {
        tracing::debug!(agent = %self.name, job_id = %instruction.job_id, text = %instruction.text, "instruction received");
        match instruction.kind {
            InstructionKind::DecideAcceptance => self.decide_acceptance(&instruction.job).await,
            InstructionKind::ProduceAndDeliver => self.produce_and_deliver(&instruction.job).await,
            InstructionKind::RespondToTransaction => self.respond_as_buyer(&instruction.job).await,
        }
    }
}

fn poster_prompt(job: &Job) -> String {
    let brief = job
        .metadata
        .get("desc")
        .and_then(|v| v.as_str())
        .unwrap_or("a refreshing lemonade stand");
    format!("Promotional poster for {}: {}", job.counterparty, brief)
}

fn action_failed(err: EchonadeError) -> DecisionError {
    DecisionError::ActionFailed(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::default_roster;
    use echonade_kernel::{JobRegistry, ReactionPolicy, StandardReactionPolicy};
    use echonade_ledger::InventoryLedger;
    use echonade_producers::{DigestImageGenerator, ProducerConfig, TimestampPermitIssuer};
    use echonade_types::{ItemType, Role, TransitionEvent};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingActions {
        responses: Mutex<Vec<(JobId, bool)>>,
        deliveries: Mutex<Vec<(JobId, InventoryItem)>>,
        payments: Mutex<Vec<JobId>>,
    }

    #[async_trait]
    impl JobActions for RecordingActions {
        async fn respond(
            &self,
            _seller: AgentId,
            job_id: JobId,
            accept: bool,
            _reasoning: &str,
        ) -> Result<Phase, EchonadeError> {
            self.responses.lock().unwrap().push((job_id, accept));
            Ok(if accept {
                Phase::Negotiation
            } else {
                Phase::Rejected
            })
        }

        async fn deliver(
            &self,
            _seller: AgentId,
            job_id: JobId,
            item: &InventoryItem,
        ) -> Result<(), EchonadeError> {
            self.deliveries.lock().unwrap().push((job_id, item.clone()));
            Ok(())
        }
    }

    #[async_trait]
    impl PaymentCapability for RecordingActions {
        async fn pay(&self, _payer: AgentId, job_id: JobId) -> Result<(), EchonadeError> {
            self.payments.lock().unwrap().push(job_id);
            Ok(())
        }
    }

    struct Harness {
        reasoner: ScriptedReasoner,
        registry: JobRegistry,
        ledger: InventoryLedger,
        actions: Arc<RecordingActions>,
    }

    fn harness(name: &str) -> Harness {
        let template = default_roster()
            .into_iter()
            .find(|t| t.name == name)
            .unwrap();
        let registry = JobRegistry::new();
        let ledger = InventoryLedger::new();
        let workshop = Workshop::standard(
            registry.clone(),
            ledger.clone(),
            &ProducerConfig::default(),
            Arc::new(DigestImageGenerator::default()),
            Arc::new(TimestampPermitIssuer::default()),
        );
        let actions = Arc::new(RecordingActions::default());
        Harness {
            reasoner: ScriptedReasoner::new(&template, workshop, actions.clone(), actions.clone()),
            registry,
            ledger,
            actions,
        }
    }

    fn job(id: u64, phase: Phase, role: Role) -> Job {
        Job {
            job_id: JobId::new(id),
            phase,
            role,
            counterparty: "Pixie".to_string(),
            price: 1.5,
            metadata: serde_json::Map::new(),
        }
    }

    async fn instruct(h: &Harness, job: Job) -> Instruction {
        h.registry.upsert(job.clone()).await.unwrap();
        StandardReactionPolicy
            .instruct(&TransitionEvent::new(None, job))
            .unwrap()
    }

    #[tokio::test]
    async fn test_seller_accepts_request() {
        let h = harness("Lexie");
        let instruction = instruct(&h, job(1, Phase::Request, Role::Seller)).await;

        let outcome = h.reasoner.decide(&instruction).await.unwrap();
        assert!(outcome.summary.starts_with("Accepted job #1"));
        assert_eq!(*h.actions.responses.lock().unwrap(), vec![(JobId::new(1), true)]);
    }

    #[tokio::test]
    async fn test_agent_without_deliverable_rejects() {
        let h = harness("Evo");
        let instruction = instruct(&h, job(2, Phase::Request, Role::Seller)).await;

        let outcome = h.reasoner.decide(&instruction).await.unwrap();
        assert!(outcome.summary.starts_with("Rejected job #2"));
        assert_eq!(*h.actions.responses.lock().unwrap(), vec![(JobId::new(2), false)]);
    }

    #[tokio::test]
    async fn test_permit_is_produced_and_delivered() {
        let h = harness("Lexie");
        let instruction = instruct(&h, job(3, Phase::Transaction, Role::Seller)).await;

        h.reasoner.decide(&instruction).await.unwrap();

        let deliveries = h.actions.deliveries.lock().unwrap().clone();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].1.item_type, ItemType::Url);
        assert!(h.ledger.has_produced(JobId::new(3)).await);
    }

    #[tokio::test]
    async fn test_redelivery_reuses_produced_item() {
        let h = harness("Zestie");
        let instruction = instruct(&h, job(4, Phase::Transaction, Role::Seller)).await;

        h.reasoner.decide(&instruction).await.unwrap();
        let outcome = h.reasoner.decide(&instruction).await.unwrap();

        assert!(outcome.summary.contains("already produced"));
        assert_eq!(h.actions.deliveries.lock().unwrap().len(), 2);
        assert_eq!(h.ledger.produced().await.len(), 1);
    }

    #[tokio::test]
    async fn test_lemonade_without_lemons_is_retried() {
        let h = harness("Lemo");
        let instruction = instruct(&h, job(5, Phase::Transaction, Role::Seller)).await;

        let err = h.reasoner.decide(&instruction).await.unwrap_err();
        assert!(err.to_string().contains("No lemons available in inventory"));
        assert!(h.actions.deliveries.lock().unwrap().is_empty());

        h.ledger
            .sync_acquired(&[InventoryItem::acquired(JobId::new(1), ItemType::Text, "Lemon")])
            .await;
        h.reasoner.decide(&instruction).await.unwrap();
        assert_eq!(h.actions.deliveries.lock().unwrap()[0].1.value, "Lemonade");
    }

    #[tokio::test]
    async fn test_buyer_pays_only_in_negotiation() {
        let h = harness("Lemo");

        let request = instruct(&h, job(6, Phase::Request, Role::Buyer)).await;
        h.reasoner.decide(&request).await.unwrap();
        assert!(h.actions.payments.lock().unwrap().is_empty());

        let negotiation = instruct(&h, job(6, Phase::Negotiation, Role::Buyer)).await;
        let outcome = h.reasoner.decide(&negotiation).await.unwrap();
        assert!(outcome.summary.starts_with("Paid 1.50"));
        assert_eq!(*h.actions.payments.lock().unwrap(), vec![JobId::new(6)]);
    }
}
