//! In-memory marketplace engine

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use echonade_kernel::{PaymentCapability, SnapshotSource};
use echonade_types::{AgentId, EchonadeError, JobId, MarketSnapshot, Phase, Role};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{MarketError, Result};
use crate::evaluator::{Evaluator, Verdict};
use crate::job::{Delivery, MarketJob};

/// Outcome of evaluating one delivered job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub job_id: JobId,
    pub verdict: Verdict,
    pub phase: Phase,
}

#[derive(Debug)]
struct MarketState {
    agents: BTreeMap<AgentId, String>,
    jobs: BTreeMap<JobId, MarketJob>,
    next_job_id: u64,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            agents: BTreeMap::new(),
            jobs: BTreeMap::new(),
            next_job_id: 1,
        }
    }
}

impl MarketState {
    fn name_of(&self, agent: AgentId) -> String {
        self.agents
            .get(&agent)
            .cloned()
            .unwrap_or_else(|| agent.to_string())
    }

    fn job_for(
        &mut self,
        agent: AgentId,
        job_id: JobId,
        role: Role,
        phase: Phase,
    ) -> Result<&mut MarketJob> {
        let job = self
            .jobs
            .get_mut(&job_id)
            .ok_or(MarketError::UnknownJob(job_id))?;
        if job.role_of(agent) != Some(role) {
            return Err(MarketError::NotParticipant {
                agent,
                job_id,
                expected: match role {
                    Role::Seller => "seller",
                    Role::Buyer => "buyer",
                },
            });
        }
        if job.phase != phase {
            return Err(MarketError::WrongPhase {
                job_id,
                expected: phase,
                actual: job.phase,
            });
        }
        Ok(job)
    }
}

/// In-memory marketplace. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryMarketplace {
    state: Arc<RwLock<MarketState>>,
}

impl InMemoryMarketplace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant under a display name
    pub async fn register_agent(&self, agent: AgentId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MarketError::InvalidJob(format!("agent {} has no name", agent)));
        }
        self.state.write().await.agents.insert(agent, name);
        Ok(())
    }

    pub async fn agent_name(&self, agent: AgentId) -> Option<String> {
        self.state.read().await.agents.get(&agent).cloned()
    }

    /// Open a job in REQUEST
    pub async fn initiate_job(
        &self,
        buyer: AgentId,
        seller: AgentId,
        description: impl Into<String>,
        price: f64,
    ) -> Result<JobId> {
        let description = description.into();
        let mut state = self.state.write().await;

        for agent in [buyer, seller] {
            if !state.agents.contains_key(&agent) {
                return Err(MarketError::UnknownAgent(agent));
            }
        }
        if buyer == seller {
            return Err(MarketError::InvalidJob("buyer and seller must differ".to_string()));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(MarketError::InvalidJob(format!("invalid price {}", price)));
        }

        let job_id = JobId::new(state.next_job_id);
        state.next_job_id += 1;

        let mut job = MarketJob::new(job_id, buyer, seller, description.clone(), price);
        job.advance(buyer, Phase::Request, description);
        state.jobs.insert(job_id, job);

        tracing::info!(
            job_id = %job_id,
            buyer = %state.name_of(buyer),
            seller = %state.name_of(seller),
            price,
            "job initiated"
        );
        Ok(job_id)
    }

    /// Seller accepts (NEGOTIATION) or rejects (REJECTED) a request
    pub async fn respond(
        &self,
        seller: AgentId,
        job_id: JobId,
        accept: bool,
        reasoning: impl Into<String>,
    ) -> Result<Phase> {
        let mut state = self.state.write().await;
        let job = state.job_for(seller, job_id, Role::Seller, Phase::Request)?;
        let next = if accept {
            Phase::Negotiation
        } else {
            Phase::Rejected
        };
        job.advance(seller, next, reasoning);
        tracing::info!(job_id = %job_id, phase = %next, "seller responded");
        Ok(next)
    }

    /// Buyer pays a negotiated job, moving it to TRANSACTION
    pub async fn pay_job(&self, buyer: AgentId, job_id: JobId) -> Result<()> {
        let mut state = self.state.write().await;
        let job = state.job_for(buyer, job_id, Role::Buyer, Phase::Negotiation)?;
        job.paid = true;
        let price = job.price;
        job.advance(buyer, Phase::Transaction, format!("paid {:.2}", price));
        tracing::info!(job_id = %job_id, price, "job paid");
        Ok(())
    }

    /// Seller hands over the deliverable, moving the job to EVALUATION
    pub async fn deliver(&self, seller: AgentId, job_id: JobId, delivery: Delivery) -> Result<()> {
        if delivery.value.trim().is_empty() {
            return Err(MarketError::InvalidJob(format!("empty deliverable for job {}", job_id)));
        }
        let mut state = self.state.write().await;
        let job = state.job_for(seller, job_id, Role::Seller, Phase::Transaction)?;
        let note = format!("delivered {}: {}", delivery.item_type, delivery.value);
        job.delivery = Some(delivery);
        job.advance(seller, Phase::Evaluation, note);
        tracing::info!(job_id = %job_id, "deliverable submitted");
        Ok(())
    }

    /// Run `evaluator` over every job waiting in EVALUATION
    pub async fn evaluate_pending(&self, evaluator: &dyn Evaluator) -> Vec<EvaluationRecord> {
        let waiting: Vec<MarketJob> = {
            let state = self.state.read().await;
            state
                .jobs
                .values()
                .filter(|job| job.phase == Phase::Evaluation)
                .cloned()
                .collect()
        };

        let mut records = Vec::with_capacity(waiting.len());
        for job in waiting {
            let verdict = evaluator.evaluate(&job).await;

            let mut state = self.state.write().await;
            let Some(current) = state.jobs.get_mut(&job.job_id) else {
                continue;
            };
            if current.phase != Phase::Evaluation {
                continue;
            }
            let next = if verdict.approved {
                Phase::Completed
            } else {
                Phase::Rejected
            };
            let buyer = current.buyer;
            current.advance(buyer, next, verdict.reasoning.clone());
            tracing::info!(job_id = %job.job_id, phase = %next, reasoning = %verdict.reasoning, "job evaluated");

            records.push(EvaluationRecord {
                job_id: job.job_id,
                verdict,
                phase: next,
            });
        }
        records
    }

    pub async fn job(&self, job_id: JobId) -> Option<MarketJob> {
        self.state.read().await.jobs.get(&job_id).cloned()
    }

    /// All jobs, ascending by id
    pub async fn jobs(&self) -> Vec<MarketJob> {
        self.state.read().await.jobs.values().cloned().collect()
    }

    /// What `agent` sees: every job it takes part in (terminal ones
    /// included) and the deliverables of its completed purchases
    pub async fn snapshot(&self, agent: AgentId) -> Result<MarketSnapshot> {
        let state = self.state.read().await;
        if !state.agents.contains_key(&agent) {
            return Err(MarketError::UnknownAgent(agent));
        }

        let mut snapshot = MarketSnapshot::default();
        for job in state.jobs.values() {
            match job.role_of(agent) {
                Some(Role::Seller) => {
                    let entry = job.entry_for(&state.name_of(job.buyer));
                    snapshot.active_jobs_as_seller.push(entry);
                }
                Some(Role::Buyer) => {
                    let entry = job.entry_for(&state.name_of(job.seller));
                    snapshot.active_jobs_as_buyer.push(entry);
                    snapshot.acquired_items.extend(job.acquired_item());
                }
                None => {}
            }
        }
        Ok(snapshot)
    }
}

#[async_trait]
impl SnapshotSource for InMemoryMarketplace {
    async fn get_state(&self, agent: AgentId) -> std::result::Result<MarketSnapshot, EchonadeError> {
        self.snapshot(agent)
            .await
            .map_err(|e| EchonadeError::SnapshotUnavailable {
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl PaymentCapability for InMemoryMarketplace {
    async fn pay(&self, payer: AgentId, job_id: JobId) -> std::result::Result<(), EchonadeError> {
        self.pay_job(payer, job_id)
            .await
            .map_err(|e| EchonadeError::PaymentFailed {
                job_id,
                reason: e.to_string(),
            })
    }
}
