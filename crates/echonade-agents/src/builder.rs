//! The single construction path from template to running kernel

use std::sync::Arc;

use echonade_kernel::{
    AgentContext, AgentKernel, KernelConfig, PaymentCapability, RuntimeConfig, SnapshotSource,
    StandardReactionPolicy,
};
use echonade_market::{AutoApprove, Evaluator, InMemoryMarketplace};
use echonade_producers::{
    ContentGenerator, DigestImageGenerator, PermitIssuer, ProducerConfig, TimestampPermitIssuer,
    Workshop,
};

use crate::brain::{JobActions, ScriptedReasoner};
use crate::template::AgentTemplate;

/// Collaborators shared by every agent of a run
#[derive(Clone)]
pub struct AgentDeps {
    pub source: Arc<dyn SnapshotSource>,
    pub actions: Arc<dyn JobActions>,
    pub payments: Arc<dyn PaymentCapability>,
    pub generator: Arc<dyn ContentGenerator>,
    pub issuer: Arc<dyn PermitIssuer>,
    pub runtime: RuntimeConfig,
    pub producers: ProducerConfig,
}

impl AgentDeps {
    /// Everything backed by one in-process marketplace and the bundled
    /// offline generators
    pub fn in_memory(
        market: &InMemoryMarketplace,
        runtime: RuntimeConfig,
        producers: ProducerConfig,
    ) -> Self {
        let market = Arc::new(market.clone());
        Self {
            source: market.clone(),
            actions: market.clone(),
            payments: market,
            generator: Arc::new(DigestImageGenerator::new(producers.poster_base_url.clone())),
            issuer: Arc::new(TimestampPermitIssuer::new(producers.permit_base_url.clone())),
            runtime,
            producers,
        }
    }
}

pub struct AgentBuilder;

impl AgentBuilder {
    /// Build the kernel for `template`. Starts the agent's dispatcher, so it
    /// must be called inside a tokio runtime.
    pub fn build(template: &AgentTemplate, deps: &AgentDeps) -> AgentKernel {
        let context = AgentContext::new(template.entity_id, template.name.clone());
        let workshop = Workshop::standard(
            context.registry.clone(),
            context.ledger.clone(),
            &deps.producers,
            deps.generator.clone(),
            deps.issuer.clone(),
        );
        let reasoner = ScriptedReasoner::new(
            template,
            workshop,
            deps.actions.clone(),
            deps.payments.clone(),
        );

        tracing::debug!(agent = %template.name, roles = ?template.roles(), "agent built");
        AgentKernel::new(KernelConfig {
            context,
            source: deps.source.clone(),
            decider: Arc::new(reasoner),
            policy: Arc::new(StandardReactionPolicy),
            runtime: deps.runtime.clone(),
        })
    }

    /// The evaluator an evaluating template stands for
    pub fn evaluator(template: &AgentTemplate) -> Option<Arc<dyn Evaluator>> {
        template
            .evaluates
            .then(|| Arc::new(AutoApprove) as Arc<dyn Evaluator>)
    }
}
