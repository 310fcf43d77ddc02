use async_trait::async_trait;
use echonade_ledger::InventoryLedger;
use echonade_types::Job;

use crate::args::ValidatedArgs;
use crate::error::{ProductionError, Result};
use crate::harvest::HARVESTED_VALUE;
use crate::kind::{Artifact, DeliverableKind, DeliverableProducer};

/// Lemonade, made from lemons the agent acquired earlier.
///
/// Acquired lemons are not consumed: the ledger is append-only, so one lemon
/// delivery backs every later lemonade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LemonadeProducer;

#[async_trait]
impl DeliverableProducer for LemonadeProducer {
    fn kind(&self) -> DeliverableKind {
        DeliverableKind::Lemonade
    }

    async fn validate(&self, job: &Job, ledger: &InventoryLedger) -> Result<()> {
        if !ledger.has_acquired(|item| item.value == HARVESTED_VALUE).await {
            return Err(ProductionError::precondition(
                job.job_id,
                "No lemons available in inventory",
            ));
        }
        Ok(())
    }

    async fn produce(&self, _job: &Job, _args: &ValidatedArgs) -> Result<Artifact> {
        Ok(Artifact::text("Lemonade"))
    }
}
