use async_trait::async_trait;
use echonade_types::Job;

use crate::args::ValidatedArgs;
use crate::error::Result;
use crate::kind::{Artifact, DeliverableKind, DeliverableProducer};

pub const HARVESTED_VALUE: &str = "Lemon";

/// Lemons straight from the tree
#[derive(Debug, Clone, Copy, Default)]
pub struct HarvestProducer;

#[async_trait]
impl DeliverableProducer for HarvestProducer {
    fn kind(&self) -> DeliverableKind {
        DeliverableKind::HarvestedLemon
    }

    async fn produce(&self, _job: &Job, _args: &ValidatedArgs) -> Result<Artifact> {
        Ok(Artifact::text(HARVESTED_VALUE))
    }
}
