use std::sync::Arc;

use async_trait::async_trait;
use echonade_types::Job;

use crate::args::ValidatedArgs;
use crate::error::{ProductionError, Result};
use crate::generator::PermitIssuer;
use crate::kind::{Artifact, DeliverableKind, DeliverableProducer};

/// Digital business permit, issued as a URL
pub struct PermitProducer {
    issuer: Arc<dyn PermitIssuer>,
}

impl PermitProducer {
    pub fn new(issuer: Arc<dyn PermitIssuer>) -> Self {
        Self { issuer }
    }
}

#[async_trait]
impl DeliverableProducer for PermitProducer {
    fn kind(&self) -> DeliverableKind {
        DeliverableKind::Permit
    }

    async fn produce(&self, job: &Job, _args: &ValidatedArgs) -> Result<Artifact> {
        let url = self
            .issuer
            .issue(job.job_id)
            .await
            .map_err(|e| ProductionError::GenerationFailed {
                kind: DeliverableKind::Permit,
                reason: e.to_string(),
            })?;
        Ok(Artifact::url(url))
    }
}
