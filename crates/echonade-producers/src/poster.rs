use std::sync::Arc;

use async_trait::async_trait;
use echonade_types::Job;

use crate::args::ValidatedArgs;
use crate::error::{ProductionError, Result};
use crate::generator::ContentGenerator;
use crate::kind::{Artifact, DeliverableKind, DeliverableProducer};

/// Marketing poster rendered by the content generator from the caller's
/// prompt
pub struct PosterProducer {
    generator: Arc<dyn ContentGenerator>,
}

impl PosterProducer {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl DeliverableProducer for PosterProducer {
    fn kind(&self) -> DeliverableKind {
        DeliverableKind::Poster
    }

    async fn produce(&self, _job: &Job, args: &ValidatedArgs) -> Result<Artifact> {
        let prompt = args
            .prompt
            .as_deref()
            .ok_or_else(|| ProductionError::MissingArguments {
                missing: vec!["prompt".to_string()],
            })?;

        let url = self
            .generator
            .generate(prompt)
            .await
            .map_err(|e| ProductionError::GenerationFailed {
                kind: DeliverableKind::Poster,
                reason: e.to_string(),
            })?;
        Ok(Artifact::url(url))
    }
}
