//! Producer arguments as handed over by a decision capability

use echonade_types::JobId;
use serde::{Deserialize, Serialize};

use crate::error::{ProductionError, Result};
use crate::kind::DeliverableKind;

/// Raw, possibly incomplete arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProduceArgs {
    pub job_id: Option<String>,
    pub reasoning: Option<String>,
    pub prompt: Option<String>,
}

impl ProduceArgs {
    pub fn new(job_id: impl ToString, reasoning: impl Into<String>) -> Self {
        Self {
            job_id: Some(job_id.to_string()),
            reasoning: Some(reasoning.into()),
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Check presence of everything `kind` needs. Blank strings count as
    /// missing, and so does a job id that is not a number.
    pub fn validate(&self, kind: DeliverableKind) -> Result<ValidatedArgs> {
        let mut missing = Vec::new();

        let job_id = match present(&self.job_id) {
            Some(raw) => match JobId::parse(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    missing.push(format!("jobId (not a job id: '{}')", raw));
                    None
                }
            },
            None => {
                missing.push("jobId".to_string());
                None
            }
        };

        let reasoning = present(&self.reasoning);
        if reasoning.is_none() {
            missing.push("reasoning".to_string());
        }

        let prompt = present(&self.prompt);
        if kind.requires_prompt() && prompt.is_none() {
            missing.push("prompt".to_string());
        }

        match (job_id, reasoning) {
            (Some(job_id), Some(reasoning)) if missing.is_empty() => Ok(ValidatedArgs {
                job_id,
                reasoning: reasoning.to_string(),
                prompt: prompt.map(str::to_string),
            }),
            _ => Err(ProductionError::MissingArguments { missing }),
        }
    }
}

/// Arguments after the presence check
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArgs {
    pub job_id: JobId,
    pub reasoning: String,
    /// Present whenever the kind requires it
    pub prompt: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
