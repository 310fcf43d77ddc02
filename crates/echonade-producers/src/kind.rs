//! Deliverable kinds and the producer capability

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use echonade_ledger::InventoryLedger;
use echonade_types::{ItemType, Job, JobId};
use serde::{Deserialize, Serialize};

use crate::args::ValidatedArgs;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverableKind {
    Permit,
    Lemonade,
    Poster,
    HarvestedLemon,
}

impl DeliverableKind {
    pub const ALL: [DeliverableKind; 4] = [
        DeliverableKind::Permit,
        DeliverableKind::Lemonade,
        DeliverableKind::Poster,
        DeliverableKind::HarvestedLemon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliverableKind::Permit => "permit",
            DeliverableKind::Lemonade => "lemonade",
            DeliverableKind::Poster => "poster",
            DeliverableKind::HarvestedLemon => "harvested_lemon",
        }
    }

    /// Human name used in messages
    pub fn noun(&self) -> &'static str {
        match self {
            DeliverableKind::Permit => "business permit",
            DeliverableKind::Lemonade => "lemonade",
            DeliverableKind::Poster => "marketing image",
            DeliverableKind::HarvestedLemon => "lemons",
        }
    }

    pub fn item_type(&self) -> ItemType {
        match self {
            DeliverableKind::Permit | DeliverableKind::Poster => ItemType::Url,
            DeliverableKind::Lemonade | DeliverableKind::HarvestedLemon => ItemType::Text,
        }
    }

    /// Poster generation needs a prompt on top of job id and reasoning
    pub fn requires_prompt(&self) -> bool {
        matches!(self, DeliverableKind::Poster)
    }

    pub(crate) fn already_produced(&self, job_id: JobId) -> String {
        match self {
            DeliverableKind::HarvestedLemon => format!(
                "Lemons already harvested for job with id {}. Proceed to deliver the lemons.",
                job_id
            ),
            other => format!(
                "A {} was already made for job with id {}. Proceed to deliver it.",
                other.noun(),
                job_id
            ),
        }
    }

    pub(crate) fn confirmation(&self, job_id: JobId, reasoning: &str, artifact: &Artifact) -> String {
        match self {
            DeliverableKind::Permit => format!(
                "Made business permit for job with id {} because {}. Permit URL: {}",
                job_id, reasoning, artifact.value
            ),
            DeliverableKind::Lemonade => {
                format!("Made lemonades for job with id {} because {}", job_id, reasoning)
            }
            DeliverableKind::Poster => format!(
                "Generated marketing image for job with id {} because {}. Image URL: {}",
                job_id, reasoning, artifact.value
            ),
            DeliverableKind::HarvestedLemon => {
                format!("Harvested lemons for job with id {} because {}", job_id, reasoning)
            }
        }
    }
}

impl fmt::Display for DeliverableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliverableKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        DeliverableKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| format!("unknown deliverable kind '{}'", s))
    }
}

/// A made deliverable, not yet recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub item_type: ItemType,
    pub value: String,
}

impl Artifact {
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            item_type: ItemType::Text,
            value: value.into(),
        }
    }

    pub fn url(value: impl Into<String>) -> Self {
        Self {
            item_type: ItemType::Url,
            value: value.into(),
        }
    }
}

/// One deliverable kind. The workshop runs the shared checks; a producer
/// only adds its own material preconditions and makes the artifact.
#[async_trait]
pub trait DeliverableProducer: Send + Sync {
    fn kind(&self) -> DeliverableKind;

    /// Kind-specific preconditions against the job and the agent's ledger
    async fn validate(&self, _job: &Job, _ledger: &InventoryLedger) -> Result<()> {
        Ok(())
    }

    /// Make the artifact. Must not touch the ledger.
    async fn produce(&self, job: &Job, args: &ValidatedArgs) -> Result<Artifact>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!("harvested-lemon".parse::<DeliverableKind>().unwrap(), DeliverableKind::HarvestedLemon);
        assert_eq!("Poster".parse::<DeliverableKind>().unwrap(), DeliverableKind::Poster);
        assert!("juice".parse::<DeliverableKind>().is_err());
    }

    #[test]
    fn test_item_types() {
        assert_eq!(DeliverableKind::Permit.item_type(), ItemType::Url);
        assert_eq!(DeliverableKind::HarvestedLemon.item_type(), ItemType::Text);
        assert!(DeliverableKind::Poster.requires_prompt());
        assert!(!DeliverableKind::Lemonade.requires_prompt());
    }
}
