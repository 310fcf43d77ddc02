use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Upper bound for one external generation or issuing call
    #[serde(default = "default_generation_timeout")]
    pub generation_timeout_ms: u64,

    #[serde(default = "default_permit_base_url")]
    pub permit_base_url: String,

    #[serde(default = "default_poster_base_url")]
    pub poster_base_url: String,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            generation_timeout_ms: default_generation_timeout(),
            permit_base_url: default_permit_base_url(),
            poster_base_url: default_poster_base_url(),
        }
    }
}

impl ProducerConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }
}

fn default_generation_timeout() -> u64 {
    30_000
}

fn default_permit_base_url() -> String {
    "https://business-permits.example.com".to_string()
}

fn default_poster_base_url() -> String {
    "https://posters.example.com".to_string()
}
