//! Runner configuration
//!
//! Layered the usual way: an optional explicit file, then `config/default`
//! and `config/local`, then `ECHONADE__`-prefixed environment variables
//! (`ECHONADE__RUNTIME__POLL_INTERVAL_MS=1000`).

use std::path::Path;
use std::time::Duration;

use config::builder::DefaultState;
use config::ConfigBuilder;
use echonade_agents::{default_scenario, ScenarioOrder};
use echonade_kernel::RuntimeConfig;
use echonade_producers::ProducerConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EchonadeConfig {
    /// Per-agent kernel settings, shared by every agent of the run
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub producers: ProducerConfig,

    #[serde(default)]
    pub market: MarketSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The in-process marketplace and its opening orders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSettings {
    /// How often delivered jobs are evaluated
    #[serde(default = "default_evaluation_interval")]
    pub evaluation_interval_ms: u64,

    #[serde(default = "default_scenario")]
    pub orders: Vec<ScenarioOrder>,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            evaluation_interval_ms: default_evaluation_interval(),
            orders: default_scenario(),
        }
    }
}

impl MarketSettings {
    pub fn evaluation_interval(&self) -> Duration {
        Duration::from_millis(self.evaluation_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_evaluation_interval() -> u64 {
    2_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl EchonadeConfig {
    /// Load configuration from files and the environment
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        builder = builder
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("ECHONADE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        Self::build(builder)
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn from_toml(toml: &str) -> EchonadeConfig {
        let builder = config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        EchonadeConfig::build(builder).unwrap()
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = from_toml("");
        assert_eq!(config.runtime.poll_interval_ms, 5_000);
        assert_eq!(config.producers.generation_timeout_ms, 30_000);
        assert_eq!(config.market.orders, default_scenario());
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_file_overrides_sections() {
        let config = from_toml(
            r#"
            [runtime]
            poll_interval_ms = 250
            max_cycles = 12
            journal_dir = "logs"

            [logging]
            format = "json"

            [[market.orders]]
            buyer = "Lemo"
            seller = "Zestie"
            description = "Lemons"
            price = 2.5
            "#,
        );
        assert_eq!(config.runtime.poll_interval_ms, 250);
        assert_eq!(config.runtime.max_cycles, Some(12));
        assert_eq!(config.runtime.journal_dir.as_deref(), Some(Path::new("logs")));
        assert_eq!(config.runtime.decision_timeout_ms, 60_000);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.market.orders.len(), 1);
        assert_eq!(config.market.evaluation_interval_ms, 2_000);
    }
}
