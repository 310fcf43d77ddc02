//! Echonade CLI - run a cluster of marketplace agents
//!
//! ```bash
//! # Run the default roster until Ctrl-C
//! echonade run
//!
//! # Ten polling cycles per agent, journals under ./logs
//! echonade run --cycles 10 --journal-dir logs
//!
//! # Show who is in the cluster
//! echonade roster
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;
mod display;
mod run;

use config::{EchonadeConfig, LoggingConfig};

#[derive(Parser)]
#[command(name = "echonade")]
#[command(author = "Echonade Contributors")]
#[command(version)]
#[command(about = "Job lifecycle and reactive dispatch for marketplace agents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent cluster against an in-process marketplace
    Run {
        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop every agent after this many polling cycles
        #[arg(long)]
        cycles: Option<u64>,

        /// Directory for per-agent state snapshots and event logs
        #[arg(long)]
        journal_dir: Option<PathBuf>,

        /// Delay between polling cycles in milliseconds
        #[arg(long)]
        poll_ms: Option<u64>,
    },

    /// List the agents of the default cluster
    Roster,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            cycles,
            journal_dir,
            poll_ms,
        } => {
            let mut config = EchonadeConfig::load(config.as_deref())?;
            if cycles.is_some() {
                config.runtime.max_cycles = cycles;
            }
            if journal_dir.is_some() {
                config.runtime.journal_dir = journal_dir;
            }
            if let Some(poll_ms) = poll_ms {
                config.runtime.poll_interval_ms = poll_ms;
            }

            init_logging(&config.logging)?;
            print_banner(&config);

            let report = run::run(config).await?;
            run::print_report(&report);
        }
        Commands::Roster => print_roster(),
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => subscriber
            .with(fmt::layer().json().with_target(true))
            .try_init()?,
        _ => subscriber
            .with(fmt::layer().pretty().with_target(true))
            .try_init()?,
    }

    Ok(())
}

fn print_banner(config: &EchonadeConfig) {
    println!();
    println!("{}", "  🍋 Echonade".bright_yellow().bold());
    display::kv("cluster", echonade_agents::CLUSTER);
    display::kv("orders", &config.market.orders.len().to_string());
    display::kv("poll interval", &format!("{}ms", config.runtime.poll_interval_ms));
    match config.runtime.max_cycles {
        Some(max) => display::kv("cycles", &max.to_string()),
        None => display::kv("cycles", "until Ctrl-C"),
    }
    if let Some(dir) = &config.runtime.journal_dir {
        display::kv("journal", &dir.display().to_string());
    }
}

fn print_roster() {
    display::section(&format!("Cluster '{}'", echonade_agents::CLUSTER));
    for template in echonade_agents::default_roster() {
        display::info(&format!(
            "{} ({}) {}",
            template.name.bright_white().bold(),
            template.entity_id,
            template.roles().join(", ").bright_black()
        ));
        if let Some(kind) = template.deliverable {
            display::kv("sells", kind.noun());
        }
        display::kv("goal", &template.goal);
    }
}
