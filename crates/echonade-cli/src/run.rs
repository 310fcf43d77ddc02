//! The `run` command: one marketplace, the default roster, until Ctrl-C or
//! the configured cycle count

use std::sync::Arc;

use echonade_agents::{default_roster, place_orders, register_roster, AgentBuilder, AgentDeps};
use echonade_kernel::KernelSummary;
use echonade_market::{Evaluator, InMemoryMarketplace, MarketJob};
use echonade_types::Phase;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::EchonadeConfig;
use crate::display;

pub struct RunReport {
    pub summaries: Vec<KernelSummary>,
    pub jobs: Vec<MarketJob>,
}

pub async fn run(config: EchonadeConfig) -> anyhow::Result<RunReport> {
    let market = InMemoryMarketplace::new();
    let roster = default_roster();
    register_roster(&market, &roster).await?;
    let job_ids = place_orders(&market, &roster, &config.market.orders).await?;
    tracing::info!(agents = roster.len(), jobs = job_ids.len(), "marketplace ready");

    let deps = AgentDeps::in_memory(&market, config.runtime.clone(), config.producers.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut kernels = JoinSet::new();
    for template in &roster {
        let kernel = AgentBuilder::build(template, &deps);
        kernels.spawn(kernel.run(shutdown_rx.clone()));
    }

    let evaluators: Vec<Arc<dyn Evaluator>> =
        roster.iter().filter_map(AgentBuilder::evaluator).collect();
    let evaluation = tokio::spawn(evaluate_loop(
        market.clone(),
        evaluators,
        config.market.evaluation_interval(),
        shutdown_rx,
    ));

    let collect = collect_summaries(&mut kernels);
    tokio::pin!(collect);
    let summaries = tokio::select! {
        summaries = &mut collect => summaries?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, stopping agents");
            let _ = shutdown_tx.send(true);
            collect.await?
        }
    };

    let _ = shutdown_tx.send(true);
    evaluation.await?;

    Ok(RunReport {
        summaries,
        jobs: market.jobs().await,
    })
}

async fn collect_summaries(
    kernels: &mut JoinSet<KernelSummary>,
) -> anyhow::Result<Vec<KernelSummary>> {
    let mut summaries = Vec::new();
    while let Some(joined) = kernels.join_next().await {
        summaries.push(joined?);
    }
    summaries.sort_by(|a, b| a.agent.cmp(&b.agent));
    Ok(summaries)
}

async fn evaluate_loop(
    market: InMemoryMarketplace,
    evaluators: Vec<Arc<dyn Evaluator>>,
    interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                for evaluator in &evaluators {
                    for record in market.evaluate_pending(evaluator.as_ref()).await {
                        tracing::debug!(job_id = %record.job_id, phase = %record.phase, "evaluation recorded");
                    }
                }
            }
        }
    }
}

pub fn print_report(report: &RunReport) {
    display::section("Agents");
    for summary in &report.summaries {
        let line = format!(
            "{}: {} cycles, {} transitions, {} reactions completed",
            summary.agent,
            summary.cycles,
            summary.transitions_dispatched,
            summary.reactions_completed
        );
        if summary.reactions_failed > 0 || summary.failed_cycles > 0 {
            display::warning(&line);
            display::kv("failed reactions", &summary.reactions_failed.to_string());
            display::kv("failed cycles", &summary.failed_cycles.to_string());
        } else {
            display::success(&line);
        }
        display::kv("produced", &summary.produced_items.to_string());
        display::kv("acquired", &summary.acquired_items.to_string());
    }

    display::section("Jobs");
    for job in &report.jobs {
        let line = format!("#{} {} ({:.2})", job.job_id, job.description, job.price);
        match job.phase {
            Phase::Completed => display::success(&line),
            Phase::Rejected => display::warning(&line),
            _ => display::info(&line),
        }
        display::kv("phase", job.phase.as_str());
        if let Some(delivery) = &job.delivery {
            display::kv("deliverable", &delivery.value);
        }
    }
}
