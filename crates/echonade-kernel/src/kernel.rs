//! AgentKernel core runtime
//!
//! One kernel drives one agent: poll the marketplace, detect transitions,
//! hand them to the dispatcher, fold dispatch outcomes back into the
//! registry. A failing cycle is logged and the loop carries on.

use std::sync::Arc;
use std::time::Duration;

use echonade_types::{EchonadeError, JobId, Phase};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::capability::{DecisionCapability, SnapshotSource};
use crate::config::RuntimeConfig;
use crate::context::AgentContext;
use crate::detector::detect_transitions;
use crate::dispatch::{DispatchOutcome, DispatchStatus, Dispatcher};
use crate::journal::AgentJournal;
use crate::policy::ReactionPolicy;
use crate::trace::{AuditStage, AuditTrail};

pub struct KernelConfig {
    pub context: AgentContext,
    pub source: Arc<dyn SnapshotSource>,
    pub decider: Arc<dyn DecisionCapability>,
    pub policy: Arc<dyn ReactionPolicy>,
    pub runtime: RuntimeConfig,
}

#[derive(Error, Debug, Clone)]
pub enum KernelError {
    #[error("Snapshot fetch failed: {reason}")]
    Snapshot { reason: String },

    #[error("Snapshot fetch timed out after {timeout_ms}ms")]
    SnapshotTimeout { timeout_ms: u64 },

    #[error("Dispatcher is closed")]
    DispatcherClosed,
}

impl From<KernelError> for EchonadeError {
    fn from(err: KernelError) -> Self {
        match err {
            KernelError::Snapshot { reason } => EchonadeError::SnapshotUnavailable { reason },
            KernelError::SnapshotTimeout { timeout_ms } => EchonadeError::SnapshotUnavailable {
                reason: format!("timed out after {}ms", timeout_ms),
            },
            KernelError::DispatcherClosed => EchonadeError::internal("dispatcher is closed"),
        }
    }
}

/// What one polling cycle did
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    /// Outcomes of earlier dispatches folded in at the start of the cycle
    pub outcomes_applied: usize,
    pub acquired_synced: usize,
    pub transitions: usize,
    pub detector_errors: usize,
}

/// Totals over a kernel's lifetime
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KernelSummary {
    pub agent: String,
    pub cycles: u64,
    pub failed_cycles: u64,
    pub transitions_dispatched: u64,
    pub reactions_completed: u64,
    pub reactions_skipped: u64,
    pub reactions_failed: u64,
    pub detector_errors: u64,
    pub tracked_jobs: usize,
    pub produced_items: usize,
    pub acquired_items: usize,
}

pub struct AgentKernel {
    context: AgentContext,
    source: Arc<dyn SnapshotSource>,
    runtime: RuntimeConfig,
    dispatcher: Dispatcher,
    outcomes: mpsc::UnboundedReceiver<DispatchOutcome>,
    journal: Option<AgentJournal>,
    trace: AuditTrail,
    cycle: u64,
    totals: KernelSummary,
}

impl AgentKernel {
    /// Build the kernel and start its dispatcher. Must be called inside a
    /// tokio runtime.
    pub fn new(config: KernelConfig) -> Self {
        let name = config.context.name.clone();
        let (dispatcher, outcomes) =
            Dispatcher::spawn(&name, config.decider, config.policy, &config.runtime);
        let journal = config
            .runtime
            .journal_dir
            .as_ref()
            .map(|dir| AgentJournal::new(dir, &name));

        Self {
            trace: AuditTrail::new(&name, config.runtime.trace_max_entries),
            totals: KernelSummary {
                agent: name,
                ..Default::default()
            },
            context: config.context,
            source: config.source,
            runtime: config.runtime,
            dispatcher,
            outcomes,
            journal,
            cycle: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.context.name
    }

    pub fn context(&self) -> &AgentContext {
        &self.context
    }

    pub fn trace(&self) -> &AuditTrail {
        &self.trace
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Run one polling cycle
    pub async fn run_cycle(&mut self) -> Result<CycleReport, KernelError> {
        self.cycle += 1;
        self.totals.cycles = self.cycle;
        let mut report = CycleReport {
            cycle: self.cycle,
            outcomes_applied: self.drain_outcomes().await,
            ..Default::default()
        };

        let fetch = self.source.get_state(self.context.agent_id);
        let snapshot = match tokio::time::timeout(self.runtime.snapshot_timeout(), fetch).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                return Err(KernelError::Snapshot {
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(KernelError::SnapshotTimeout {
                    timeout_ms: self.runtime.snapshot_timeout_ms,
                })
            }
        };

        report.acquired_synced = self.context.ledger.sync_acquired(&snapshot.acquired_items).await;
        if report.acquired_synced > 0 {
            self.trace.record(
                AuditStage::Ledger,
                None,
                "acquired items synced",
                Some(serde_json::json!({ "count": report.acquired_synced })),
            );
        }

        let baseline = self.context.registry.baseline().await;
        let detection = detect_transitions(&baseline, &snapshot);

        for err in &detection.errors {
            tracing::warn!(agent = %self.context.name, error = %err, "snapshot entry rejected");
            self.trace.record(
                AuditStage::Error,
                err.job_id,
                err.to_string(),
                serde_json::to_value(err).ok(),
            );
        }
        report.detector_errors = detection.errors.len();
        self.totals.detector_errors += detection.errors.len() as u64;

        for job in detection.observed {
            if let Err(e) = self.context.registry.upsert(job).await {
                tracing::warn!(agent = %self.context.name, error = %e, "registry update rejected");
            }
        }

        for event in detection.events {
            tracing::info!(
                agent = %self.context.name,
                job_id = %event.job_id,
                phase = %event.new_phase,
                "transition detected: {}",
                event
            );
            self.context
                .registry
                .mark_pending(event.job_id, event.new_phase)
                .await;
            self.trace.record(
                AuditStage::Detect,
                Some(event.job_id),
                event.to_string(),
                Some(serde_json::json!({
                    "from": event.previous_phase,
                    "to": event.new_phase,
                    "role": event.role,
                })),
            );
            self.dispatcher
                .submit(event)
                .await
                .map_err(|_| KernelError::DispatcherClosed)?;
            report.transitions += 1;
            self.totals.transitions_dispatched += 1;
        }

        self.write_state().await;
        Ok(report)
    }

    /// Fold one dispatch outcome into the registry
    pub async fn apply_outcome(&mut self, outcome: DispatchOutcome) {
        let job_id = outcome.event.job_id;
        let phase = outcome.event.new_phase;
        let elapsed_ms = outcome.elapsed.as_millis() as u64;

        match outcome.result {
            Ok(status) => {
                let archived = self.context.registry.commit_processed(job_id, phase).await;
                match status {
                    DispatchStatus::Completed(decision) => {
                        self.totals.reactions_completed += 1;
                        self.trace.record(
                            AuditStage::Dispatch,
                            Some(job_id),
                            "reaction completed",
                            Some(serde_json::json!({
                                "phase": phase,
                                "summary": decision.summary,
                                "elapsed_ms": elapsed_ms,
                            })),
                        );
                        self.journal_line(format!(
                            "{} has responded to the job #{}",
                            self.context.name, job_id
                        ))
                        .await;
                    }
                    DispatchStatus::Skipped => {
                        self.totals.reactions_skipped += 1;
                        self.trace.record(
                            AuditStage::Dispatch,
                            Some(job_id),
                            "no reaction defined",
                            Some(serde_json::json!({ "phase": phase })),
                        );
                    }
                }
                if archived {
                    tracing::debug!(agent = %self.context.name, job_id = %job_id, phase = %phase, "job archived");
                }
            }
            Err(e) => {
                self.context.registry.release_pending(job_id, phase).await;
                self.totals.reactions_failed += 1;
                tracing::warn!(
                    agent = %self.context.name,
                    job_id = %job_id,
                    phase = %phase,
                    error = %e,
                    retriable = e.is_retriable(),
                    "reaction failed, will retry next cycle"
                );
                self.trace.record(
                    AuditStage::Error,
                    Some(job_id),
                    e.to_string(),
                    Some(serde_json::json!({
                        "phase": phase,
                        "code": e.error_code(),
                        "elapsed_ms": elapsed_ms,
                    })),
                );
                self.journal_line(format!(
                    "{} failed to respond to the job #{}: {}",
                    self.context.name, job_id, e
                ))
                .await;
            }
        }
    }

    /// Apply every outcome that has already arrived
    pub async fn drain_outcomes(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.outcomes.try_recv() {
            self.apply_outcome(outcome).await;
            applied += 1;
        }
        applied
    }

    /// Wait for in-flight reactions to finish, up to `timeout`
    pub async fn settle(&mut self, timeout: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut applied = self.drain_outcomes().await;

        while self.context.registry.has_pending().await {
            match tokio::time::timeout_at(deadline, self.outcomes.recv()).await {
                Ok(Some(outcome)) => {
                    self.apply_outcome(outcome).await;
                    applied += 1;
                }
                Ok(None) | Err(_) => break,
            }
        }
        applied
    }

    /// Poll until `shutdown` flips to true (or its sender goes away), or
    /// until `max_cycles` is reached
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> KernelSummary {
        tracing::info!(agent = %self.context.name, agent_id = %self.context.agent_id, "agent started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_cycle().await {
                Ok(report) if report.transitions > 0 || report.detector_errors > 0 => {
                    tracing::debug!(agent = %self.context.name, ?report, "cycle finished");
                }
                Ok(_) => {}
                Err(e) => {
                    self.totals.failed_cycles += 1;
                    tracing::error!(agent = %self.context.name, cycle = self.cycle, error = %e, "cycle failed");
                }
            }

            if self.runtime.max_cycles.is_some_and(|max| self.cycle >= max) {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.runtime.poll_interval()) => {}
            }
        }

        self.shutdown().await
    }

    /// Close the dispatcher, fold in what the lanes still deliver, write the
    /// final state
    pub async fn shutdown(mut self) -> KernelSummary {
        self.dispatcher.close().await;
        while let Some(outcome) = self.outcomes.recv().await {
            self.apply_outcome(outcome).await;
        }
        self.write_state().await;

        let summary = self.summary().await;
        tracing::info!(
            agent = %summary.agent,
            cycles = summary.cycles,
            completed = summary.reactions_completed,
            failed = summary.reactions_failed,
            "agent stopped"
        );
        summary
    }

    pub async fn summary(&self) -> KernelSummary {
        KernelSummary {
            tracked_jobs: self.context.registry.len().await,
            produced_items: self.context.ledger.produced().await.len(),
            acquired_items: self.context.ledger.acquired().await.len(),
            ..self.totals.clone()
        }
    }

    /// Last observed phase of a tracked job
    pub async fn phase_of(&self, job_id: JobId) -> Option<Phase> {
        self.context.registry.get(job_id).await.map(|job| job.phase)
    }

    async fn write_state(&self) {
        if let Some(journal) = &self.journal {
            let view = self.context.state_view(self.cycle).await;
            journal.write_state(&view).await;
        }
    }

    async fn journal_line(&self, message: String) {
        if let Some(journal) = &self.journal {
            journal.append(&message).await;
        }
    }
}
