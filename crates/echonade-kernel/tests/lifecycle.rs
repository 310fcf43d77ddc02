//! End-to-end behaviour of one agent kernel against scripted collaborators

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use echonade_kernel::{
    AgentContext, AgentKernel, AuditStage, DecisionCapability, DecisionError, DecisionOutcome,
    Instruction, InstructionKind, KernelConfig, KernelError, RuntimeConfig, SnapshotSource,
    StandardReactionPolicy,
};
use echonade_types::{AgentId, EchonadeError, JobId, MarketSnapshot, Phase};
use serde_json::json;
use tokio::sync::{watch, Semaphore};

struct ScriptedSource {
    snapshot: Mutex<Result<MarketSnapshot, String>>,
}

impl ScriptedSource {
    fn new(snapshot: MarketSnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(Ok(snapshot)),
        })
    }

    fn failing(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Mutex::new(Err(reason.to_string())),
        })
    }

    fn set(&self, snapshot: MarketSnapshot) {
        *self.snapshot.lock().unwrap() = Ok(snapshot);
    }
}

#[async_trait]
impl SnapshotSource for ScriptedSource {
    async fn get_state(&self, _agent: AgentId) -> Result<MarketSnapshot, EchonadeError> {
        self.snapshot
            .lock()
            .unwrap()
            .clone()
            .map_err(|reason| EchonadeError::SnapshotUnavailable { reason })
    }
}

/// Records every decide call. Calls for gated jobs wait for a permit; calls
/// for failing jobs fail the given number of times first.
#[derive(Default)]
struct RecordingDecider {
    log: Mutex<Vec<String>>,
    gates: HashMap<(u64, Phase), Arc<Semaphore>>,
    failures: Mutex<HashMap<u64, usize>>,
}

impl RecordingDecider {
    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn position(&self, entry: &str) -> Option<usize> {
        self.log().iter().position(|e| e == entry)
    }
}

#[async_trait]
impl DecisionCapability for RecordingDecider {
    async fn decide(&self, instruction: &Instruction) -> Result<DecisionOutcome, DecisionError> {
        let key = format!("{} {}", instruction.job_id, instruction.phase);
        self.push(format!("start {}", key));

        if let Some(gate) = self.gates.get(&(instruction.job_id.get(), instruction.phase)) {
            let permit = gate.acquire().await.map_err(|e| DecisionError::Unavailable(e.to_string()))?;
            permit.forget();
        }

        let should_fail = {
            let mut failures = self.failures.lock().unwrap();
            match failures.get_mut(&instruction.job_id.get()) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };

        self.push(format!("end {}", key));
        if should_fail {
            return Err(DecisionError::ActionFailed(format!("{} not today", key)));
        }
        let verb = match instruction.kind {
            InstructionKind::DecideAcceptance => "accepted",
            InstructionKind::ProduceAndDeliver => "delivered",
            InstructionKind::RespondToTransaction => "responded",
        };
        Ok(DecisionOutcome::new(format!("{} {}", verb, key)))
    }
}

fn entry(id: u64, phase: &str) -> serde_json::Value {
    json!({ "jobId": id, "phase": phase, "counterparty": "Lemo", "price": 1.0 })
}

fn as_seller(entries: Vec<serde_json::Value>) -> MarketSnapshot {
    MarketSnapshot {
        active_jobs_as_seller: entries,
        ..Default::default()
    }
}

fn kernel(
    source: Arc<ScriptedSource>,
    decider: Arc<RecordingDecider>,
    runtime: RuntimeConfig,
) -> AgentKernel {
    AgentKernel::new(KernelConfig {
        context: AgentContext::new(AgentId::new(1), "Zestie"),
        source,
        decider,
        policy: Arc::new(StandardReactionPolicy),
        runtime,
    })
}

async fn wait_for(decider: &RecordingDecider, entry: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while decider.position(entry).is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("'{}' never happened, log: {:?}", entry, decider.log()));
}

#[tokio::test]
async fn test_same_job_transitions_are_dispatched_in_order() {
    let gate = Arc::new(Semaphore::new(0));
    let mut decider = RecordingDecider::default();
    decider.gates.insert((101, Phase::Request), gate.clone());
    let decider = Arc::new(decider);

    let source = ScriptedSource::new(as_seller(vec![entry(101, "REQUEST"), entry(202, "REQUEST")]));
    let mut kernel = kernel(source.clone(), decider.clone(), RuntimeConfig::default());

    let report = kernel.run_cycle().await.unwrap();
    assert_eq!(report.transitions, 2);

    // Job 202 is not held up by the blocked job 101
    wait_for(&decider, "end 202 REQUEST").await;
    assert!(decider.position("end 101 REQUEST").is_none());

    // 101 advances while its REQUEST reaction is still running
    source.set(as_seller(vec![entry(101, "TRANSACTION"), entry(202, "REQUEST")]));
    let report = kernel.run_cycle().await.unwrap();
    assert_eq!(report.transitions, 1);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(decider.position("start 101 TRANSACTION").is_none());

    gate.add_permits(1);
    kernel.settle(Duration::from_secs(5)).await;

    let request_done = decider.position("end 101 REQUEST").unwrap();
    let transaction_started = decider.position("start 101 TRANSACTION").unwrap();
    assert!(request_done < transaction_started);

    let baseline = kernel.context().registry.baseline().await;
    assert_eq!(baseline.jobs[&JobId::new(101)].phase, Some(Phase::Transaction));
    assert!(!kernel.context().registry.has_pending().await);

    // Nothing is re-dispatched once everything is processed
    let report = kernel.run_cycle().await.unwrap();
    assert_eq!(report.transitions, 0);
}

#[tokio::test]
async fn test_one_malformed_entry_among_five() {
    let decider = Arc::new(RecordingDecider::default());
    let source = ScriptedSource::new(as_seller(vec![
        entry(1, "REQUEST"),
        entry(2, "REQUEST"),
        json!({ "jobId": 3, "phase": "REQUEST", "counterparty": "Lemo" }),
        entry(4, "TRANSACTION"),
        entry(5, "REQUEST"),
    ]));
    let mut kernel = kernel(source, decider.clone(), RuntimeConfig::default());

    let report = kernel.run_cycle().await.unwrap();
    assert_eq!(report.transitions, 4);
    assert_eq!(report.detector_errors, 1);

    kernel.settle(Duration::from_secs(5)).await;
    assert_eq!(decider.log().len(), 8);
    assert!(decider.position("start 3 REQUEST").is_none());

    let errors = kernel.trace().entries_for(JobId::new(3));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stage, AuditStage::Error);
}

#[tokio::test]
async fn test_failed_reaction_is_retried_next_cycle() {
    let decider = RecordingDecider::default();
    decider.failures.lock().unwrap().insert(7, 1);
    let decider = Arc::new(decider);

    let source = ScriptedSource::new(as_seller(vec![entry(7, "TRANSACTION")]));
    let mut kernel = kernel(source, decider.clone(), RuntimeConfig::default());

    assert_eq!(kernel.run_cycle().await.unwrap().transitions, 1);
    kernel.settle(Duration::from_secs(5)).await;
    assert_eq!(kernel.phase_of(JobId::new(7)).await, Some(Phase::Transaction));

    assert_eq!(kernel.run_cycle().await.unwrap().transitions, 1);
    kernel.settle(Duration::from_secs(5)).await;

    assert_eq!(kernel.run_cycle().await.unwrap().transitions, 0);

    let summary = kernel.summary().await;
    assert_eq!(summary.reactions_failed, 1);
    assert_eq!(summary.reactions_completed, 1);
}

#[tokio::test]
async fn test_vanished_job_is_closed_and_archived() {
    let decider = Arc::new(RecordingDecider::default());
    let source = ScriptedSource::new(MarketSnapshot {
        active_jobs_as_buyer: vec![entry(11, "EVALUATION")],
        ..Default::default()
    });
    let mut kernel = kernel(source.clone(), decider.clone(), RuntimeConfig::default());

    kernel.run_cycle().await.unwrap();
    kernel.settle(Duration::from_secs(5)).await;

    source.set(MarketSnapshot::default());
    let report = kernel.run_cycle().await.unwrap();
    assert_eq!(report.transitions, 1);
    kernel.settle(Duration::from_secs(5)).await;

    assert!(kernel.context().registry.is_archived(JobId::new(11)).await);
    assert!(decider.log().is_empty());
    assert_eq!(kernel.summary().await.reactions_skipped, 2);
}

#[tokio::test]
async fn test_snapshot_failures_do_not_stop_the_loop() {
    let decider = Arc::new(RecordingDecider::default());
    let runtime = RuntimeConfig {
        poll_interval_ms: 1,
        max_cycles: Some(3),
        ..Default::default()
    };
    let mut kernel = kernel(ScriptedSource::failing("marketplace down"), decider, runtime);

    let err = kernel.run_cycle().await.unwrap_err();
    assert!(matches!(err, KernelError::Snapshot { .. }));

    let (_tx, rx) = watch::channel(false);
    let summary = kernel.run(rx).await;
    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.failed_cycles, 2);
}

#[tokio::test]
async fn test_shutdown_signal_stops_the_loop() {
    let decider = Arc::new(RecordingDecider::default());
    let source = ScriptedSource::new(as_seller(vec![entry(1, "REQUEST")]));
    let kernel = kernel(source, decider.clone(), RuntimeConfig::default());

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(kernel.run(rx));
    wait_for(&decider, "end 1 REQUEST").await;
    tx.send(true).unwrap();

    let summary = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.reactions_completed, 1);
}

#[tokio::test]
async fn test_journal_records_responses() {
    let dir = std::env::temp_dir().join(format!("echonade-kernel-journal-{}", std::process::id()));
    let decider = Arc::new(RecordingDecider::default());
    let source = ScriptedSource::new(as_seller(vec![entry(101, "REQUEST")]));
    let runtime = RuntimeConfig {
        journal_dir: Some(dir.clone()),
        ..Default::default()
    };
    let mut kernel = kernel(source, decider, runtime);

    kernel.run_cycle().await.unwrap();
    kernel.settle(Duration::from_secs(5)).await;
    kernel.run_cycle().await.unwrap();

    let log = tokio::fs::read_to_string(dir.join("zestie.log")).await.unwrap();
    assert!(log.contains(" - Zestie has responded to the job #101"));

    let state: serde_json::Value =
        serde_json::from_str(&tokio::fs::read_to_string(dir.join("zestie.json")).await.unwrap())
            .unwrap();
    assert_eq!(state["name"], "Zestie");
    assert_eq!(state["jobs"]["asSeller"][0]["job_id"], 101);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}
