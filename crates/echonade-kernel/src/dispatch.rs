//! Reaction dispatcher
//!
//! Transition events enter through one bounded channel and are routed to a
//! lane task per job id. A lane handles its events one at a time, so a later
//! phase of a job is only dispatched once the earlier one completed or
//! failed. Lanes of different jobs run concurrently.
//!
//! Every processed event yields a [`DispatchOutcome`] on the outcome channel;
//! the kernel commits or releases the registry mark from it. A lane is closed
//! after its job's terminal event has been routed. Closing the dispatcher
//! lets every lane drain what is already queued.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use echonade_types::{EchonadeError, JobId, TransitionEvent};
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;

use crate::capability::{DecisionCapability, DecisionOutcome};
use crate::config::RuntimeConfig;
use crate::policy::ReactionPolicy;

/// How a dispatched event ended when it did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchStatus {
    /// The decision capability acted on the instruction
    Completed(DecisionOutcome),
    /// No instruction is defined for the event's role and phase
    Skipped,
}

/// Result of processing one transition event
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub event: TransitionEvent,
    pub result: Result<DispatchStatus, EchonadeError>,
    pub elapsed: Duration,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Everything a lane needs, shared by all lanes of one agent
struct LaneShared {
    agent: String,
    decider: Arc<dyn DecisionCapability>,
    policy: Arc<dyn ReactionPolicy>,
    decision_timeout: Duration,
    outcomes: mpsc::UnboundedSender<DispatchOutcome>,
}

pub struct Dispatcher {
    input: Option<mpsc::Sender<TransitionEvent>>,
    router: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start the routing task. Outcomes arrive on the returned receiver.
    pub fn spawn(
        agent: impl Into<String>,
        decider: Arc<dyn DecisionCapability>,
        policy: Arc<dyn ReactionPolicy>,
        config: &RuntimeConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DispatchOutcome>) {
        let (input_tx, input_rx) = mpsc::channel(config.dispatch_buffer.max(1));
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(LaneShared {
            agent: agent.into(),
            decider,
            policy,
            decision_timeout: config.decision_timeout(),
            outcomes: outcome_tx,
        });
        let router = tokio::spawn(route(input_rx, shared));

        (
            Self {
                input: Some(input_tx),
                router: Some(router),
            },
            outcome_rx,
        )
    }

    /// Queue an event. Waits while the input channel is full.
    pub async fn submit(&self, event: TransitionEvent) -> Result<(), EchonadeError> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| EchonadeError::internal("dispatcher is closed"))?;
        input
            .send(event)
            .await
            .map_err(|_| EchonadeError::internal("dispatcher is closed"))
    }

    pub fn is_closed(&self) -> bool {
        self.input.is_none()
    }

    /// Stop accepting events and wait until every lane has drained
    pub async fn close(&mut self) {
        self.input.take();
        if let Some(router) = self.router.take() {
            if let Err(e) = router.await {
                tracing::error!(error = %e, "dispatch router task failed");
            }
        }
    }
}

async fn route(mut input: mpsc::Receiver<TransitionEvent>, shared: Arc<LaneShared>) {
    let mut lanes: HashMap<JobId, mpsc::UnboundedSender<TransitionEvent>> = HashMap::new();
    let mut workers: JoinSet<JobId> = JoinSet::new();

    while let Some(event) = input.recv().await {
        // Reap lanes that already finished
        while let Some(Some(_)) = workers.join_next().now_or_never() {}

        let job_id = event.job_id;
        let terminal = event.is_terminal();

        let event = match lanes.get(&job_id) {
            Some(lane) => match lane.send(event) {
                Ok(()) => None,
                Err(mpsc::error::SendError(event)) => Some(event),
            },
            None => Some(event),
        };

        if let Some(event) = event {
            let (lane_tx, lane_rx) = mpsc::unbounded_channel();
            // A fresh receiver cannot be closed yet
            let _ = lane_tx.send(event);
            workers.spawn(run_lane(job_id, lane_rx, shared.clone()));
            lanes.insert(job_id, lane_tx);
        }

        if terminal {
            lanes.remove(&job_id);
        }
    }

    drop(lanes);
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            tracing::error!(agent = %shared.agent, error = %e, "dispatch lane failed");
        }
    }
    tracing::debug!(agent = %shared.agent, "dispatcher drained");
}

async fn run_lane(
    job_id: JobId,
    mut events: mpsc::UnboundedReceiver<TransitionEvent>,
    shared: Arc<LaneShared>,
) -> JobId {
    while let Some(event) = events.recv().await {
        let span = tracing::info_span!(
            "dispatch",
            agent = %shared.agent,
            job_id = %job_id,
            phase = %event.new_phase,
        );
        let started = Instant::now();
        let result = react(&event, &shared).instrument(span).await;
        let outcome = DispatchOutcome {
            event,
            result,
            elapsed: started.elapsed(),
        };
        if shared.outcomes.send(outcome).is_err() {
            tracing::debug!(job_id = %job_id, "outcome receiver dropped");
        }
    }
    job_id
}

async fn react(
    event: &TransitionEvent,
    shared: &LaneShared,
) -> Result<DispatchStatus, EchonadeError> {
    let Some(instruction) = shared.policy.instruct(event) else {
        tracing::debug!(role = %event.role, "no reaction defined");
        return Ok(DispatchStatus::Skipped);
    };

    tracing::info!(kind = ?instruction.kind, "dispatching instruction");
    let call = AssertUnwindSafe(shared.decider.decide(&instruction)).catch_unwind();

    match tokio::time::timeout(shared.decision_timeout, call).await {
        Ok(Ok(Ok(outcome))) => {
            tracing::info!(summary = %outcome.summary, "decision completed");
            Ok(DispatchStatus::Completed(outcome))
        }
        Ok(Ok(Err(e))) => {
            tracing::warn!(error = %e, "decision failed");
            Err(EchonadeError::DecisionFailed {
                job_id: event.job_id,
                reason: e.to_string(),
            })
        }
        Ok(Err(panic)) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "decision capability panicked".to_string());
            tracing::error!(reason = %reason, "decision capability panicked");
            Err(EchonadeError::DecisionFailed {
                job_id: event.job_id,
                reason,
            })
        }
        Err(_) => {
            tracing::warn!(timeout_ms = shared.decision_timeout.as_millis() as u64, "decision timed out");
            Err(EchonadeError::DispatchTimeout {
                job_id: event.job_id,
                timeout_ms: shared.decision_timeout.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::DecisionError;
    use crate::policy::{Instruction, StandardReactionPolicy};
    use async_trait::async_trait;
    use echonade_types::{Job, Phase, Role};

    struct EchoDecider;

    #[async_trait]
    impl DecisionCapability for EchoDecider {
        async fn decide(&self, instruction: &Instruction) -> Result<DecisionOutcome, DecisionError> {
            match instruction.job_id.get() {
                13 => Err(DecisionError::ActionFailed("unlucky job".to_string())),
                66 => panic!("decider blew up"),
                99 => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(DecisionOutcome::new("too late"))
                }
                _ => Ok(DecisionOutcome::new(format!("handled {}", instruction.phase))),
            }
        }
    }

    fn event(id: u64, phase: Phase, role: Role) -> TransitionEvent {
        let job = Job::from_entry(
            role,
            &serde_json::json!({ "jobId": id, "phase": phase, "counterparty": "Pixie", "price": 3.0 }),
        )
        .unwrap();
        TransitionEvent::new(None, job)
    }

    fn dispatcher(timeout_ms: u64) -> (Dispatcher, mpsc::UnboundedReceiver<DispatchOutcome>) {
        let config = RuntimeConfig {
            decision_timeout_ms: timeout_ms,
            ..Default::default()
        };
        Dispatcher::spawn("Lexie", Arc::new(EchoDecider), Arc::new(StandardReactionPolicy), &config)
    }

    async fn collect(
        mut dispatcher: Dispatcher,
        mut outcomes: mpsc::UnboundedReceiver<DispatchOutcome>,
    ) -> HashMap<u64, DispatchOutcome> {
        dispatcher.close().await;
        let mut by_job = HashMap::new();
        while let Some(outcome) = outcomes.recv().await {
            by_job.insert(outcome.event.job_id.get(), outcome);
        }
        by_job
    }

    #[tokio::test]
    async fn test_outcome_per_event() {
        let (dispatcher, outcomes) = dispatcher(1_000);
        dispatcher.submit(event(1, Phase::Request, Role::Seller)).await.unwrap();
        dispatcher.submit(event(2, Phase::Evaluation, Role::Seller)).await.unwrap();
        dispatcher.submit(event(13, Phase::Request, Role::Buyer)).await.unwrap();

        let by_job = collect(dispatcher, outcomes).await;

        assert_eq!(
            by_job[&1].result.clone().unwrap(),
            DispatchStatus::Completed(DecisionOutcome::new("handled REQUEST"))
        );
        assert_eq!(by_job[&2].result.clone().unwrap(), DispatchStatus::Skipped);
        assert_eq!(
            by_job[&13].result.clone().unwrap_err().error_code(),
            "DECISION_FAILED"
        );
    }

    #[tokio::test]
    async fn test_panicking_decider_is_isolated() {
        let (dispatcher, outcomes) = dispatcher(1_000);
        dispatcher.submit(event(66, Phase::Request, Role::Seller)).await.unwrap();
        dispatcher.submit(event(67, Phase::Request, Role::Seller)).await.unwrap();

        let by_job = collect(dispatcher, outcomes).await;

        let err = by_job[&66].result.clone().unwrap_err();
        assert!(err.to_string().contains("decider blew up"));
        assert!(by_job[&67].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_decision_times_out() {
        let (dispatcher, outcomes) = dispatcher(50);
        dispatcher.submit(event(99, Phase::Transaction, Role::Seller)).await.unwrap();

        let by_job = collect(dispatcher, outcomes).await;

        assert!(matches!(
            by_job[&99].result,
            Err(EchonadeError::DispatchTimeout { timeout_ms: 50, .. })
        ));
    }

    #[tokio::test]
    async fn test_submit_after_close_fails() {
        let (mut dispatcher, _outcomes) = dispatcher(1_000);
        dispatcher.close().await;

        assert!(dispatcher.is_closed());
        assert!(dispatcher.submit(event(1, Phase::Request, Role::Seller)).await.is_err());
    }
}
