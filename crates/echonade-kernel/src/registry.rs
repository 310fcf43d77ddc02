//! Job registry - one agent's view of the jobs it takes part in
//!
//! For every tracked job the registry keeps the job as last observed plus two
//! dispatch marks: the phase whose reaction last completed (`processed`) and
//! the newest phase handed to the dispatcher but not yet finished
//! (`pending`). The detector diffs snapshots against `pending` or, failing
//! that, `processed`, so a failed reaction is re-detected on the next cycle
//! while an in-flight one is never dispatched twice.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use echonade_types::{EchonadeError, Job, JobId, Phase, Result, Role};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct TrackedJob {
    job: Job,
    processed: Option<Phase>,
    pending: Option<Phase>,
}

impl TrackedJob {
    fn last_known(&self) -> Option<Phase> {
        self.pending.or(self.processed)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    jobs: BTreeMap<JobId, TrackedJob>,
    archived: BTreeMap<JobId, Phase>,
}

/// Last known state of one tracked job, as handed to the detector
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineEntry {
    pub role: Role,
    /// Phase of the newest dispatched or processed transition
    pub phase: Option<Phase>,
    /// The job as last observed
    pub job: Job,
}

/// Everything the detector needs to know about previous observations
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Baseline {
    pub jobs: BTreeMap<JobId, BaselineEntry>,
    pub archived: BTreeMap<JobId, Phase>,
}

impl Baseline {
    pub fn archived_ids(&self) -> BTreeSet<JobId> {
        self.archived.keys().copied().collect()
    }
}

/// Registry handle. Clones share the same state.
#[derive(Clone, Default)]
pub struct JobRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh an observed job.
    ///
    /// Returns `true` when the observed phase changed (or the job is new).
    /// Archived jobs are ignored. Fails when the job is already tracked under
    /// the other role.
    pub async fn upsert(&self, job: Job) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.archived.contains_key(&job.job_id) {
            return Ok(false);
        }

        match state.jobs.get_mut(&job.job_id) {
            Some(tracked) => {
                if tracked.job.role != job.role {
                    return Err(EchonadeError::invalid_input(
                        format!("job {}", job.job_id),
                        format!(
                            "already tracked as {}, cannot be tracked as {}",
                            tracked.job.role, job.role
                        ),
                    ));
                }
                let changed = tracked.job.phase != job.phase;
                tracked.job = job;
                Ok(changed)
            }
            None => {
                state.jobs.insert(
                    job.job_id,
                    TrackedJob {
                        job,
                        processed: None,
                        pending: None,
                    },
                );
                Ok(true)
            }
        }
    }

    /// Look up an active (non-terminal) job held under `role`
    pub async fn find_active_by_role(&self, role: Role, job_id: JobId) -> Result<Job> {
        let state = self.state.read().await;
        state
            .jobs
            .get(&job_id)
            .filter(|t| t.job.role == role && !t.job.phase.is_terminal())
            .map(|t| t.job.clone())
            .ok_or_else(|| EchonadeError::JobNotFound {
                job_id,
                role: role.as_str().to_lowercase(),
            })
    }

    /// The job as last observed, whatever its role
    pub async fn get(&self, job_id: JobId) -> Option<Job> {
        self.state.read().await.jobs.get(&job_id).map(|t| t.job.clone())
    }

    /// Tracked jobs held under `role`, ascending by id
    pub async fn jobs_by_role(&self, role: Role) -> Vec<Job> {
        let state = self.state.read().await;
        state
            .jobs
            .values()
            .filter(|t| t.job.role == role)
            .map(|t| t.job.clone())
            .collect()
    }

    /// Tracked jobs currently in `phase`, ascending by id
    pub async fn jobs_in_phase(&self, phase: Phase) -> Vec<Job> {
        let state = self.state.read().await;
        state
            .jobs
            .values()
            .filter(|t| t.job.phase == phase)
            .map(|t| t.job.clone())
            .collect()
    }

    /// Record that a transition into `phase` was handed to the dispatcher
    pub async fn mark_pending(&self, job_id: JobId, phase: Phase) {
        let mut state = self.state.write().await;
        if let Some(tracked) = state.jobs.get_mut(&job_id) {
            tracked.pending = Some(phase);
        }
    }

    /// Record that the reaction to `phase` finished. Terminal phases archive
    /// the job; returns `true` in that case.
    pub async fn commit_processed(&self, job_id: JobId, phase: Phase) -> bool {
        let mut state = self.state.write().await;
        let Some(tracked) = state.jobs.get_mut(&job_id) else {
            return false;
        };

        let advances = match tracked.processed {
            None => true,
            Some(current) => current.can_advance_to(phase),
        };
        if advances {
            tracked.processed = Some(phase);
        }
        if tracked.pending == Some(phase) {
            tracked.pending = None;
        }

        if phase.is_terminal() {
            state.jobs.remove(&job_id);
            state.archived.insert(job_id, phase);
            return true;
        }
        false
    }

    /// Forget an in-flight mark after its reaction failed, so the next
    /// snapshot re-detects the transition
    pub async fn release_pending(&self, job_id: JobId, phase: Phase) {
        let mut state = self.state.write().await;
        if let Some(tracked) = state.jobs.get_mut(&job_id) {
            if tracked.pending == Some(phase) {
                tracked.pending = None;
            }
        }
    }

    /// Stop tracking a job that reached `phase`
    pub async fn archive(&self, job_id: JobId, phase: Phase) {
        let mut state = self.state.write().await;
        state.jobs.remove(&job_id);
        state.archived.insert(job_id, phase);
    }

    pub async fn is_archived(&self, job_id: JobId) -> bool {
        self.state.read().await.archived.contains_key(&job_id)
    }

    /// Last known phase of every tracked job, for the detector
    pub async fn baseline(&self) -> Baseline {
        let state = self.state.read().await;
        Baseline {
            jobs: state
                .jobs
                .iter()
                .map(|(id, t)| {
                    (
                        *id,
                        BaselineEntry {
                            role: t.job.role,
                            phase: t.last_known(),
                            job: t.job.clone(),
                        },
                    )
                })
                .collect(),
            archived: state.archived.clone(),
        }
    }

    /// Number of jobs with a reaction in flight
    pub async fn pending_count(&self) -> usize {
        let state = self.state.read().await;
        state.jobs.values().filter(|t| t.pending.is_some()).count()
    }

    pub async fn has_pending(&self) -> bool {
        self.pending_count().await > 0
    }

    /// Number of tracked (non-archived) jobs
    pub async fn len(&self) -> usize {
        self.state.read().await.jobs.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: u64, phase: Phase, role: Role) -> Job {
        Job {
            job_id: JobId::new(id),
            phase,
            role,
            counterparty: "Lemo".to_string(),
            price: 1.0,
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_upsert_reports_phase_changes() {
        let registry = JobRegistry::new();

        assert!(registry.upsert(job(1, Phase::Request, Role::Seller)).await.unwrap());
        assert!(!registry.upsert(job(1, Phase::Request, Role::Seller)).await.unwrap());
        assert!(registry.upsert(job(1, Phase::Negotiation, Role::Seller)).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_rejects_second_role() {
        let registry = JobRegistry::new();
        registry.upsert(job(1, Phase::Request, Role::Seller)).await.unwrap();

        let result = registry.upsert(job(1, Phase::Request, Role::Buyer)).await;
        assert!(result.is_err());
        assert_eq!(registry.jobs_by_role(Role::Buyer).await.len(), 0);
    }

    #[tokio::test]
    async fn test_find_active_by_role() {
        let registry = JobRegistry::new();
        registry.upsert(job(7, Phase::Transaction, Role::Seller)).await.unwrap();

        let found = registry.find_active_by_role(Role::Seller, JobId::new(7)).await.unwrap();
        assert_eq!(found.phase, Phase::Transaction);

        let wrong_role = registry.find_active_by_role(Role::Buyer, JobId::new(7)).await;
        assert!(matches!(wrong_role, Err(EchonadeError::JobNotFound { .. })));
    }

    #[tokio::test]
    async fn test_find_unknown_job_fails() {
        let registry = JobRegistry::new();
        let err = registry
            .find_active_by_role(Role::Seller, JobId::new(404))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "JOB_NOT_FOUND");
        assert_eq!(err.to_string(), "Job with id 404 not found in active seller jobs");
    }

    #[tokio::test]
    async fn test_pending_and_processed_marks() {
        let registry = JobRegistry::new();
        registry.upsert(job(3, Phase::Request, Role::Seller)).await.unwrap();
        registry.mark_pending(JobId::new(3), Phase::Request).await;

        let baseline = registry.baseline().await;
        assert_eq!(baseline.jobs[&JobId::new(3)].phase, Some(Phase::Request));
        assert!(registry.has_pending().await);

        registry.release_pending(JobId::new(3), Phase::Request).await;
        let baseline = registry.baseline().await;
        assert_eq!(baseline.jobs[&JobId::new(3)].phase, None);

        registry.mark_pending(JobId::new(3), Phase::Request).await;
        assert!(!registry.commit_processed(JobId::new(3), Phase::Request).await);
        assert!(!registry.has_pending().await);
        assert_eq!(
            registry.baseline().await.jobs[&JobId::new(3)].phase,
            Some(Phase::Request)
        );
    }

    #[tokio::test]
    async fn test_release_keeps_newer_pending() {
        let registry = JobRegistry::new();
        registry.upsert(job(3, Phase::Transaction, Role::Seller)).await.unwrap();
        registry.mark_pending(JobId::new(3), Phase::Request).await;
        registry.mark_pending(JobId::new(3), Phase::Transaction).await;

        registry.release_pending(JobId::new(3), Phase::Request).await;

        assert_eq!(
            registry.baseline().await.jobs[&JobId::new(3)].phase,
            Some(Phase::Transaction)
        );
    }

    #[tokio::test]
    async fn test_terminal_commit_archives() {
        let registry = JobRegistry::new();
        registry.upsert(job(9, Phase::Completed, Role::Buyer)).await.unwrap();
        registry.mark_pending(JobId::new(9), Phase::Completed).await;

        assert!(registry.commit_processed(JobId::new(9), Phase::Completed).await);
        assert!(registry.is_archived(JobId::new(9)).await);
        assert!(registry.is_empty().await);

        // Archived jobs are not resurrected by later observations
        assert!(!registry.upsert(job(9, Phase::Completed, Role::Buyer)).await.unwrap());
        assert!(registry.is_empty().await);
    }
}
