//! Phase transition detection
//!
//! Pure diff of a marketplace snapshot against the registry baseline. The
//! detector never touches the registry itself; the kernel applies the
//! observed jobs and hands the events to the dispatcher.
//!
//! Rules, per job id:
//! - new job, or tracked job never dispatched: event from `None`
//! - phase moved forward (possibly several steps): one event old -> new
//! - phase unchanged: no event
//! - phase moved backwards: `PhaseRegression`, the job keeps its last phase
//! - tracked but absent: terminal event (COMPLETED after EVALUATION,
//!   REJECTED otherwise)
//! - archived and reported terminal again: ignored
//!
//! Events are emitted in ascending job id.

use std::collections::{BTreeMap, BTreeSet};

use echonade_types::{
    DetectorError, DetectorFault, Job, JobId, MarketSnapshot, Role, TransitionEvent,
};

use crate::registry::Baseline;

/// Result of diffing one snapshot
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Jobs to write back into the registry, ascending by id
    pub observed: Vec<Job>,
    /// Transitions to dispatch, ascending by id
    pub events: Vec<TransitionEvent>,
    /// Per-job failures; other jobs are unaffected
    pub errors: Vec<DetectorError>,
}

impl Detection {
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty() && self.errors.is_empty()
    }
}

/// Diff `snapshot` against `baseline`
pub fn detect_transitions(baseline: &Baseline, snapshot: &MarketSnapshot) -> Detection {
    let mut errors = Vec::new();
    // Ids present in the snapshot in any form, so they are never treated as
    // vanished even when their entry was rejected.
    let mut seen: BTreeSet<JobId> = BTreeSet::new();

    let as_seller = parse_role(Role::Seller, &snapshot.active_jobs_as_seller, &mut seen, &mut errors);
    let mut as_buyer = parse_role(Role::Buyer, &snapshot.active_jobs_as_buyer, &mut seen, &mut errors);

    let mut reported: BTreeMap<JobId, Job> = BTreeMap::new();
    for (job_id, job) in as_seller {
        if as_buyer.remove(&job_id).is_some() {
            errors.push(DetectorError {
                job_id: Some(job_id),
                fault: DetectorFault::RoleConflict,
            });
            continue;
        }
        reported.insert(job_id, job);
    }
    reported.extend(as_buyer);

    let mut observed: BTreeMap<JobId, Job> = BTreeMap::new();
    let mut events: BTreeMap<JobId, TransitionEvent> = BTreeMap::new();

    for (job_id, job) in reported {
        if let Some(archived_phase) = baseline.archived.get(&job_id) {
            if !job.phase.is_terminal() && job.phase != *archived_phase {
                errors.push(DetectorError {
                    job_id: Some(job_id),
                    fault: DetectorFault::PhaseRegression {
                        from: *archived_phase,
                        to: job.phase,
                    },
                });
            }
            continue;
        }

        let Some(entry) = baseline.jobs.get(&job_id) else {
            events.insert(job_id, TransitionEvent::new(None, job.clone()));
            observed.insert(job_id, job);
            continue;
        };

        if entry.role != job.role {
            errors.push(DetectorError {
                job_id: Some(job_id),
                fault: DetectorFault::RoleConflict,
            });
            continue;
        }

        match entry.phase {
            None => {
                events.insert(job_id, TransitionEvent::new(None, job.clone()));
                observed.insert(job_id, job);
            }
            Some(last) if last == job.phase => {
                observed.insert(job_id, job);
            }
            Some(last) if last.can_advance_to(job.phase) => {
                events.insert(job_id, TransitionEvent::new(Some(last), job.clone()));
                observed.insert(job_id, job);
            }
            Some(last) => {
                errors.push(DetectorError {
                    job_id: Some(job_id),
                    fault: DetectorFault::PhaseRegression {
                        from: last,
                        to: job.phase,
                    },
                });
            }
        }
    }

    for (job_id, entry) in &baseline.jobs {
        if seen.contains(job_id) {
            continue;
        }
        let last = entry.phase.unwrap_or(entry.job.phase);
        if let Some(terminal) = last.inferred_terminal() {
            let job = entry.job.with_phase(terminal);
            events.insert(*job_id, TransitionEvent::new(Some(last), job.clone()));
            observed.insert(*job_id, job);
        }
    }

    Detection {
        observed: observed.into_values().collect(),
        events: events.into_values().collect(),
        errors,
    }
}

fn parse_role(
    role: Role,
    entries: &[serde_json::Value],
    seen: &mut BTreeSet<JobId>,
    errors: &mut Vec<DetectorError>,
) -> BTreeMap<JobId, Job> {
    let mut jobs = BTreeMap::new();
    for entry in entries {
        match Job::from_entry(role, entry) {
            Ok(job) => {
                seen.insert(job.job_id);
                if jobs.contains_key(&job.job_id) {
                    errors.push(DetectorError {
                        job_id: Some(job.job_id),
                        fault: DetectorFault::DuplicateEntry,
                    });
                    continue;
                }
                jobs.insert(job.job_id, job);
            }
            Err(malformed) => {
                if let Some(job_id) = malformed.job_id {
                    seen.insert(job_id);
                }
                errors.push(DetectorError {
                    job_id: malformed.job_id,
                    fault: DetectorFault::Malformed {
                        reason: malformed.reason,
                    },
                });
            }
        }
    }
    jobs
}
