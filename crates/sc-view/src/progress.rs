//! Batch job progress reconciliation.
//!
//! Merges the optimistic "job started" state created from a batch dispatch
//! response with asynchronous push events. Per job:
//!
//! ```text
//! Idle -> Dispatched -> Running -> Terminal -> (dismiss) Idle
//!            \_____________________^
//! ```
//!
//! Progress events are accepted only when their ordering key (the sequence
//! number, or `current` when the backend sends none) advances. A terminal
//! event is always authoritative, whatever arrived before it. Gaps never
//! block reaching `Terminal`.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

use sc_core::events::JobEvent;
use sc_core::JobId;

/// Lifecycle phase of one batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPhase {
    /// Not tracked (never dispatched, or dismissed).
    Idle,
    /// Accepted by the backend; no push event seen yet.
    Dispatched,
    Running,
    Terminal,
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Dispatched => write!(f, "dispatched"),
            Self::Running => write!(f, "running"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}

/// Displayed progress of one batch job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub job_id: JobId,
    pub phase: JobPhase,
    pub total: u64,
    pub current: u64,
    pub completed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub running: bool,
    /// Ordering key of the last accepted progress event.
    pub last_sequence: Option<u64>,
    #[serde(skip)]
    pub finished_at: Option<Instant>,
}

impl BatchProgress {
    fn new(job_id: JobId, phase: JobPhase, total: u64) -> Self {
        Self {
            job_id,
            phase,
            total,
            current: 0,
            completed: 0,
            failed: 0,
            skipped: 0,
            running: phase != JobPhase::Terminal,
            last_sequence: None,
            finished_at: None,
        }
    }

    /// Completion ratio in `[0.0, 1.0]`; 0 when the total is unknown.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return if self.phase == JobPhase::Terminal { 1.0 } else { 0.0 };
        }
        (self.current as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

/// What [`ProgressReconciler::apply`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Counters updated; the job is running.
    Progressed,
    /// Out-of-order or duplicate progress event; nothing changed.
    Stale,
    /// Event for a job that already finished or was dismissed; nothing changed.
    AfterTerminal,
    /// The job reached `Terminal`.
    Finished,
}

/// Dismissed job ids remembered so late events cannot revive them.
const RETIRED_CAPACITY: usize = 256;

/// Tracks every batch job currently shown to the user.
#[derive(Debug, Clone, Default)]
pub struct ProgressReconciler {
    jobs: HashMap<JobId, BatchProgress>,
    /// Most recently dismissed jobs, oldest first.
    retired: VecDeque<JobId>,
}

impl ProgressReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful dispatch response with the expected item count.
    ///
    /// When push events for the job arrived before the response, the job
    /// is already further along and is not moved back to `Dispatched`.
    pub fn dispatch(&mut self, job_id: JobId, total_items: u64) -> &BatchProgress {
        self.retired.retain(|id| *id != job_id);
        let progress = self.jobs.entry(job_id).or_insert_with(|| {
            tracing::info!(job_id = %job_id, total = total_items, "batch dispatched");
            BatchProgress::new(job_id, JobPhase::Dispatched, total_items)
        });
        if progress.total == 0 {
            progress.total = total_items;
        }
        progress
    }

    /// Fold one push event into its job's state.
    ///
    /// Events are attributed strictly by job id. Events for a job that was
    /// never dispatched here (e.g. started by another client) start
    /// tracking it. Events for a dismissed job are ignored, since the push
    /// channel may still deliver them late.
    pub fn apply(&mut self, event: &JobEvent) -> ApplyOutcome {
        self.apply_at(event, Instant::now())
    }

    pub fn apply_at(&mut self, event: &JobEvent, now: Instant) -> ApplyOutcome {
        let job_id = event.job_id();
        if self.retired.contains(&job_id) {
            tracing::debug!(job_id = %job_id, "ignoring event for a dismissed job");
            return ApplyOutcome::AfterTerminal;
        }

        match *event {
            JobEvent::Progress {
                job_id,
                sequence,
                current,
                total,
                completed,
                failed,
            } => {
                let progress = self
                    .jobs
                    .entry(job_id)
                    .or_insert_with(|| BatchProgress::new(job_id, JobPhase::Running, total));

                if progress.phase == JobPhase::Terminal {
                    tracing::debug!(job_id = %job_id, "ignoring progress after terminal event");
                    return ApplyOutcome::AfterTerminal;
                }

                let key = sequence.unwrap_or(current);
                if progress.last_sequence.is_some_and(|last| key <= last) {
                    tracing::debug!(job_id = %job_id, key, "ignoring stale progress event");
                    return ApplyOutcome::Stale;
                }

                progress.phase = JobPhase::Running;
                progress.running = true;
                progress.last_sequence = Some(key);
                progress.current = current;
                progress.completed = completed;
                progress.failed = failed;
                if total > 0 {
                    progress.total = total;
                }
                ApplyOutcome::Progressed
            }
            JobEvent::Finished {
                job_id,
                succeeded,
                failed,
                skipped,
            } => {
                let progress = self
                    .jobs
                    .entry(job_id)
                    .or_insert_with(|| BatchProgress::new(job_id, JobPhase::Terminal, 0));

                let processed = succeeded.saturating_add(failed).saturating_add(skipped);
                progress.phase = JobPhase::Terminal;
                progress.running = false;
                progress.completed = succeeded;
                progress.failed = failed;
                progress.skipped = skipped;
                progress.current = processed;
                progress.total = progress.total.max(processed);
                progress.finished_at = Some(now);

                tracing::info!(
                    job_id = %job_id,
                    succeeded,
                    failed,
                    skipped,
                    "batch finished"
                );
                ApplyOutcome::Finished
            }
        }
    }

    /// Stop showing a job. This does not cancel backend work, and later
    /// events for the job are ignored.
    pub fn dismiss(&mut self, job_id: JobId) -> bool {
        let removed = self.jobs.remove(&job_id).is_some();
        if removed {
            self.retire(job_id);
        }
        removed
    }

    fn retire(&mut self, job_id: JobId) {
        if self.retired.len() == RETIRED_CAPACITY {
            self.retired.pop_front();
        }
        self.retired.push_back(job_id);
    }

    /// Dismiss terminal jobs that finished at least `after` ago.
    /// A zero duration disables auto-dismissal.
    pub fn dismiss_expired(&mut self, now: Instant, after: Duration) -> Vec<JobId> {
        if after.is_zero() {
            return Vec::new();
        }
        let expired: Vec<JobId> = self
            .jobs
            .values()
            .filter(|p| {
                p.finished_at
                    .is_some_and(|t| now.saturating_duration_since(t) >= after)
            })
            .map(|p| p.job_id)
            .collect();
        for id in &expired {
            self.jobs.remove(id);
            self.retire(*id);
        }
        expired
    }

    pub fn get(&self, job_id: JobId) -> Option<&BatchProgress> {
        self.jobs.get(&job_id)
    }

    pub fn phase(&self, job_id: JobId) -> JobPhase {
        self.jobs.get(&job_id).map_or(JobPhase::Idle, |p| p.phase)
    }

    pub fn any_running(&self) -> bool {
        self.jobs.values().any(|p| p.running)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &BatchProgress> {
        self.jobs.values()
    }
}
