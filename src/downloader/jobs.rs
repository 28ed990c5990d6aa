//! Job records and the synchronized job registry
//!
//! The registry is the lifecycle owner of every job: all mutation of the
//! shared table goes through its methods, never through an exposed map.
//! Per-job mutation (state, result path, error detail) is performed
//! exclusively by that job's worker; the progress stream and result
//! delivery only read.

use crate::types::{JobEvent, JobId, JobInfo, JobMetadata, JobState};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError, RwLock};
use tokio::sync::mpsc;

/// Mutable portion of a job, written only by its worker
#[derive(Debug)]
struct JobStatus {
    state: JobState,
    result_path: Option<PathBuf>,
    error_detail: Option<String>,
    finished_at: Option<DateTime<Utc>>,
}

/// One tracked asynchronous download/transcode request
///
/// Owns the per-job event queue: the worker appends (producer), the
/// progress stream drains (consumer). The queue is unbounded so the
/// engine's progress callback never blocks on a slow or absent consumer.
pub struct Job {
    id: JobId,
    metadata: JobMetadata,
    created_at: DateTime<Utc>,
    events_tx: mpsc::UnboundedSender<JobEvent>,
    events_rx: Mutex<mpsc::UnboundedReceiver<JobEvent>>,
    status: RwLock<JobStatus>,
    // Retained so a future version can add cancellation or timeouts
    // without changing the registry shape.
    worker: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Job {
    /// Create a job in `Running` state with an empty event queue
    pub(crate) fn new(metadata: JobMetadata) -> std::sync::Arc<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        std::sync::Arc::new(Self {
            id: JobId::new(),
            metadata,
            created_at: Utc::now(),
            events_tx,
            events_rx: Mutex::new(events_rx),
            status: RwLock::new(JobStatus {
                state: JobState::Running,
                result_path: None,
                error_detail: None,
                finished_at: None,
            }),
            worker: Mutex::new(None),
        })
    }

    /// The job's opaque identifier
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Request parameters captured at creation
    pub fn metadata(&self) -> &JobMetadata {
        &self.metadata
    }

    /// When the job was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current lifecycle state
    pub fn state(&self) -> JobState {
        self.read_status().state
    }

    /// Whether the job reached `Completed` or `Failed`
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }

    /// Result path, present only once the job completed
    pub fn result_path(&self) -> Option<PathBuf> {
        self.read_status().result_path.clone()
    }

    /// Failure message, present only once the job failed
    pub fn error_detail(&self) -> Option<String> {
        self.read_status().error_detail.clone()
    }

    /// When the job reached a terminal state
    pub(crate) fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.read_status().finished_at
    }

    /// Point-in-time snapshot for logging and lookups
    pub fn info(&self) -> JobInfo {
        let status = self.read_status();
        JobInfo {
            id: self.id,
            state: status.state,
            result_path: status.result_path.clone(),
            error_detail: status.error_detail.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
        }
    }

    /// Append an event to the job's queue without blocking
    ///
    /// Called from the worker (including inside the engine's progress
    /// callback). A send error means the receiver half was dropped with
    /// the job, which only happens after removal; the event is discarded.
    pub(crate) fn push_event(&self, event: JobEvent) {
        self.events_tx.send(event).ok();
    }

    /// Drain the next queued event without blocking
    ///
    /// Returns `None` both when the queue is empty and when another
    /// consumer currently holds the receiver: concurrent subscribers to
    /// the same job compete for events (known limitation of the single
    /// shared queue).
    pub(crate) fn try_next_event(&self) -> Option<JobEvent> {
        let mut rx = self.events_rx.try_lock().ok()?;
        rx.try_recv().ok()
    }

    /// Transition to `Completed`, recording the result path
    ///
    /// The terminal event is enqueued before the state flips so a stream
    /// consumer that observes the terminal state and drains once more is
    /// guaranteed to see it.
    pub(crate) fn complete(&self, path: PathBuf) {
        if self.is_terminal() {
            tracing::warn!(job_id = %self.id, "ignoring duplicate terminal transition");
            return;
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.push_event(JobEvent::Completed { filename });

        let mut status = self.write_status();
        status.state = JobState::Completed;
        status.result_path = Some(path);
        status.finished_at = Some(Utc::now());
    }

    /// Transition to `Failed`, recording a generic user-facing message
    pub(crate) fn fail(&self, message: &str) {
        if self.is_terminal() {
            tracing::warn!(job_id = %self.id, "ignoring duplicate terminal transition");
            return;
        }

        self.push_event(JobEvent::Error {
            message: message.to_string(),
        });

        let mut status = self.write_status();
        status.state = JobState::Failed;
        status.error_detail = Some(message.to_string());
        status.finished_at = Some(Utc::now());
    }

    /// Attach the spawned worker's handle
    pub(crate) fn attach_worker(&self, handle: tokio::task::JoinHandle<()>) {
        *self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    /// Whether the job's worker task has finished
    ///
    /// The handle is retained so a future version can add cancellation or
    /// timeouts; today it only answers liveness queries.
    pub fn worker_finished(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }

    fn read_status(&self) -> std::sync::RwLockReadGuard<'_, JobStatus> {
        self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_status(&self) -> std::sync::RwLockWriteGuard<'_, JobStatus> {
        self.status.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Synchronized in-memory job table
///
/// Tolerates concurrent creation, lookup, and removal from multiple
/// in-flight requests.
#[derive(Default)]
pub(crate) struct JobRegistry {
    jobs: RwLock<HashMap<JobId, std::sync::Arc<Job>>>,
}

impl JobRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created job
    pub(crate) fn insert(&self, job: std::sync::Arc<Job>) {
        self.write_table().insert(job.id(), job);
    }

    /// Look up a job by id
    pub(crate) fn get(&self, id: JobId) -> Option<std::sync::Arc<Job>> {
        self.read_table().get(&id).cloned()
    }

    /// Remove a job record; idempotent no-op when absent
    pub(crate) fn remove(&self, id: JobId) -> Option<std::sync::Arc<Job>> {
        self.write_table().remove(&id)
    }

    /// Number of tracked jobs
    pub(crate) fn len(&self) -> usize {
        self.read_table().len()
    }

    /// Ids of terminal jobs that finished before `cutoff`
    ///
    /// Running jobs are never candidates: no job is evicted mid-flight.
    pub(crate) fn terminal_jobs_finished_before(&self, cutoff: DateTime<Utc>) -> Vec<JobId> {
        self.read_table()
            .values()
            .filter(|job| {
                job.is_terminal() && job.finished_at().is_some_and(|at| at < cutoff)
            })
            .map(|job| job.id())
            .collect()
    }

    fn read_table(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<JobId, std::sync::Arc<Job>>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_table(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<JobId, std::sync::Arc<Job>>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}
