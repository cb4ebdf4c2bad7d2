//! Job data types

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

pub use custody_types::{JobStatus, JobSummary};

/// Mutable part of a job, published through a watch channel so readers can
/// await completion without polling.
#[derive(Debug, Clone, Serialize)]
pub struct JobState {
    pub status: JobStatus,
    /// Set only on success
    pub result: Option<String>,
    /// Set only on failure
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// A unit of asynchronous work accepted by the pool.
///
/// Only the worker running the job mutates it. Status transitions are
/// monotonic and `result`/`error` are written once, together with the
/// terminal status.
#[derive(Debug)]
pub struct Job {
    id: Uuid,
    created_at: DateTime<Utc>,
    state: watch::Sender<JobState>,
}

impl Job {
    pub(crate) fn new() -> Self {
        let now = Utc::now();
        let (state, _) = watch::channel(JobState {
            status: JobStatus::Accepted,
            result: None,
            error: None,
            updated_at: now,
        });
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            state,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn status(&self) -> JobStatus {
        self.state.borrow().status
    }

    /// Result string, readable only once the job has completed.
    pub fn result(&self) -> Option<String> {
        let state = self.state.borrow();
        match state.status {
            JobStatus::Completed => state.result.clone(),
            _ => None,
        }
    }

    /// Error message, readable only once the job has failed.
    pub fn error(&self) -> Option<String> {
        let state = self.state.borrow();
        match state.status {
            JobStatus::Failed => state.error.clone(),
            _ => None,
        }
    }

    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    pub fn summary(&self) -> JobSummary {
        let state = self.state.borrow();
        JobSummary {
            job_id: self.id.to_string(),
            status: state.status,
            result: state.result.clone(),
            error: state.error.clone(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: state.updated_at.to_rfc3339(),
        }
    }

    /// Waits until the job reaches a terminal status and returns that state.
    pub async fn wait(&self) -> JobState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|s| s.status.is_terminal()).await {
            Ok(state) => state.clone(),
            // The sender lives as long as `self`, so this is unreachable in practice.
            Err(_) => self.state(),
        }
    }

    pub(crate) fn mark_running(&self) -> bool {
        self.transition(JobStatus::Running, None, None)
    }

    pub(crate) fn mark_completed(&self, result: String) -> bool {
        self.transition(JobStatus::Completed, Some(result), None)
    }

    pub(crate) fn mark_failed(&self, error: String) -> bool {
        self.transition(JobStatus::Failed, None, Some(error))
    }

    fn transition(&self, to: JobStatus, result: Option<String>, error: Option<String>) -> bool {
        let id = self.id;
        self.state.send_if_modified(|state| {
            let allowed = matches!(
                (state.status, to),
                (JobStatus::Accepted, JobStatus::Running)
                    | (JobStatus::Accepted, JobStatus::Failed)
                    | (JobStatus::Running, JobStatus::Completed)
                    | (JobStatus::Running, JobStatus::Failed)
            );
            if !allowed {
                log::warn!(
                    "[JobPool] Ignoring transition of job {} from {} to {}",
                    id,
                    state.status,
                    to
                );
                return false;
            }
            state.status = to;
            state.result = result;
            state.error = error;
            state.updated_at = Utc::now();
            true
        })
    }
}
