//! Bounded job pool
//!
//! A fixed set of worker tasks drains a bounded backlog. `submit` never
//! waits for space: when the backlog is full it fails at once with
//! [`PoolError::QueueFull`], which callers surface as "retry later".
//!
//! Capacity: `worker_count` jobs running plus `capacity` jobs queued. The
//! bound is an in-flight permit held from acceptance until the job body
//! finishes, so it does not depend on how quickly workers get
//! scheduled.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::types::{Job, JobSummary};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("job queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("job pool is shut down")]
    ShutDown,
}

struct QueuedJob {
    job: Arc<Job>,
    work: BoxFuture<'static, Result<String, String>>,
    permit: OwnedSemaphorePermit,
}

pub struct JobPool {
    sender: RwLock<Option<mpsc::Sender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// `worker_count + capacity` permits, one per job in flight
    in_flight: Arc<Semaphore>,
    /// Every accepted job, by id
    jobs: DashMap<Uuid, Arc<Job>>,
    worker_count: usize,
    capacity: usize,
}

impl JobPool {
    /// Starts `worker_count` workers over a backlog of `capacity` jobs.
    /// Must be called from within a Tokio runtime.
    pub fn new(worker_count: usize, capacity: usize) -> Self {
        let worker_count = worker_count.max(1);
        let capacity = capacity.max(1);

        let limit = worker_count + capacity;
        // Never full before the semaphore is: every queued job holds a permit.
        let (sender, receiver) = mpsc::channel::<QueuedJob>(limit);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let workers = (0..worker_count)
            .map(|worker_id| tokio::spawn(run_worker(worker_id, receiver.clone())))
            .collect();

        log::info!(
            "[JobPool] Started {} workers, backlog capacity {}",
            worker_count,
            capacity
        );

        Self {
            sender: RwLock::new(Some(sender)),
            workers: Mutex::new(workers),
            in_flight: Arc::new(Semaphore::new(limit)),
            jobs: DashMap::new(),
            worker_count,
            capacity,
        }
    }

    /// Schedules `work` and returns its handle, or fails immediately when the
    /// backlog is full. Rejected work is dropped without being polled.
    pub fn submit<F, E>(&self, work: F) -> Result<Arc<Job>, PoolError>
    where
        F: Future<Output = Result<String, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let sender = self.sender.read();
        let sender = sender.as_ref().ok_or(PoolError::ShutDown)?;

        let permit = self
            .in_flight
            .clone()
            .try_acquire_owned()
            .map_err(|_| PoolError::QueueFull {
                capacity: self.capacity,
            })?;

        let job = Arc::new(Job::new());
        let queued = QueuedJob {
            job: job.clone(),
            work: Box::pin(async move { work.await.map_err(|e| e.to_string()) }),
            permit,
        };

        match sender.try_send(queued) {
            Ok(()) => {
                self.jobs.insert(job.id(), job.clone());
                log::debug!("[JobPool] Accepted job {}", job.id());
                Ok(job)
            }
            Err(mpsc::error::TrySendError::Full(_)) => Err(PoolError::QueueFull {
                capacity: self.capacity,
            }),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PoolError::ShutDown),
        }
    }

    pub fn job(&self, id: &Uuid) -> Option<Arc<Job>> {
        self.jobs.get(id).map(|r| r.value().clone())
    }

    /// Most recently accepted jobs first
    pub fn list_recent(&self, limit: usize) -> Vec<JobSummary> {
        let mut jobs: Vec<Arc<Job>> = self.jobs.iter().map(|r| r.value().clone()).collect();
        jobs.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        jobs.truncate(limit);
        jobs.iter().map(|j| j.summary()).collect()
    }

    /// Releases terminal jobs older than `max_age`. Handles held by callers
    /// stay valid; only the registry entry goes away.
    pub fn cleanup_finished(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let before = self.jobs.len();
        self.jobs
            .retain(|_, job| !(job.status().is_terminal() && job.created_at() <= cutoff));
        let removed = before.saturating_sub(self.jobs.len());

        if removed > 0 {
            log::info!("[JobPool] Cleaned up {} finished jobs", removed);
        }
        removed
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stops accepting work, lets workers drain the backlog, then joins them.
    pub async fn shutdown(&self) {
        self.sender.write().take();

        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for result in futures_util::future::join_all(workers).await {
            if let Err(e) = result {
                log::error!("[JobPool] Worker exited abnormally: {}", e);
            }
        }
        log::info!("[JobPool] Shut down");
    }
}

async fn run_worker(worker_id: usize, receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>) {
    loop {
        // Lock is released as soon as a job is taken.
        let next = receiver.lock().await.recv().await;
        let Some(QueuedJob { job, work, permit }) = next else {
            break;
        };

        job.mark_running();
        log::debug!("[JobPool] Worker {} running job {}", worker_id, job.id());

        // Run the body in its own task so a panic fails the job, not the worker.
        let outcome = tokio::spawn(work).await;
        // Free the slot before publishing, so a caller woken by the terminal
        // status can submit again.
        drop(permit);
        match outcome {
            Ok(Ok(result)) => {
                job.mark_completed(result);
            }
            Ok(Err(error)) => {
                log::warn!("[JobPool] Job {} failed: {}", job.id(), error);
                job.mark_failed(error);
            }
            Err(e) => {
                log::error!("[JobPool] Job {} aborted: {}", job.id(), e);
                job.mark_failed(format!("job aborted: {}", e));
            }
        }
    }
    log::debug!("[JobPool] Worker {} stopped", worker_id);
}
