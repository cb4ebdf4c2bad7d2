//! Job Pool Subsystem
//!
//! Runs long-latency ledger work off the request path.
//!
//! ## Flow
//! 1. A caller submits a future to [`JobPool::submit`] and gets a [`Job`] handle
//!    back at once, or [`PoolError::QueueFull`] when the backlog is full
//! 2. A worker picks the job up, marks it running and drives it to completion
//! 3. The outcome is recorded on the handle; [`Job::wait`] resolves without polling

mod pool;
mod types;

pub use pool::{JobPool, PoolError};
pub use types::{Job, JobState, JobStatus, JobSummary};
