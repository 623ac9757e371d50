pub mod job;
pub mod pool;
pub mod scanner;

use std::time::Duration;

pub use job::Job;
pub use pool::{Enqueue, WorkerPool};
pub use scanner::BacklogScanner;

/// Sizing and timing of the background workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub worker_count: usize,
    pub queue_size: usize,
    /// Queued reports fetched per scan.
    pub scan_limit: usize,
    pub scan_interval: Duration,
    /// Requeue `processing` reports idle this long. `None` disables it.
    pub claim_timeout: Option<Duration>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            worker_count: 5,
            queue_size: 100,
            scan_limit: 20,
            scan_interval: Duration::from_secs(5),
            claim_timeout: None,
        }
    }
}
