//! Periodic backlog scanner.
//!
//! Moves `queued` reports from the store onto the worker queue. The store
//! stays the source of truth: a job dropped here is picked up again on a
//! later tick, and a job enqueued twice loses its second claim.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::SecondsFormat;
use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::error::{StoreError, ThinkcalError, WorkerError};
use crate::model::ReportStatus;
use crate::pipeline::ReportPipeline;
use crate::store::ReportStore;
use crate::worker::job::Job;
use crate::worker::pool::{Enqueue, WorkerPool};
use crate::worker::WorkerSettings;

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Stale `processing` reports put back in the queue.
    pub requeued: usize,
    /// `queued` reports seen in the store.
    pub scanned: usize,
    /// Jobs accepted by the worker queue.
    pub enqueued: usize,
    /// True if the tick stopped early on a full queue.
    pub queue_full: bool,
}

pub struct BacklogScanner {
    reports: Arc<dyn ReportStore>,
    pipeline: Arc<ReportPipeline>,
    settings: WorkerSettings,
    pool: Mutex<Option<WorkerPool>>,
    pool_started: AtomicBool,
    shutdown: Arc<AtomicBool>,
}

impl BacklogScanner {
    pub fn new(pipeline: Arc<ReportPipeline>, settings: WorkerSettings) -> Self {
        Self {
            reports: Arc::clone(pipeline.reports()),
            pipeline,
            settings,
            pool: Mutex::new(None),
            pool_started: AtomicBool::new(false),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the worker pool on first call; later calls are no-ops.
    /// Returns true if this call started it.
    pub fn ensure_workers(&self) -> Result<bool, WorkerError> {
        if self
            .pool_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }

        match WorkerPool::new(
            Arc::clone(&self.pipeline),
            self.settings.worker_count,
            self.settings.queue_size,
        ) {
            Ok(pool) => {
                let mut slot = self.pool.lock().map_err(|_| WorkerError::ChannelClosed)?;
                *slot = Some(pool);
                Ok(true)
            }
            Err(e) => {
                self.pool_started.store(false, Ordering::Release);
                Err(e)
            }
        }
    }

    /// One scan: reap stale claims, then enqueue queued reports until the
    /// queue is full.
    pub fn tick(&self) -> Result<TickSummary, ThinkcalError> {
        let mut summary = TickSummary::default();
        if self.is_stopped() {
            return Ok(summary);
        }

        self.ensure_workers()?;

        if let Some(timeout) = self.settings.claim_timeout {
            match self.requeue_stale(timeout) {
                Ok(n) => summary.requeued = n,
                Err(e) => warn!("Stale claim sweep failed: {}", e),
            }
        }

        let queued = self
            .reports
            .list_by_status(ReportStatus::Queued, self.settings.scan_limit)?;
        summary.scanned = queued.len();

        let guard = self.pool.lock().map_err(|_| WorkerError::ChannelClosed)?;
        let pool = guard.as_ref().ok_or(WorkerError::ChannelClosed)?;

        for report in &queued {
            match pool.try_submit(Job::from(report))? {
                Enqueue::Accepted => summary.enqueued += 1,
                Enqueue::Full => {
                    info!(
                        "Job queue full, deferring {} reports to the next scan",
                        queued.len() - summary.enqueued
                    );
                    summary.queue_full = true;
                    break;
                }
            }
        }

        if summary.scanned > 0 || summary.requeued > 0 {
            debug!(
                "Scan: {} queued, {} enqueued, {} requeued",
                summary.scanned, summary.enqueued, summary.requeued
            );
        }
        Ok(summary)
    }

    fn requeue_stale(&self, timeout: Duration) -> Result<usize, StoreError> {
        let Some(cutoff) = cutoff_timestamp(timeout) else {
            return Ok(0);
        };
        let n = self.reports.requeue_stale_processing(&cutoff)?;
        if n > 0 {
            warn!(
                "Requeued {} reports stuck in processing for over {:?}",
                n, timeout
            );
        }
        Ok(n)
    }

    /// Runs `tick` every `scan_interval` on a background thread until
    /// [`stop`](Self::stop) is called. A message on `trigger_rx` forces an
    /// immediate scan.
    pub fn start(
        self: &Arc<Self>,
        mut trigger_rx: broadcast::Receiver<()>,
    ) -> Result<JoinHandle<()>, WorkerError> {
        self.ensure_workers()?;

        let scanner = Arc::clone(self);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.settings.scan_interval;

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        std::thread::Builder::new()
            .name("thinkcal-scanner".to_string())
            .spawn(move || {
                rt.block_on(async {
                    let mut interval_timer = tokio::time::interval(interval);

                    loop {
                        if shutdown.load(Ordering::Acquire) {
                            break;
                        }

                        tokio::select! {
                            _ = interval_timer.tick() => {},
                            Ok(()) = trigger_rx.recv() => {
                                debug!("Manual scan triggered");
                            },
                        }

                        if shutdown.load(Ordering::Acquire) {
                            break;
                        }

                        if let Err(e) = scanner.tick() {
                            error!("Backlog scan failed: {}", e);
                        }
                    }
                    info!("Backlog scanner stopped");
                });
            })
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))
    }

    /// Stops scanning and tells workers to exit. In-flight jobs finish on
    /// their own; queued ones are abandoned.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        if let Ok(guard) = self.pool.lock() {
            if let Some(pool) = guard.as_ref() {
                pool.shutdown();
            }
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Joins the worker threads after [`stop`](Self::stop).
    pub fn join_workers(&self) {
        let pool = match self.pool.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(pool) = pool {
            pool.wait();
        }
    }

    /// Runs `f` against the pool, if started.
    pub fn with_pool<T>(&self, f: impl FnOnce(&WorkerPool) -> T) -> Option<T> {
        let guard = self.pool.lock().ok()?;
        guard.as_ref().map(f)
    }
}

fn cutoff_timestamp(age: Duration) -> Option<String> {
    let age = chrono::Duration::from_std(age).ok()?;
    let cutoff = chrono::Utc::now().checked_sub_signed(age)?;
    Some(cutoff.to_rfc3339_opts(SecondsFormat::Micros, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cutoff_timestamp_is_in_the_past() {
        let cutoff = cutoff_timestamp(Duration::from_secs(60)).unwrap();
        assert!(cutoff < crate::db::now_timestamp());
    }

    #[test]
    fn test_cutoff_timestamp_overflow() {
        assert!(cutoff_timestamp(Duration::from_secs(u64::MAX)).is_none());
    }
}
