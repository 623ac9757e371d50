use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::ReportPipeline;
use crate::worker::job::Job;

/// How often an idle worker re-checks the shutdown flag.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of a non-blocking submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Accepted,
    /// Queue at capacity; the job was dropped.
    Full,
}

/// Fixed set of worker threads sharing one bounded job queue.
pub struct WorkerPool {
    job_sender: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    pub fn new(
        pipeline: Arc<ReportPipeline>,
        worker_count: usize,
        queue_size: usize,
    ) -> Result<Self, WorkerError> {
        if worker_count == 0 || queue_size == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count and queue_size must be > 0".to_string(),
            ));
        }

        let (job_sender, job_receiver) = bounded::<Job>(queue_size);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let jobs = job_receiver.clone();
            let stop = Arc::clone(&shutdown);
            let pipeline = Arc::clone(&pipeline);

            let spawned = thread::Builder::new()
                .name(format!("thinkcal-worker-{}", worker_id))
                .spawn(move || {
                    run_worker(worker_id, jobs, stop, pipeline);
                });

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    shutdown.store(true, Ordering::Release);
                    return Err(WorkerError::SpawnFailed(e.to_string()));
                }
            }
        }

        info!("Started {} workers (queue size {})", worker_count, queue_size);

        Ok(Self {
            job_sender,
            workers,
            shutdown,
        })
    }

    /// Enqueues without blocking.
    pub fn try_submit(&self, job: Job) -> Result<Enqueue, WorkerError> {
        if self.is_shutdown() {
            return Err(WorkerError::ChannelClosed);
        }
        match self.job_sender.try_send(job) {
            Ok(()) => Ok(Enqueue::Accepted),
            Err(TrySendError::Full(_)) => Ok(Enqueue::Full),
            Err(TrySendError::Disconnected(_)) => Err(WorkerError::ChannelClosed),
        }
    }

    /// Enqueues, waiting for capacity.
    pub fn submit(&self, job: Job) -> Result<(), WorkerError> {
        if self.is_shutdown() {
            return Err(WorkerError::ChannelClosed);
        }
        self.job_sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn queued_jobs(&self) -> usize {
        self.job_sender.len()
    }

    pub fn shutdown(&self) {
        info!("Stopping report workers");
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Signals shutdown and joins every worker. Queued jobs are abandoned.
    pub fn wait(self) {
        self.shutdown.store(true, Ordering::Release);
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} thread panicked: {:?}", i, e);
            } else {
                debug!("Worker {} joined", i);
            }
        }

        info!("Report workers stopped");
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<Job>,
    shutdown: Arc<AtomicBool>,
    pipeline: Arc<ReportPipeline>,
) {
    debug!("Worker {} waiting for jobs", worker_id);

    loop {
        if shutdown.load(Ordering::Acquire) {
            debug!("Worker {} exiting on shutdown", worker_id);
            break;
        }

        match job_receiver.recv_timeout(POLL_INTERVAL) {
            Ok(job) => {
                debug!(
                    "Worker {} processing report {} (gen_version {})",
                    worker_id, job.report_id, job.gen_version
                );

                let run = panic::catch_unwind(AssertUnwindSafe(|| {
                    pipeline.run(&job.report_id, job.gen_version)
                }));
                match run {
                    Ok(Ok(outcome)) => info!(
                        "Worker {} report {} (gen_version {}): {}",
                        worker_id,
                        job.report_id,
                        job.gen_version,
                        outcome.as_str()
                    ),
                    Ok(Err(e)) => error!(
                        "Worker {} report {} (gen_version {}) failed: {}",
                        worker_id, job.report_id, job.gen_version, e
                    ),
                    Err(_) => error!(
                        "Worker {} panicked on report {} (gen_version {})",
                        worker_id, job.report_id, job.gen_version
                    ),
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Worker {} exiting, job queue closed", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} exited", worker_id);
}
