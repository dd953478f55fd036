//! Bounded-concurrency job runner.
//!
//! Jobs are independent fallible futures, submitted in order and
//! executed with at most `workers` in flight at once. Execution order
//! is unspecified, but `results[i]` always belongs to the i-th
//! submitted job, which is how callers map failures back to keys.
//!
//! This is a semaphore-gated fan-out/fan-in, not a long-lived worker
//! queue: the job set is known up front and finite.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, PartialEq)]
pub enum RunnerError {
    #[error("no jobs to run")]
    NoJobs,
    #[error("run cancelled")]
    Cancelled,
    #[error("worker admission limiter closed")]
    LimiterClosed,
    #[error("a job panicked")]
    JobPanicked,
}

type JobFuture<E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'static>>;

pub struct WorkerPool<E> {
    jobs: Vec<JobFuture<E>>,
    workers: usize,
}

impl<E: Send + 'static> WorkerPool<E> {
    /// Creates a runner with the given concurrency ceiling.
    ///
    /// A ceiling of zero behaves as one.
    pub fn new(workers: usize) -> Self {
        Self {
            jobs: Vec::new(),
            workers: workers.max(1),
        }
    }

    /// Appends a job to the batch. Jobs run in no particular order but
    /// their results are reported in submission order.
    pub fn add_job<F>(&mut self, job: F) -> &mut Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.jobs.push(Box::pin(job));
        self
    }

    /// Runs the batch and returns one result slot per job, in
    /// submission order. The job queue is cleared afterwards, so the
    /// pool can be reused for a new batch.
    ///
    /// Cancellation while waiting to admit or collect a job aborts the
    /// whole run with `RunnerError::Cancelled`; jobs already in flight
    /// are left to finish on their own.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Option<E>>, RunnerError> {
        if self.jobs.is_empty() {
            return Err(RunnerError::NoJobs);
        }

        let jobs = std::mem::take(&mut self.jobs);
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(jobs.len());

        for job in jobs {
            let permit = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RunnerError::Cancelled),
                permit = Arc::clone(&semaphore).acquire_owned() => {
                    permit.map_err(|_| RunnerError::LimiterClosed)?
                }
            };

            handles.push(tokio::spawn(async move {
                let _permit = permit;
                job.await.err()
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(RunnerError::Cancelled),
                result = handle => result.map_err(|_| RunnerError::JobPanicked)?,
            };
            results.push(result);
        }

        Ok(results)
    }
}
