//! FIFO dispatch queue for outbound calls (one worker, rate limited).
//!
//! Every call to the external publishing service is wrapped as a job and
//! submitted here. A single worker task, spawned by
//! [`DispatchQueue::start`], pops jobs in submission order, takes a token
//! from the [`RateLimiter`], runs the job, and hands the result back to the
//! submitter through a oneshot channel. Because exactly one worker consumes
//! tokens, outbound call order always matches submission order.
//!
//! Once a job has been dispatched it runs to completion; a submitter that
//! stops waiting (see [`JobHandle::wait_timeout`]) does not cancel it.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::rate_limiter::RateLimiter;

type BoxedJob = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct QueuedJob {
    label: String,
    enqueued_at: Instant,
    run: BoxedJob,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The worker stopped before the job produced a result.
    #[error("Dispatch queue is closed; the job did not complete")]
    QueueClosed,

    /// The submitter stopped waiting. The job may still run.
    #[error("Timed out after {0:?} waiting for the dispatched call; outcome unknown")]
    TimedOut(Duration),
}

/// Handle to the process-wide dispatch queue. Cheap to clone.
#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::UnboundedSender<QueuedJob>,
    pending: Arc<AtomicUsize>,
}

/// Pending result of a submitted job.
pub struct JobHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> JobHandle<T> {
    /// Wait for the job's result.
    pub async fn wait(self) -> Result<T, DispatchError> {
        self.rx.await.map_err(|_| DispatchError::QueueClosed)
    }

    /// Wait at most `limit` for the job's result.
    pub async fn wait_timeout(self, limit: Duration) -> Result<T, DispatchError> {
        match tokio::time::timeout(limit, self.rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(DispatchError::QueueClosed),
            Err(_) => Err(DispatchError::TimedOut(limit)),
        }
    }
}

impl DispatchQueue {
    /// Spawn the worker and return the queue handle plus the worker's join
    /// handle. The worker exits when `cancel` fires or when every queue
    /// handle has been dropped and the backlog is drained.
    pub fn start(
        limiter: Arc<RateLimiter>,
        cancel: CancellationToken,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        let worker = tokio::spawn(run_worker(rx, limiter, Arc::clone(&pending), cancel));
        (Self { tx, pending }, worker)
    }

    /// Append a job to the queue. The job runs after every job submitted
    /// before it.
    pub fn submit<F, Fut, T>(&self, label: impl Into<String>, job: F) -> JobHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.submit_or_else(label, job, |_| {})
    }

    /// Like [`submit`](Self::submit), but `unclaimed` receives the job's
    /// output when the submitter has stopped waiting for it (timed out or
    /// dropped the handle).
    pub fn submit_or_else<F, Fut, T, U>(
        &self,
        label: impl Into<String>,
        job: F,
        unclaimed: U,
    ) -> JobHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        U: FnOnce(T) + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let run: BoxedJob = Box::new(move || {
            async move {
                let output = job().await;
                if let Err(output) = result_tx.send(output) {
                    unclaimed(output);
                }
            }
            .boxed()
        });

        self.pending.fetch_add(1, Ordering::SeqCst);
        let queued = QueuedJob {
            label: label.into(),
            enqueued_at: Instant::now(),
            run,
        };
        if self.tx.send(queued).is_err() {
            // Worker gone: the dropped sender resolves the handle as closed.
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        JobHandle { rx: result_rx }
    }

    /// Jobs submitted but not yet dispatched.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    limiter: Arc<RateLimiter>,
    pending: Arc<AtomicUsize>,
    cancel: CancellationToken,
) {
    tracing::info!(
        capacity = limiter.config().capacity,
        refill_per_sec = limiter.config().refill_per_sec,
        "Dispatch worker started",
    );

    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(job) => job,
                None => break,
            },
        };
        pending.fetch_sub(1, Ordering::SeqCst);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = limiter.acquire() => {}
        }

        tracing::debug!(
            job = %job.label,
            queued_ms = job.enqueued_at.elapsed().as_millis() as u64,
            "Dispatching outbound call",
        );

        if AssertUnwindSafe((job.run)()).catch_unwind().await.is_err() {
            tracing::error!(job = %job.label, "Dispatched job panicked");
        }
    }

    rx.close();
    tracing::info!("Dispatch worker stopped");
}
