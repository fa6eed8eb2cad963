//! Bounded task queue served by a fixed pool of tokio workers.
//!
//! Producers call [`TaskQueue::enqueue`], which never waits: a full buffer is
//! reported as [`QueueError::Full`]. Workers race for buffered tasks and hand
//! each one to the [`TaskHandler`]. A failed task is re-enqueued after a
//! linear backoff (1×, 2×, 3× the backoff unit) until its retry ceiling is
//! reached. A handler that panics counts as a failed attempt and the worker
//! keeps serving. Backoff timers are owned by the queue, so [`TaskQueue::stop`]
//! aborts pending retries instead of letting them fire into a stopped queue.
//!
//! Shutdown is two-phase: intake closes, then `stop` waits for every task a
//! worker has already dequeued. Tasks still sitting in the buffer are
//! abandoned and counted in [`QueueMetrics::abandoned`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use gradetrend_core::config::QueueConfig;

use crate::error::{ProcessError, QueueError};
use crate::handler::TaskHandler;
use crate::metrics::{QueueMetrics, QueueMetricsSnapshot};
use crate::task::Task;

/// Construction-time parameters of a [`TaskQueue`].
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub capacity: usize,
    pub workers: usize,
    pub default_max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

impl From<&QueueConfig> for QueueSettings {
    fn from(config: &QueueConfig) -> Self {
        Self {
            capacity: config.capacity,
            workers: config.workers,
            default_max_retries: config.max_retries,
            retry_backoff: config.retry_backoff(),
        }
    }
}

/// Externally visible lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    NotStarted,
    Running,
    ShuttingDown,
    Stopped,
}

enum Lifecycle {
    NotStarted,
    Running {
        intake: mpsc::Sender<Task>,
        workers: Vec<JoinHandle<()>>,
    },
    ShuttingDown,
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> QueueState {
        match self {
            Lifecycle::NotStarted => QueueState::NotStarted,
            Lifecycle::Running { .. } => QueueState::Running,
            Lifecycle::ShuttingDown => QueueState::ShuttingDown,
            Lifecycle::Stopped => QueueState::Stopped,
        }
    }
}

struct Inner {
    settings: QueueSettings,
    handler: Arc<dyn TaskHandler>,
    lifecycle: Mutex<Lifecycle>,
    /// Buffered, not yet dequeued tasks. Advisory.
    depth: AtomicUsize,
    /// Accepted tasks not yet settled: buffered, running or waiting to retry.
    outstanding: AtomicUsize,
    shutdown: watch::Sender<bool>,
    pending_retries: Mutex<Vec<JoinHandle<()>>>,
    metrics: QueueMetrics,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Task queue owning its buffer, workers and retry timers.
///
/// Terminal after [`stop`](Self::stop): a stopped queue cannot be restarted.
pub struct TaskQueue {
    inner: Arc<Inner>,
}

impl TaskQueue {
    pub fn new(settings: QueueSettings, handler: Arc<dyn TaskHandler>) -> Self {
        let settings = QueueSettings {
            capacity: settings.capacity.max(1),
            workers: settings.workers.max(1),
            ..settings
        };
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                settings,
                handler,
                lifecycle: Mutex::new(Lifecycle::NotStarted),
                depth: AtomicUsize::new(0),
                outstanding: AtomicUsize::new(0),
                shutdown,
                pending_retries: Mutex::new(Vec::new()),
                metrics: QueueMetrics::default(),
            }),
        }
    }

    /// Spawn the worker pool. No-op unless the queue has never been started.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut lifecycle = lock(&self.inner.lifecycle);
        if !matches!(*lifecycle, Lifecycle::NotStarted) {
            debug!(state = ?lifecycle.state(), "Task queue start ignored");
            return;
        }

        let (intake, rx) = mpsc::channel(self.inner.settings.capacity);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let workers = (0..self.inner.settings.workers)
            .map(|worker_id| {
                let inner = Arc::clone(&self.inner);
                let rx = Arc::clone(&rx);
                let shutdown = self.inner.shutdown.subscribe();
                tokio::spawn(run_worker(worker_id, inner, rx, shutdown))
            })
            .collect();

        *lifecycle = Lifecycle::Running { intake, workers };
        info!(
            workers = self.inner.settings.workers,
            capacity = self.inner.settings.capacity,
            "Task queue started"
        );
    }

    /// Close intake, wait for in-flight tasks, cancel pending retries.
    ///
    /// Only the call that performs the `Running -> Stopped` transition waits;
    /// every other call returns immediately.
    pub async fn stop(&self) {
        let workers = {
            let mut lifecycle = lock(&self.inner.lifecycle);
            match std::mem::replace(&mut *lifecycle, Lifecycle::ShuttingDown) {
                Lifecycle::Running { intake, workers } => {
                    // Closes intake.
                    drop(intake);
                    workers
                }
                other => {
                    debug!(state = ?other.state(), "Task queue stop ignored");
                    *lifecycle = other;
                    return;
                }
            }
        };

        info!("Task queue stopping");
        self.inner.shutdown.send_replace(true);

        for handle in workers {
            if let Err(e) = handle.await {
                warn!("Task queue worker ended abnormally: {}", e);
            }
        }

        let retries = std::mem::take(&mut *lock(&self.inner.pending_retries));
        let cancelled = cancel_retries(retries).await;
        if cancelled > 0 {
            warn!(cancelled, "Pending task retries cancelled by shutdown");
            self.inner
                .metrics
                .retries_cancelled
                .fetch_add(cancelled, Ordering::Relaxed);
        }

        let abandoned = self.inner.depth.swap(0, Ordering::Relaxed) as u64;
        if abandoned > 0 {
            warn!(abandoned, "Buffered tasks abandoned at shutdown");
            self.inner.metrics.abandoned.fetch_add(abandoned, Ordering::Relaxed);
        }
        self.inner.outstanding.store(0, Ordering::SeqCst);

        *lock(&self.inner.lifecycle) = Lifecycle::Stopped;
        info!("Task queue stopped");
    }

    /// Submit a task without waiting for buffer space.
    pub fn enqueue(&self, task: Task) -> Result<(), QueueError> {
        self.inner.enqueue(task, false)
    }

    /// Number of buffered tasks not yet taken by a worker. Advisory only.
    pub fn len(&self) -> usize {
        self.inner.depth.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Accepted tasks that have neither completed nor been dropped yet.
    ///
    /// Zero means nothing is buffered, running or waiting for a retry.
    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> QueueState {
        lock(&self.inner.lifecycle).state()
    }

    pub fn metrics(&self) -> QueueMetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        // Let workers exit if the owner never called stop().
        self.inner.shutdown.send_replace(true);
    }
}

impl Inner {
    /// `retry` re-submissions are already counted as outstanding.
    fn enqueue(&self, mut task: Task, retry: bool) -> Result<(), QueueError> {
        let lifecycle = lock(&self.lifecycle);
        let intake = match &*lifecycle {
            Lifecycle::Running { intake, .. } => intake,
            Lifecycle::ShuttingDown => return Err(QueueError::ShuttingDown),
            Lifecycle::NotStarted | Lifecycle::Stopped => return Err(QueueError::NotRunning),
        };

        task.created_at.get_or_insert_with(Utc::now);
        task.max_retries.get_or_insert(self.settings.default_max_retries);

        // Count before sending so a fast worker never decrements first.
        self.depth.fetch_add(1, Ordering::Relaxed);
        if !retry {
            self.outstanding.fetch_add(1, Ordering::SeqCst);
        }
        match intake.try_send(task) {
            Ok(()) => {
                QueueMetrics::incr(&self.metrics.enqueued);
                Ok(())
            }
            Err(TrySendError::Full(task)) => {
                self.depth.fetch_sub(1, Ordering::Relaxed);
                if !retry {
                    self.outstanding.fetch_sub(1, Ordering::SeqCst);
                }
                QueueMetrics::incr(&self.metrics.rejected);
                debug!(task_id = %task.id, "Task rejected, queue full");
                Err(QueueError::Full {
                    capacity: self.settings.capacity,
                })
            }
            Err(TrySendError::Closed(_)) => {
                self.depth.fetch_sub(1, Ordering::Relaxed);
                if !retry {
                    self.outstanding.fetch_sub(1, Ordering::SeqCst);
                }
                Err(QueueError::ShuttingDown)
            }
        }
    }

    async fn execute(self: &Arc<Self>, worker_id: usize, task: Task) {
        debug!(worker_id, task_id = %task.id, kind = %task.kind(), attempt = task.retry_count + 1, "Processing task");
        let outcome = AssertUnwindSafe(self.handler.process(&task))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ProcessError::Failed(panic_message(panic.as_ref()))));
        match outcome {
            Ok(()) => {
                QueueMetrics::incr(&self.metrics.processed);
                self.outstanding.fetch_sub(1, Ordering::SeqCst);
                debug!(worker_id, task_id = %task.id, "Task completed");
            }
            Err(e) => {
                QueueMetrics::incr(&self.metrics.failed_attempts);
                self.schedule_retry(task, e.to_string());
            }
        }
    }

    /// Re-enqueue a failed task after `retry_count × backoff`, off the worker.
    fn schedule_retry(self: &Arc<Self>, mut task: Task, reason: String) {
        let max_retries = task.max_retries.unwrap_or(self.settings.default_max_retries);
        if task.retry_count >= max_retries {
            error!(
                task_id = %task.id,
                kind = %task.kind(),
                attempts = task.retry_count + 1,
                "Task permanently failed: {}", reason
            );
            QueueMetrics::incr(&self.metrics.dropped);
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            return;
        }

        task.retry_count += 1;
        let delay = retry_delay(self.settings.retry_backoff, task.retry_count);
        warn!(
            task_id = %task.id,
            retry = task.retry_count,
            max_retries,
            delay_ms = delay.as_millis() as u64,
            "Task failed, retry scheduled: {}", reason
        );

        // Weak so a pending timer never keeps a dropped queue alive.
        let weak: Weak<Inner> = Arc::downgrade(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let task_id = task.id.clone();
            if let Err(e) = inner.enqueue(task, true) {
                warn!(task_id = %task_id, "Retry could not be enqueued, task dropped: {}", e);
                QueueMetrics::incr(&inner.metrics.dropped);
                inner.outstanding.fetch_sub(1, Ordering::SeqCst);
            }
        });

        let mut pending = lock(&self.pending_retries);
        pending.retain(|handle| !handle.is_finished());
        pending.push(timer);
        QueueMetrics::incr(&self.metrics.retried);
    }
}

/// Linear backoff: the nth retry waits `n × backoff`, saturating at `Duration::MAX`.
fn retry_delay(backoff: Duration, retry: u32) -> Duration {
    backoff.checked_mul(retry).unwrap_or(Duration::MAX)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload");
    format!("handler panicked: {detail}")
}

/// Abort retry timers and count the ones the abort actually stopped.
///
/// A timer already past its sleep finishes its re-enqueue and is not counted.
async fn cancel_retries(handles: Vec<JoinHandle<()>>) -> u64 {
    for handle in &handles {
        handle.abort();
    }
    let mut cancelled = 0;
    for handle in handles {
        if let Err(e) = handle.await {
            if e.is_cancelled() {
                cancelled += 1;
            }
        }
    }
    cancelled
}

async fn run_worker(
    worker_id: usize,
    inner: Arc<Inner>,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<Task>>>,
    mut shutdown: watch::Receiver<bool>,
) {
    debug!(worker_id, "Task queue worker started");
    loop {
        if *shutdown.borrow() {
            break;
        }

        let next = tokio::select! {
            // Shutdown wins over buffered work.
            biased;
            _ = shutdown.changed() => break,
            task = async { rx.lock().await.recv().await } => task,
        };

        let Some(task) = next else {
            break;
        };
        inner.depth.fetch_sub(1, Ordering::Relaxed);
        inner.execute(worker_id, task).await;
    }
    debug!(worker_id, "Task queue worker exited");
}
