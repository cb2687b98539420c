//! Worker queue that runs async tasks in the background.
//!
//! Two queues are kept: high priority work is always drained before low
//! priority work. Workers are tokio tasks that hand each cache call to the
//! blocking pool, since engine operations are synchronous.

use super::{AsyncTask, TaskRuntime};
use crate::config::AsyncProcessorConfig;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const ACCEPTING: u8 = 0;
const WINDING_UP: u8 = 1;
const STOPPED: u8 = 2;

#[derive(Default)]
struct Queues {
    high: VecDeque<Box<dyn AsyncTask>>,
    low: VecDeque<Box<dyn AsyncTask>>,
}

impl Queues {
    fn pop(&mut self) -> Option<Box<dyn AsyncTask>> {
        self.high.pop_front().or_else(|| self.low.pop_front())
    }

    fn len(&self) -> usize {
        self.high.len() + self.low.len()
    }
}

struct Shared {
    queues: Mutex<Queues>,
    work_available: Notify,
    state: AtomicU8,
    runtime: TaskRuntime,
}

impl Shared {
    fn state(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    fn next_task(&self) -> Option<Box<dyn AsyncTask>> {
        let task = self.queues.lock().pop();
        if task.is_some() {
            self.runtime.metrics().async_queue_depth.dec();
        }
        task
    }
}

/// Background processor for [`AsyncTask`]s.
pub struct AsyncProcessor {
    shared: Arc<Shared>,
    config: AsyncProcessorConfig,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl AsyncProcessor {
    /// Create a processor; no worker runs until [`start`](Self::start).
    pub fn new(config: AsyncProcessorConfig, runtime: TaskRuntime) -> Self {
        Self {
            shared: Arc::new(Shared {
                queues: Mutex::new(Queues::default()),
                work_available: Notify::new(),
                state: AtomicU8::new(ACCEPTING),
                runtime,
            }),
            config,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the workers on the current tokio runtime. Calling it again
    /// while workers are running has no effect.
    pub fn start(&self) {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return;
        }

        let count = self.config.worker_count.max(1);
        for worker_id in 0..count {
            let shared = self.shared.clone();
            workers.push(tokio::spawn(run_worker(worker_id, shared)));
        }

        info!(workers = count, "Async processor started");
    }

    /// Queue a high priority task.
    pub fn enqueue(&self, task: Box<dyn AsyncTask>) -> Result<()> {
        self.push(task, true)
    }

    /// Queue a task behind all high priority work.
    pub fn enqueue_low_priority(&self, task: Box<dyn AsyncTask>) -> Result<()> {
        self.push(task, false)
    }

    fn push(&self, task: Box<dyn AsyncTask>, high: bool) -> Result<()> {
        {
            let mut queues = self.shared.queues.lock();
            // Checked under the queue lock so stop() cannot miss this task.
            if self.shared.state() != ACCEPTING {
                return Err(Error::ShuttingDown);
            }
            debug!(op = task.op_code().as_str(), high, "Enqueued async task");
            if high {
                queues.high.push_back(task);
            } else {
                queues.low.push_back(task);
            }
        }

        let metrics = self.shared.runtime.metrics();
        metrics.async_tasks_enqueued.inc();
        metrics.async_queue_depth.inc();
        self.shared.work_available.notify_one();
        Ok(())
    }

    /// Tasks waiting in either queue.
    pub fn pending_count(&self) -> usize {
        self.shared.queues.lock().len()
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.state() == ACCEPTING
    }

    /// Stop accepting work and let the workers drain what is queued.
    pub fn wind_up(&self) {
        let queues = self.shared.queues.lock();
        if self
            .shared
            .state
            .compare_exchange(ACCEPTING, WINDING_UP, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!(pending = queues.len(), "Async processor winding up");
        }
        drop(queues);
        self.shared.work_available.notify_waiters();
    }

    /// Stop accepting work and discard whatever is still queued.
    ///
    /// Tasks already running finish. Returns the number of discarded tasks.
    pub fn stop(&self) -> usize {
        let discarded = {
            let mut queues = self.shared.queues.lock();
            self.shared.state.store(STOPPED, Ordering::Release);
            let n = queues.len();
            queues.high.clear();
            queues.low.clear();
            n
        };

        self.shared
            .runtime
            .metrics()
            .async_queue_depth
            .set(0);
        self.shared.work_available.notify_waiters();

        if discarded > 0 {
            warn!(discarded, "Async processor stopped with pending tasks");
        } else {
            info!("Async processor stopped");
        }
        discarded
    }

    /// Wait for every worker to exit, up to `timeout`.
    ///
    /// Returns `true` when all workers finished in time. Call after
    /// [`wind_up`](Self::wind_up) or [`stop`](Self::stop).
    pub async fn wait_for_shutdown(&self, timeout: Duration) -> bool {
        let workers: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());

        let joined = tokio::time::timeout(timeout, async {
            for handle in workers {
                if let Err(e) = handle.await {
                    error!(error = %e, "Async worker exited abnormally");
                }
            }
        })
        .await;

        match joined {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    pending = self.pending_count(),
                    "Async processor did not shut down in time"
                );
                false
            }
        }
    }

    /// [`wind_up`](Self::wind_up) then wait with the configured timeout.
    pub async fn shutdown(&self) -> bool {
        self.wind_up();
        self.wait_for_shutdown(self.config.shutdown_timeout).await
    }
}

impl std::fmt::Debug for AsyncProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncProcessor")
            .field("config", &self.config)
            .field("pending", &self.pending_count())
            .field("state", &self.shared.state())
            .finish()
    }
}

async fn run_worker(worker_id: usize, shared: Arc<Shared>) {
    debug!(worker_id, "Async worker started");

    loop {
        // Register interest before checking the queues so a notification
        // sent in between is not lost.
        let notified = shared.work_available.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if shared.state() == STOPPED {
            break;
        }

        if let Some(task) = shared.next_task() {
            let op = task.op_code();
            let runtime = shared.runtime.clone();
            let joined = tokio::task::spawn_blocking(move || task.process(&runtime)).await;

            if let Err(e) = joined {
                if e.is_panic() {
                    shared.runtime.metrics().async_task_panics.inc();
                    error!(
                        context = "AsyncProcessor::run_worker",
                        worker_id,
                        op = op.as_str(),
                        "Async task panicked"
                    );
                } else {
                    warn!(worker_id, error = %e, "Async task was cancelled");
                }
            }
            continue;
        }

        if shared.state() == WINDING_UP {
            break;
        }

        notified.await;
    }

    debug!(worker_id, "Async worker exited");
}
