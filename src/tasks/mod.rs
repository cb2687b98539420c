//! Fire-and-forget cache operations.
//!
//! Each task captures one mutating cache call at construction time and
//! replays it against the engine when processed. Tasks are consumed by
//! [`AsyncTask::process`], so they run once and report once.
//!
//! # Architecture
//!
//! ```text
//!   caller ──enqueue──▶ AsyncProcessor ──spawn_blocking──▶ task.process()
//!                          (high / low)                       │
//!                                                             ▼
//!                                                      CacheEngine call
//!                                                             │
//!                                              AsyncCompletion (if callback)
//!                                                             ▼
//!                                   CompletionDispatcher ──▶ CompletionListener
//! ```
//!
//! Engine failures never escape a task: they are logged and delivered to the
//! listener as [`AsyncOpResult::Failed`].

pub mod add;
pub mod clear;
pub mod completion;
pub mod insert;
pub mod processor;
pub mod remove;

pub use add::AsyncAdd;
pub use clear::AsyncClear;
pub use completion::{AsyncCompletion, CompletionDispatcher, CompletionListener, CompletionSender};
pub use insert::AsyncInsert;
pub use processor::AsyncProcessor;
pub use remove::{AsyncRemove, PackedRemove};

use crate::cache::engine::{CacheEngine, ContextValue, OperationContext, OperationContextField};
use crate::error::{Error, Result};
use crate::metrics::CoordinationMetrics;
use bytes::Bytes;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// Kind of async operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AsyncOpCode {
    Add,
    Update,
    Remove,
    Clear,
}

impl AsyncOpCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AsyncOpCode::Add => "add",
            AsyncOpCode::Update => "update",
            AsyncOpCode::Remove => "remove",
            AsyncOpCode::Clear => "clear",
        }
    }

    /// Name used as the `context` field of log events.
    fn log_context(&self) -> &'static str {
        match self {
            AsyncOpCode::Add => "AsyncAdd::process",
            AsyncOpCode::Update => "AsyncInsert::process",
            AsyncOpCode::Remove => "AsyncRemove::process",
            AsyncOpCode::Clear => "AsyncClear::process",
        }
    }
}

/// Outcome handed to the completion listener.
#[derive(Debug, Clone, PartialEq)]
pub enum AsyncOpResult {
    Success,
    /// The engine call failed with this error.
    Failed(Error),
}

impl AsyncOpResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AsyncOpResult::Success)
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            AsyncOpResult::Success => None,
            AsyncOpResult::Failed(e) => Some(e),
        }
    }
}

/// Identifies the client callback an async result is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncCallbackInfo {
    pub request_id: i64,
    pub client_id: String,
    pub callback_id: u16,
}

impl AsyncCallbackInfo {
    pub fn new(request_id: i64, client_id: impl Into<String>, callback_id: u16) -> Self {
        Self {
            request_id,
            client_id: client_id.into(),
            callback_id,
        }
    }
}

/// Everything a task needs while running: the engine, the completion channel
/// and metrics. Cheap to clone.
#[derive(Clone)]
pub struct TaskRuntime {
    engine: Arc<dyn CacheEngine>,
    completions: CompletionSender,
    metrics: Arc<CoordinationMetrics>,
}

impl TaskRuntime {
    pub fn new(
        engine: Arc<dyn CacheEngine>,
        completions: CompletionSender,
        metrics: Arc<CoordinationMetrics>,
    ) -> Self {
        Self {
            engine,
            completions,
            metrics,
        }
    }

    pub fn engine(&self) -> &dyn CacheEngine {
        self.engine.as_ref()
    }

    pub fn metrics(&self) -> &Arc<CoordinationMetrics> {
        &self.metrics
    }

    /// Run one engine call, turning a panic into an [`Error::Internal`] so the
    /// task still completes.
    pub(crate) fn call_engine<T, F>(&self, op: AsyncOpCode, call: F) -> Result<T>
    where
        F: FnOnce(&dyn CacheEngine) -> Result<T>,
    {
        let engine = self.engine.as_ref();
        catch_unwind(AssertUnwindSafe(|| call(engine))).unwrap_or_else(|panic| {
            self.metrics.async_task_panics.inc();
            Err(Error::Internal(format!(
                "engine panicked during {}: {}",
                op.as_str(),
                panic_message(panic.as_ref())
            )))
        })
    }

    /// Turn the engine outcome into a result, record it, and queue the
    /// completion when a callback was registered.
    pub(crate) fn complete(
        &self,
        op: AsyncOpCode,
        key: Option<Bytes>,
        callback: Option<AsyncCallbackInfo>,
        outcome: Result<()>,
    ) {
        let result = match outcome {
            Ok(()) => {
                debug!(op = op.as_str(), "Async operation completed");
                AsyncOpResult::Success
            }
            Err(err) => {
                error!(context = op.log_context(), error = %err, "Async operation failed");
                AsyncOpResult::Failed(err)
            }
        };

        self.metrics.record_async_outcome(op.as_str(), result.is_success());

        if let Some(callback) = callback {
            self.completions.send(AsyncCompletion {
                op,
                key,
                callback,
                result,
            });
        }
    }
}

impl std::fmt::Debug for TaskRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRuntime")
            .field("completions", &self.completions)
            .finish_non_exhaustive()
    }
}

/// A queued cache operation.
pub trait AsyncTask: Send + 'static {
    fn op_code(&self) -> AsyncOpCode;

    /// Run the operation against the engine and report the outcome.
    ///
    /// Consumes the task, so the completion fires at most once.
    fn process(self: Box<Self>, runtime: &TaskRuntime);
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&'static str>() {
        *msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}

/// Copy of the caller's context, flagged so the engine call does not wait
/// on graceful-shutdown barriers.
pub(crate) fn non_blocking_context(context: &OperationContext) -> OperationContext {
    context.clone().with(
        OperationContextField::NoGracefulBlock,
        ContextValue::Bool(true),
    )
}
