//! Delivery of async operation results to client callbacks.
//!
//! Tasks never call the listener themselves. They push an [`AsyncCompletion`]
//! into an unbounded channel and a dispatcher task invokes the listener, so
//! the callback always runs off the thread that processed the operation and
//! a slow listener never holds up a worker.

use super::{AsyncCallbackInfo, AsyncOpCode, AsyncOpResult};
use bytes::Bytes;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Result of one async operation, addressed to the client callback that
/// asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncCompletion {
    pub op: AsyncOpCode,
    /// Key of the operation; `None` for clear.
    pub key: Option<Bytes>,
    pub callback: AsyncCallbackInfo,
    pub result: AsyncOpResult,
}

/// Receives completed async operations.
pub trait CompletionListener: Send + Sync + 'static {
    fn on_async_operation_completed(&self, completion: &AsyncCompletion);
}

impl<F> CompletionListener for F
where
    F: Fn(&AsyncCompletion) + Send + Sync + 'static,
{
    fn on_async_operation_completed(&self, completion: &AsyncCompletion) {
        self(completion)
    }
}

/// Sending half of the completion channel, held by every task runtime.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<AsyncCompletion>,
}

impl CompletionSender {
    /// Queue a completion for delivery. Never blocks.
    pub fn send(&self, completion: AsyncCompletion) {
        if let Err(mpsc::error::SendError(lost)) = self.tx.send(completion) {
            warn!(
                op = ?lost.op,
                request_id = lost.callback.request_id,
                "Completion dispatcher gone, dropping callback"
            );
        }
    }
}

/// Background task that hands completions to the listener.
#[derive(Debug)]
pub struct CompletionDispatcher {
    handle: JoinHandle<u64>,
}

impl CompletionDispatcher {
    /// Spawn the dispatcher on the current tokio runtime.
    ///
    /// The dispatcher runs until every [`CompletionSender`] is dropped.
    pub fn spawn(listener: Arc<dyn CompletionListener>) -> (CompletionSender, Self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<AsyncCompletion>();

        let handle = tokio::spawn(async move {
            let mut delivered = 0u64;
            while let Some(completion) = rx.recv().await {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    listener.on_async_operation_completed(&completion)
                }));
                match outcome {
                    Ok(()) => delivered += 1,
                    Err(_) => error!(
                        context = "completion_dispatcher",
                        op = ?completion.op,
                        request_id = completion.callback.request_id,
                        "Completion listener panicked"
                    ),
                }
            }
            debug!(delivered, "Completion dispatcher stopped");
            delivered
        });

        (CompletionSender { tx }, Self { handle })
    }

    /// Wait for the dispatcher to drain and stop; returns how many
    /// completions were delivered.
    pub async fn join(self) -> u64 {
        self.handle.await.unwrap_or_else(|e| {
            error!(error = %e, "Completion dispatcher failed");
            0
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn completion(request_id: i64) -> AsyncCompletion {
        AsyncCompletion {
            op: AsyncOpCode::Add,
            key: Some(Bytes::from_static(b"k")),
            callback: AsyncCallbackInfo::new(request_id, "client-1", 7),
            result: AsyncOpResult::Success,
        }
    }

    #[tokio::test]
    async fn test_dispatcher_delivers_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (sender, dispatcher) = CompletionDispatcher::spawn(Arc::new(
            move |c: &AsyncCompletion| sink.lock().push(c.callback.request_id),
        ));

        sender.send(completion(1));
        sender.send(completion(2));
        drop(sender);

        assert_eq!(dispatcher.join().await, 2);
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_stop_dispatch() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (sender, dispatcher) = CompletionDispatcher::spawn(Arc::new(
            move |c: &AsyncCompletion| {
                if c.callback.request_id == 1 {
                    panic!("listener failure");
                }
                sink.lock().push(c.callback.request_id);
            },
        ));

        sender.send(completion(1));
        sender.send(completion(2));
        drop(sender);

        assert_eq!(dispatcher.join().await, 1);
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[tokio::test]
    async fn test_send_after_dispatcher_gone_is_harmless() {
        let (sender, dispatcher) = CompletionDispatcher::spawn(Arc::new(|_: &AsyncCompletion| {}));
        dispatcher.handle.abort();
        let _ = dispatcher.handle.await;
        sender.send(completion(3));
    }
}
