//! Asynchronous add.

use super::{non_blocking_context, AsyncCallbackInfo, AsyncOpCode, AsyncTask, TaskRuntime};
use crate::cache::engine::{CacheItem, OperationContext};
use bytes::Bytes;

/// Adds an item when processed; fails if the key already exists.
#[derive(Debug, Clone)]
pub struct AsyncAdd {
    key: Bytes,
    item: CacheItem,
    callback: Option<AsyncCallbackInfo>,
    provider_name: Option<String>,
    context: OperationContext,
}

impl AsyncAdd {
    pub fn new(key: impl Into<Bytes>, item: CacheItem) -> Self {
        Self {
            key: key.into(),
            item,
            callback: None,
            provider_name: None,
            context: OperationContext::new(),
        }
    }

    pub fn with_callback(mut self, callback: AsyncCallbackInfo) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn with_provider(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = Some(provider_name.into());
        self
    }

    pub fn with_context(mut self, context: OperationContext) -> Self {
        self.context = context;
        self
    }

    pub fn key(&self) -> &Bytes {
        &self.key
    }
}

impl AsyncTask for AsyncAdd {
    fn op_code(&self) -> AsyncOpCode {
        AsyncOpCode::Add
    }

    fn process(self: Box<Self>, runtime: &TaskRuntime) {
        let context = non_blocking_context(&self.context);
        let outcome = runtime.call_engine(AsyncOpCode::Add, |engine| {
            engine.add(
                &self.key,
                &self.item,
                self.provider_name.as_deref(),
                &context,
            )
        });
        runtime.complete(AsyncOpCode::Add, Some(self.key), self.callback, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::engine::{ContextValue, OperationContextField};
    use crate::error::Error;
    use crate::metrics::CoordinationMetrics;
    use crate::tasks::{AsyncOpResult, CompletionDispatcher};
    use crate::testing::callbacks::RecordingListener;
    use crate::testing::engine::RecordingEngine;
    use std::sync::Arc;
    use std::time::Duration;

    fn runtime(engine: Arc<RecordingEngine>) -> (TaskRuntime, Arc<RecordingListener>) {
        let listener = Arc::new(RecordingListener::new());
        let (sender, _dispatcher) = CompletionDispatcher::spawn(listener.clone());
        let rt = TaskRuntime::new(engine, sender, Arc::new(CoordinationMetrics::new()));
        (rt, listener)
    }

    #[tokio::test]
    async fn test_add_reports_success_once() {
        let engine = Arc::new(RecordingEngine::new());
        let (rt, listener) = runtime(engine.clone());

        let task = AsyncAdd::new("k1", CacheItem::new("v1"))
            .with_callback(AsyncCallbackInfo::new(1, "client", 3))
            .with_provider("read-thru");
        Box::new(task).process(&rt);

        assert!(listener.wait_for(1, Duration::from_secs(2)).await);
        let received = listener.received();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].op, AsyncOpCode::Add);
        assert_eq!(received[0].key.as_deref(), Some(&b"k1"[..]));
        assert_eq!(received[0].result, AsyncOpResult::Success);

        let calls = engine.calls();
        assert_eq!(calls[0].provider_name.as_deref(), Some("read-thru"));
        assert!(calls[0]
            .context
            .is_set(OperationContextField::NoGracefulBlock));
        assert!(engine.local().contains(b"k1"));
    }

    #[tokio::test]
    async fn test_add_existing_key_reports_failure() {
        let engine = Arc::new(RecordingEngine::new());
        let (rt, listener) = runtime(engine.clone());

        let callback = AsyncCallbackInfo::new(2, "client", 3);
        Box::new(AsyncAdd::new("k1", CacheItem::new("a"))).process(&rt);
        Box::new(AsyncAdd::new("k1", CacheItem::new("b")).with_callback(callback)).process(&rt);

        assert!(listener.wait_for(1, Duration::from_secs(2)).await);
        let received = listener.received();
        assert_eq!(received.len(), 1);
        assert!(matches!(
            received[0].result,
            AsyncOpResult::Failed(Error::Cache(_))
        ));
        assert_eq!(rt.metrics().snapshot().async_tasks_failed, 1);
    }

    #[tokio::test]
    async fn test_add_keeps_caller_context() {
        let engine = Arc::new(RecordingEngine::new());
        let (rt, _listener) = runtime(engine.clone());

        let ctx = OperationContext::new().with(
            OperationContextField::ClientId,
            ContextValue::Text("c9".into()),
        );
        Box::new(AsyncAdd::new("k", CacheItem::new("v")).with_context(ctx)).process(&rt);

        let call = &engine.calls()[0];
        assert_eq!(
            call.context.get(OperationContextField::ClientId),
            Some(&ContextValue::Text("c9".into()))
        );
        assert!(call.context.is_set(OperationContextField::NoGracefulBlock));
    }
}
