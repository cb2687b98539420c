//! Asynchronous insert.

use super::{non_blocking_context, AsyncCallbackInfo, AsyncOpCode, AsyncTask, TaskRuntime};
use crate::cache::engine::{CacheItem, OperationContext};
use bytes::Bytes;

/// Inserts or overwrites an item when processed.
#[derive(Debug, Clone)]
pub struct AsyncInsert {
    key: Bytes,
    item: CacheItem,
    callback: Option<AsyncCallbackInfo>,
    provider_name: Option<String>,
    context: OperationContext,
}

impl AsyncInsert {
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

impl AsyncTask for AsyncInsert {
    fn op_code(&self) -> AsyncOpCode {
        AsyncOpCode::Update
    }

    fn process(self: Box<Self>, runtime: &TaskRuntime) {
        let context = non_blocking_context(&self.context);
        // The new version is of no interest to the callback.
        let outcome = runtime
            .call_engine(AsyncOpCode::Update, |engine| {
                engine.insert(
                    &self.key,
                    &self.item,
                    self.provider_name.as_deref(),
                    &context,
                )
            })
            .map(|_version| ());
        runtime.complete(AsyncOpCode::Update, Some(self.key), self.callback, outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::engine::{CacheEngine, OperationContextField};
    use crate::cache::entry::ExpirationHint;
    use crate::error::Error;
    use crate::metrics::CoordinationMetrics;
    use crate::tasks::{AsyncOpResult, CompletionDispatcher};
    use crate::testing::callbacks::RecordingListener;
    use crate::testing::engine::RecordingEngine;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_insert_overwrites_and_reports() {
        let engine = Arc::new(RecordingEngine::new());
        let listener = Arc::new(RecordingListener::new());
        let (sender, _dispatcher) = CompletionDispatcher::spawn(listener.clone());
        let rt = TaskRuntime::new(engine.clone(), sender, Arc::new(CoordinationMetrics::new()));

        let item = CacheItem::new("v2").with_expiration(ExpirationHint::Sliding { idle_ms: 500 });
        Box::new(AsyncInsert::new("k", CacheItem::new("v1"))).process(&rt);
        Box::new(
            AsyncInsert::new("k", item).with_callback(AsyncCallbackInfo::new(5, "client", 1)),
        )
        .process(&rt);

        assert!(listener.wait_for(1, Duration::from_secs(2)).await);
        let received = listener.received();
        assert_eq!(received[0].op, AsyncOpCode::Update);
        assert_eq!(received[0].result, AsyncOpResult::Success);

        let stored = engine
            .local()
            .get(&Bytes::from_static(b"k"), &OperationContext::new())
            .unwrap()
            .unwrap();
        assert_eq!(stored.version(), 2);
        assert_eq!(
            stored.expiration(),
            Some(&ExpirationHint::Sliding { idle_ms: 500 })
        );
        assert!(engine
            .calls()
            .iter()
            .all(|c| c.context.is_set(OperationContextField::NoGracefulBlock)));
    }

    #[tokio::test]
    async fn test_insert_engine_error_travels_to_callback() {
        let engine = Arc::new(RecordingEngine::new());
        engine.fail_next(Error::Internal("disk full".into()));
        let listener = Arc::new(RecordingListener::new());
        let (sender, _dispatcher) = CompletionDispatcher::spawn(listener.clone());
        let rt = TaskRuntime::new(engine, sender, Arc::new(CoordinationMetrics::new()));

        Box::new(
            AsyncInsert::new("k", CacheItem::new("v"))
                .with_callback(AsyncCallbackInfo::new(6, "client", 1)),
        )
        .process(&rt);

        assert!(listener.wait_for(1, Duration::from_secs(2)).await);
        assert_eq!(
            listener.received()[0].result,
            AsyncOpResult::Failed(Error::Internal("disk full".into()))
        );
    }
}
