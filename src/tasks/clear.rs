//! Asynchronous clear.

use super::{non_blocking_context, AsyncCallbackInfo, AsyncOpCode, AsyncTask, TaskRuntime};
use crate::cache::engine::{CallbackEntry, OperationContext};
use crate::types::BitSet;

/// Removes every item when processed.
#[derive(Debug, Clone, Default)]
pub struct AsyncClear {
    flags: BitSet,
    notification: Option<CallbackEntry>,
    callback: Option<AsyncCallbackInfo>,
    provider_name: Option<String>,
    context: OperationContext,
}

impl AsyncClear {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(mut self, flags: BitSet) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_notification(mut self, notification: CallbackEntry) -> Self {
        self.notification = Some(notification);
        self
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
}

impl AsyncTask for AsyncClear {
    fn op_code(&self) -> AsyncOpCode {
        AsyncOpCode::Clear
    }

    fn process(self: Box<Self>, runtime: &TaskRuntime) {
        let context = non_blocking_context(&self.context);
        let outcome = runtime.call_engine(AsyncOpCode::Clear, |engine| {
            engine.clear(
                self.flags,
                self.notification.as_ref(),
                self.provider_name.as_deref(),
                &context,
            )
        });
        runtime.complete(AsyncOpCode::Clear, None, self.callback, outcome);
    }
}
