//! Asynchronous remove.

use super::{non_blocking_context, AsyncCallbackInfo, AsyncOpCode, AsyncTask, TaskRuntime};
use crate::cache::engine::{CallbackEntry, OperationContext};
use crate::types::BitSet;
use bytes::Bytes;

/// Remove arguments bundled as `(key, flags, notification, provider name)`,
/// the form in which replicated removes arrive.
pub type PackedRemove = (Bytes, BitSet, Option<CallbackEntry>, Option<String>);

/// Removes an item when processed. Removing a missing key is not a failure.
#[derive(Debug, Clone)]
pub struct AsyncRemove {
    key: Bytes,
    flags: BitSet,
    notification: Option<CallbackEntry>,
    callback: Option<AsyncCallbackInfo>,
    provider_name: Option<String>,
    context: OperationContext,
}

impl AsyncRemove {
    pub fn new(key: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            flags: BitSet::new(),
            notification: None,
            callback: None,
            provider_name: None,
            context: OperationContext::new(),
        }
    }

    /// Build from the packed form.
    pub fn from_packed(packed: PackedRemove) -> Self {
        let (key, flags, notification, provider_name) = packed;
        Self {
            key,
            flags,
            notification,
            callback: None,
            provider_name,
            context: OperationContext::new(),
        }
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

    pub fn key(&self) -> &Bytes {
        &self.key
    }
}

impl AsyncTask for AsyncRemove {
    fn op_code(&self) -> AsyncOpCode {
        AsyncOpCode::Remove
    }

    fn process(self: Box<Self>, runtime: &TaskRuntime) {
        let context = non_blocking_context(&self.context);
        let outcome = runtime
            .call_engine(AsyncOpCode::Remove, |engine| {
                engine.remove(
                    &self.key,
                    self.flags,
                    self.notification.as_ref(),
                    self.provider_name.as_deref(),
                    &context,
                )
            })
            .map(|_removed| ());
        runtime.complete(AsyncOpCode::Remove, Some(self.key), self.callback, outcome);
    }
}
