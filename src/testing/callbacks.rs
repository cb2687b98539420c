//! A completion listener that keeps what it receives.

use crate::tasks::completion::{AsyncCompletion, CompletionListener};
use crate::testing::utils::wait_until;
use parking_lot::Mutex;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct RecordingListener {
    received: Mutex<Vec<AsyncCompletion>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<AsyncCompletion> {
        self.received.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.received.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `count` completions arrived.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        wait_until(|| self.len() >= count, timeout).await
    }
}

impl CompletionListener for RecordingListener {
    fn on_async_operation_completed(&self, completion: &AsyncCompletion) {
        self.received.lock().push(completion.clone());
    }
}
