//! Builders for response lists.

use crate::cluster::response::{Rsp, RspList, RspValue};
use crate::types::NodeId;

/// Builds an [`RspList`], numbering senders from zero in insertion order.
#[derive(Debug, Default)]
pub struct RspListBuilder {
    list: RspList,
}

impl RspListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sender(&self) -> NodeId {
        self.list.len() as NodeId
    }

    /// A member that answered with a payload.
    pub fn received(mut self, value: RspValue) -> Self {
        let rsp = Rsp::received(self.next_sender(), value);
        self.list.add_rsp(rsp);
        self
    }

    /// A member that answered without a payload.
    pub fn received_empty(mut self) -> Self {
        let rsp = Rsp::received_empty(self.next_sender());
        self.list.add_rsp(rsp);
        self
    }

    /// A member that did not answer in time.
    pub fn timed_out(mut self) -> Self {
        let rsp = Rsp::timed_out(self.next_sender());
        self.list.add_rsp(rsp);
        self
    }

    /// A member suspected failed.
    pub fn suspected(mut self) -> Self {
        let rsp = Rsp::suspected(self.next_sender());
        self.list.add_rsp(rsp);
        self
    }

    pub fn build(self) -> RspList {
        self.list
    }
}
