//! Picking usable responses out of a response list.
//!
//! These helpers prune suspected and unanswered members from the list in
//! place, so later passes over the same list only see live members.

use crate::cluster::response::{ResponseKind, ResponseState, Rsp, RspList};

fn prune_unanswered(results: &mut RspList) {
    results.retain(|rsp| rsp.state() == ResponseState::Received);
}

/// The first received response that carries a payload.
pub fn first_non_null(results: &mut RspList) -> Option<&Rsp> {
    prune_unanswered(results);
    results.iter().find(|rsp| rsp.value().is_some())
}

/// The first received response whose payload is of the given kind.
pub fn first_non_null_of(results: &mut RspList, kind: ResponseKind) -> Option<&Rsp> {
    prune_unanswered(results);
    results
        .iter()
        .find(|rsp| rsp.value().is_some_and(|v| v.kind() == kind))
}

/// Every received response whose payload is of the given kind, in order.
pub fn all_non_null_of(results: &mut RspList, kind: ResponseKind) -> Vec<&Rsp> {
    prune_unanswered(results);
    results
        .iter()
        .filter(|rsp| rsp.value().is_some_and(|v| v.kind() == kind))
        .collect()
}
