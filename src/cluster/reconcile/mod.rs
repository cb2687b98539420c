//! Reconciliation of per-member responses into one cluster-wide result.
//!
//! A broadcast produces an [`RspList`](crate::cluster::RspList) with one
//! entry per addressed member. Each member may have answered, timed out, or
//! been suspected failed. The functions here fold such a list into the
//! result the caller sees:
//!
//! - [`validate`]: surface member errors and reject malformed payloads
//! - [`atomic`]: single-key operations (add, insert, remove, lock, ...)
//! - [`bulk`]: multi-key operations
//! - [`lookup`]: pruning and picking non-empty responses
//! - [`statistics`]: combining per-node cache statistics
//!
//! All counting rules share the same timeout/suspect arithmetic, captured by
//! [`Tally`].

pub mod atomic;
pub mod bulk;
pub mod lookup;
pub mod statistics;
pub mod validate;

pub use atomic::{
    first_enumeration_chunk, reconcile_add, reconcile_bool, reconcile_cluster_operation,
    reconcile_insert, reconcile_is_locked, reconcile_lock, reconcile_remove,
};
pub use bulk::{first_bulk_removal, intersect_bulk_inserts, merge_bulk_failed_keys};
pub use lookup::{all_non_null_of, first_non_null, first_non_null_of};
pub use statistics::{
    combine_partition_replicas_statistics, combine_partition_statistics,
    combine_replicated_statistics,
};
pub use validate::{validate_responses, verify_all_answered, verify_no_suspects};

use crate::cluster::response::{ResponseKind, Rsp, RspValue};
use crate::error::{Error, Result};

/// Counts of member outcomes for one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Tally {
    pub total: usize,
    pub success: usize,
    pub suspected: usize,
    pub timeout: usize,
}

/// What the counts alone say about the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Every live member succeeded; the rest were suspected.
    SucceededOnLiveMembers,
    /// Some members timed out while others succeeded.
    PartialTimeout,
    /// Members timed out and none succeeded.
    FullTimeout,
    /// Counts do not decide; the caller keeps the last observed result.
    Undecided,
}

impl Tally {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn verdict(&self) -> Verdict {
        if self.suspected > 0
            && self.success > 0
            && self.suspected + self.success == self.total
        {
            return Verdict::SucceededOnLiveMembers;
        }

        let timed_out = self.timeout > 0
            && (self.timeout + self.success == self.total || self.suspected > 0);

        if !timed_out {
            Verdict::Undecided
        } else if self.success > 0 {
            Verdict::PartialTimeout
        } else {
            Verdict::FullTimeout
        }
    }
}

/// Error for a payload of an unexpected kind.
pub(crate) fn bad_response(rsp: &Rsp, expected: ResponseKind) -> Error {
    Error::BadResponse(format!(
        "member {} returned {:?}, expected {:?}",
        rsp.sender(),
        rsp.value().map(RspValue::kind),
        expected
    ))
}

/// Surface an error payload as an error, pass any other payload through.
pub(crate) fn payload(rsp: &Rsp) -> Result<Option<&RspValue>> {
    match rsp.value() {
        Some(RspValue::Error(err)) => Err(err.clone().into_remote()),
        other => Ok(other),
    }
}
