//! Reconciliation of single-key operations on a replicated cache.
//!
//! Every member holds a full copy, so an operation only counts as done when
//! all live members agree. Suspected members are excluded from the vote;
//! members that timed out turn the result into a partial or full timeout.

use super::{bad_response, payload, Tally, Verdict};
use crate::cache::entry::LockOptions;
use crate::cluster::response::{ResponseKind, ResponseState, Rsp, RspList, RspValue};
use crate::cluster::results::{
    CacheAddResult, CacheInsResult, CacheInsResultWithEntry, ClusterOperationResult,
    ClusterOperationStatus, EnumerationDataChunk, LockOutcome,
};
use crate::error::{Error, Result};
use tracing::debug;

/// Decide the outcome of a replicated add.
///
/// Any member result other than `Success` or `KeyExists` is returned as
/// soon as it is seen. An empty list yields `Failure`.
pub fn reconcile_add(results: &RspList) -> Result<CacheAddResult> {
    let mut tally = Tally::new(results.len());
    let mut res = CacheAddResult::Failure;

    for rsp in results {
        match rsp.state() {
            ResponseState::Suspected => {
                tally.suspected += 1;
                continue;
            }
            ResponseState::TimedOut => {
                tally.timeout += 1;
                continue;
            }
            ResponseState::Received => {}
        }

        res = match payload(rsp)? {
            Some(RspValue::AddResult(r)) => *r,
            _ => return Err(bad_response(rsp, ResponseKind::AddResult)),
        };

        match res {
            CacheAddResult::Success => tally.success += 1,
            CacheAddResult::KeyExists => {}
            other => {
                debug!(sender = rsp.sender(), result = ?other, "Add short-circuited");
                return Ok(other);
            }
        }
    }

    Ok(match tally.verdict() {
        Verdict::SucceededOnLiveMembers => CacheAddResult::Success,
        Verdict::PartialTimeout => CacheAddResult::PartialTimeout,
        Verdict::FullTimeout => CacheAddResult::FullTimeout,
        Verdict::Undecided => res,
    })
}

/// Decide the outcome of a replicated insert.
///
/// The last received result is reported, carrying the overwritten entry it
/// came with. Empty member payloads count as `Failure`. When every member
/// asked for eviction the item was stored nowhere, so the result becomes
/// `NeedsEvictionNotRemove`.
pub fn reconcile_insert(results: &RspList) -> Result<CacheInsResultWithEntry> {
    let mut tally = Tally::new(results.len());
    let mut needs_eviction = 0usize;
    let mut res = CacheInsResultWithEntry::default();

    for rsp in results {
        match rsp.state() {
            ResponseState::Suspected => {
                tally.suspected += 1;
                continue;
            }
            ResponseState::TimedOut => {
                tally.timeout += 1;
                continue;
            }
            ResponseState::Received => {}
        }

        res = match payload(rsp)? {
            Some(RspValue::InsertResult(r)) => r.clone().unwrap_or_default(),
            None => CacheInsResultWithEntry::default(),
            _ => return Err(bad_response(rsp, ResponseKind::InsertResult)),
        };

        if res.result.is_success() {
            tally.success += 1;
        }
        if res.result == CacheInsResult::NeedsEviction {
            needs_eviction += 1;
        }
    }

    if !results.is_empty() && needs_eviction == results.len() {
        res.result = CacheInsResult::NeedsEvictionNotRemove;
    }

    match tally.verdict() {
        Verdict::PartialTimeout => res.result = CacheInsResult::PartialTimeout,
        Verdict::FullTimeout => res.result = CacheInsResult::FullTimeout,
        Verdict::SucceededOnLiveMembers | Verdict::Undecided => {}
    }

    Ok(res)
}

/// Decide the outcome of a replicated remove.
///
/// Returns the first received response that carries the removed entry, or
/// `None` when no member had the key. A timeout is raised as
/// [`Error::Timeout`] rather than reported as a status.
pub fn reconcile_remove(results: &RspList) -> Result<Option<&Rsp>> {
    let mut tally = Tally::new(results.len());
    let mut removed = None;

    for rsp in results {
        match rsp.state() {
            ResponseState::Suspected => {
                tally.suspected += 1;
                continue;
            }
            ResponseState::TimedOut => {
                tally.timeout += 1;
                continue;
            }
            ResponseState::Received => {}
        }

        match payload(rsp)? {
            Some(RspValue::Entry(_)) => {
                removed.get_or_insert(rsp);
            }
            None => {}
            _ => return Err(bad_response(rsp, ResponseKind::Entry)),
        }
        tally.success += 1;
    }

    match tally.verdict() {
        Verdict::PartialTimeout | Verdict::FullTimeout => {
            Err(Error::Timeout("operation timeout".to_string()))
        }
        Verdict::SucceededOnLiveMembers | Verdict::Undecided => Ok(removed),
    }
}

/// Decide whether a replicated lock was acquired under `lock_id`.
///
/// Members without the item count as neutral. The first member reporting a
/// different holder decides the attempt failed, and that holder is returned.
/// The lock is acquired only if at least one member granted it and every
/// responding member either granted it or lacks the item.
pub fn reconcile_lock(results: &RspList, lock_id: Option<&str>) -> Result<LockOutcome> {
    let mut responding = results.len();
    let mut acquired = 0usize;
    let mut not_found = 0usize;
    let mut lock_date_ms = 0u64;

    for rsp in results {
        if rsp.state() != ResponseState::Received {
            responding -= 1;
            continue;
        }

        let info = match payload(rsp)? {
            Some(RspValue::Lock(info)) => info.clone(),
            None => LockOptions::not_found(),
            _ => return Err(bad_response(rsp, ResponseKind::Lock)),
        };

        if info.lock_id.as_deref() == lock_id {
            lock_date_ms = info.lock_date_ms;
            acquired += 1;
        } else if info.lock_id.is_none() {
            not_found += 1;
        } else {
            debug!(sender = rsp.sender(), holder = ?info.lock_id, "Lock held by another owner");
            return Ok(LockOutcome {
                acquired: false,
                lock_id: info.lock_id,
                lock_date_ms: info.lock_date_ms,
            });
        }
    }

    if acquired > 0 && acquired + not_found == responding {
        Ok(LockOutcome {
            acquired: true,
            lock_id: lock_id.map(str::to_string),
            lock_date_ms,
        })
    } else {
        Ok(LockOutcome {
            acquired: false,
            lock_id: None,
            lock_date_ms: 0,
        })
    }
}

/// Report the lock state of a replicated item.
///
/// Returns the first received lock that has a holder, otherwise the last
/// lock observed, or `None` if no member answered.
pub fn reconcile_is_locked(results: &RspList) -> Result<Option<LockOptions>> {
    let mut last = None;

    for rsp in results {
        if rsp.state() != ResponseState::Received {
            continue;
        }

        match payload(rsp)? {
            Some(RspValue::Lock(info)) => {
                if info.lock_id.is_some() {
                    return Ok(Some(info.clone()));
                }
                last = Some(info.clone());
            }
            None => {}
            _ => return Err(bad_response(rsp, ResponseKind::Lock)),
        }
    }

    Ok(last)
}

/// Boolean consensus: the first received `false` wins.
///
/// Returns `false` when no member answered.
pub fn reconcile_bool(results: &RspList) -> Result<bool> {
    let mut res = false;

    for rsp in results {
        if rsp.state() != ResponseState::Received {
            continue;
        }

        res = match payload(rsp)? {
            Some(RspValue::Bool(b)) => *b,
            _ => return Err(bad_response(rsp, ResponseKind::Bool)),
        };
        if !res {
            return Ok(false);
        }
    }

    Ok(res)
}

/// The first non-empty enumeration chunk among received responses.
pub fn first_enumeration_chunk(results: &RspList) -> Result<Option<&EnumerationDataChunk>> {
    for rsp in results {
        if rsp.state() != ResponseState::Received {
            continue;
        }

        match payload(rsp)? {
            Some(RspValue::Chunk(chunk)) => return Ok(Some(chunk)),
            None => {}
            _ => return Err(bad_response(rsp, ResponseKind::Chunk)),
        }
    }

    Ok(None)
}

/// Decide the status of a generic cluster-wide operation.
///
/// Follows the add rules with `Completed` as success. A partial timeout
/// keeps the last member result with its status replaced; a full timeout
/// yields a fresh result.
pub fn reconcile_cluster_operation(results: &RspList) -> Result<Option<ClusterOperationResult>> {
    let mut tally = Tally::new(results.len());
    let mut res: Option<ClusterOperationResult> = None;

    for rsp in results {
        match rsp.state() {
            ResponseState::Suspected => {
                tally.suspected += 1;
                continue;
            }
            ResponseState::TimedOut => {
                tally.timeout += 1;
                continue;
            }
            ResponseState::Received => {}
        }

        let op = match payload(rsp)? {
            Some(RspValue::ClusterOperation(op)) => op.clone(),
            _ => return Err(bad_response(rsp, ResponseKind::ClusterOperation)),
        };
        if op.status == ClusterOperationStatus::Completed {
            tally.success += 1;
        }
        res = Some(op);
    }

    Ok(match tally.verdict() {
        Verdict::PartialTimeout => res.map(|mut op| {
            op.status = ClusterOperationStatus::PartialTimeout;
            op
        }),
        Verdict::FullTimeout => Some(ClusterOperationResult::new(
            ClusterOperationStatus::FullTimeout,
        )),
        Verdict::SucceededOnLiveMembers | Verdict::Undecided => res,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::CacheEntry;
    use crate::testing::responses::RspListBuilder;
    use bytes::Bytes;

    fn add(r: CacheAddResult) -> RspValue {
        RspValue::AddResult(r)
    }

    fn ins(r: CacheInsResult) -> RspValue {
        RspValue::InsertResult(Some(CacheInsResultWithEntry::new(r)))
    }

    fn lock(id: Option<&str>, date: u64) -> RspValue {
        RspValue::Lock(LockOptions {
            lock_id: id.map(str::to_string),
            lock_date_ms: date,
        })
    }

    #[test]
    fn test_add_all_success() {
        let list = RspListBuilder::new()
            .received(add(CacheAddResult::Success))
            .received(add(CacheAddResult::Success))
            .received(add(CacheAddResult::Success))
            .build();
        assert_eq!(reconcile_add(&list).unwrap(), CacheAddResult::Success);
    }

    #[test]
    fn test_add_success_excluding_suspects() {
        let list = RspListBuilder::new()
            .received(add(CacheAddResult::Success))
            .suspected()
            .received(add(CacheAddResult::Success))
            .build();
        assert_eq!(reconcile_add(&list).unwrap(), CacheAddResult::Success);
    }

    #[test]
    fn test_add_partial_and_full_timeout() {
        let partial = RspListBuilder::new()
            .received(add(CacheAddResult::Success))
            .timed_out()
            .received(add(CacheAddResult::Success))
            .build();
        assert_eq!(
            reconcile_add(&partial).unwrap(),
            CacheAddResult::PartialTimeout
        );

        let full = RspListBuilder::new().timed_out().timed_out().build();
        assert_eq!(reconcile_add(&full).unwrap(), CacheAddResult::FullTimeout);

        let mixed = RspListBuilder::new()
            .received(add(CacheAddResult::Success))
            .timed_out()
            .suspected()
            .build();
        assert_eq!(
            reconcile_add(&mixed).unwrap(),
            CacheAddResult::PartialTimeout
        );
    }

    #[test]
    fn test_add_short_circuits_on_needs_eviction() {
        let list = RspListBuilder::new()
            .received(add(CacheAddResult::Success))
            .received(add(CacheAddResult::NeedsEviction))
            .timed_out()
            .build();
        assert_eq!(
            reconcile_add(&list).unwrap(),
            CacheAddResult::NeedsEviction
        );
    }

    #[test]
    fn test_add_key_exists_is_reported() {
        let list = RspListBuilder::new()
            .received(add(CacheAddResult::Success))
            .received(add(CacheAddResult::KeyExists))
            .build();
        assert_eq!(reconcile_add(&list).unwrap(), CacheAddResult::KeyExists);
    }

    #[test]
    fn test_add_empty_list_is_failure() {
        assert_eq!(
            reconcile_add(&RspList::new()).unwrap(),
            CacheAddResult::Failure
        );
    }

    #[test]
    fn test_add_error_payload_is_raised() {
        let list = RspListBuilder::new()
            .received(RspValue::Error(Error::Locking("held".into())))
            .build();
        assert_eq!(
            reconcile_add(&list).unwrap_err(),
            Error::Locking("held".into())
        );
    }

    #[test]
    fn test_add_wrong_kind_is_bad_response() {
        let list = RspListBuilder::new().received(RspValue::Bool(true)).build();
        assert!(matches!(
            reconcile_add(&list).unwrap_err(),
            Error::BadResponse(_)
        ));
    }

    #[test]
    fn test_insert_needs_eviction_unanimity() {
        let all = RspListBuilder::new()
            .received(ins(CacheInsResult::NeedsEviction))
            .received(ins(CacheInsResult::NeedsEviction))
            .received(ins(CacheInsResult::NeedsEviction))
            .build();
        assert_eq!(
            reconcile_insert(&all).unwrap().result,
            CacheInsResult::NeedsEvictionNotRemove
        );

        let two_of_three = RspListBuilder::new()
            .received(ins(CacheInsResult::Failure))
            .received(ins(CacheInsResult::NeedsEviction))
            .received(ins(CacheInsResult::NeedsEviction))
            .build();
        assert_eq!(
            reconcile_insert(&two_of_three).unwrap().result,
            CacheInsResult::NeedsEviction
        );
    }

    #[test]
    fn test_insert_keeps_overwritten_entry() {
        let old = CacheEntry::new(Bytes::from_static(b"old"));
        let list = RspListBuilder::new()
            .received(RspValue::InsertResult(Some(
                CacheInsResultWithEntry::new(CacheInsResult::SuccessOverwrite)
                    .with_entry(old.clone()),
            )))
            .suspected()
            .build();

        let res = reconcile_insert(&list).unwrap();
        assert_eq!(res.result, CacheInsResult::SuccessOverwrite);
        assert_eq!(res.entry, Some(old));
    }

    #[test]
    fn test_insert_timeouts() {
        let partial = RspListBuilder::new()
            .received(ins(CacheInsResult::Success))
            .timed_out()
            .build();
        assert_eq!(
            reconcile_insert(&partial).unwrap().result,
            CacheInsResult::PartialTimeout
        );

        let full = RspListBuilder::new().timed_out().timed_out().build();
        assert_eq!(
            reconcile_insert(&full).unwrap().result,
            CacheInsResult::FullTimeout
        );
    }

    #[test]
    fn test_insert_empty_payload_is_failure() {
        let list = RspListBuilder::new()
            .received(RspValue::InsertResult(None))
            .build();
        assert_eq!(
            reconcile_insert(&list).unwrap().result,
            CacheInsResult::Failure
        );
        assert_eq!(
            reconcile_insert(&RspList::new()).unwrap().result,
            CacheInsResult::Failure
        );
    }

    #[test]
    fn test_remove_returns_entry_rsp() {
        let entry = CacheEntry::new(Bytes::from_static(b"gone"));
        let list = RspListBuilder::new()
            .received_empty()
            .received(RspValue::Entry(entry.clone()))
            .suspected()
            .build();

        let rsp = reconcile_remove(&list).unwrap().unwrap();
        assert_eq!(rsp.sender(), 1);
        assert_eq!(rsp.value(), Some(&RspValue::Entry(entry)));
    }

    #[test]
    fn test_remove_keeps_first_entry() {
        let first = CacheEntry::new(Bytes::from_static(b"first"));
        let list = RspListBuilder::new()
            .received(RspValue::Entry(first.clone()))
            .received_empty()
            .received(RspValue::Entry(CacheEntry::new(Bytes::from_static(b"second"))))
            .build();

        let rsp = reconcile_remove(&list).unwrap().unwrap();
        assert_eq!(rsp.sender(), 0);
        assert_eq!(rsp.value(), Some(&RspValue::Entry(first)));
    }

    #[test]
    fn test_remove_missing_everywhere() {
        let list = RspListBuilder::new()
            .received_empty()
            .received_empty()
            .build();
        assert!(reconcile_remove(&list).unwrap().is_none());
    }

    #[test]
    fn test_remove_timeout_is_error() {
        let list = RspListBuilder::new()
            .received(RspValue::Entry(CacheEntry::new(Bytes::from_static(b"v"))))
            .timed_out()
            .build();
        assert!(matches!(
            reconcile_remove(&list).unwrap_err(),
            Error::Timeout(_)
        ));
    }

    #[test]
    fn test_lock_acquired_on_all_members() {
        let list = RspListBuilder::new()
            .received(lock(Some("L1"), 100))
            .received(lock(Some("L1"), 100))
            .received(lock(None, 0))
            .suspected()
            .build();

        let outcome = reconcile_lock(&list, Some("L1")).unwrap();
        assert!(outcome.acquired);
        assert_eq!(outcome.lock_id.as_deref(), Some("L1"));
        assert_eq!(outcome.lock_date_ms, 100);
    }

    #[test]
    fn test_lock_five_members_with_missing_and_suspected() {
        let list = RspListBuilder::new()
            .received(lock(Some("L1"), 100))
            .received(lock(Some("L1"), 100))
            .received(lock(Some("L1"), 100))
            .received(lock(None, 0))
            .suspected()
            .build();

        let outcome = reconcile_lock(&list, Some("L1")).unwrap();
        assert!(outcome.acquired);
        assert_eq!(outcome.lock_id.as_deref(), Some("L1"));
    }

    #[test]
    fn test_lock_outcome_independent_of_order() {
        // Missing item answered first must not clear the requested id.
        let list = RspListBuilder::new()
            .received(lock(None, 0))
            .suspected()
            .received(lock(Some("L1"), 100))
            .received(lock(Some("L1"), 100))
            .received(lock(Some("L1"), 100))
            .build();

        let outcome = reconcile_lock(&list, Some("L1")).unwrap();
        assert!(outcome.acquired);
        assert_eq!(outcome.lock_id.as_deref(), Some("L1"));
        assert_eq!(outcome.lock_date_ms, 100);
    }

    #[test]
    fn test_lock_conflict_reports_holder() {
        // Five members: two granted, one timed out, one held by someone else.
        let list = RspListBuilder::new()
            .received(lock(Some("L1"), 100))
            .timed_out()
            .received(lock(Some("L1"), 100))
            .received(lock(Some("L2"), 250))
            .received(lock(Some("L1"), 100))
            .build();

        let outcome = reconcile_lock(&list, Some("L1")).unwrap();
        assert!(!outcome.acquired);
        assert_eq!(outcome.lock_id.as_deref(), Some("L2"));
        assert_eq!(outcome.lock_date_ms, 250);
    }

    #[test]
    fn test_lock_not_found_order_does_not_matter() {
        let list = RspListBuilder::new()
            .received(lock(None, 0))
            .received(lock(Some("L1"), 42))
            .build();

        let outcome = reconcile_lock(&list, Some("L1")).unwrap();
        assert!(outcome.acquired);
        assert_eq!(outcome.lock_date_ms, 42);
    }

    #[test]
    fn test_lock_not_found_everywhere() {
        let list = RspListBuilder::new()
            .received(lock(None, 0))
            .received(lock(None, 0))
            .build();

        let outcome = reconcile_lock(&list, Some("L1")).unwrap();
        assert!(!outcome.acquired);
        assert!(outcome.lock_id.is_none());
    }

    #[test]
    fn test_is_locked_prefers_held_lock() {
        let list = RspListBuilder::new()
            .received(lock(None, 0))
            .timed_out()
            .received(lock(Some("L9"), 7))
            .received(lock(Some("L3"), 8))
            .build();

        let info = reconcile_is_locked(&list).unwrap().unwrap();
        assert_eq!(info.lock_id.as_deref(), Some("L9"));

        let unlocked = RspListBuilder::new().received(lock(None, 0)).build();
        assert_eq!(
            reconcile_is_locked(&unlocked).unwrap(),
            Some(LockOptions::not_found())
        );
        assert!(reconcile_is_locked(&RspList::new()).unwrap().is_none());
    }

    #[test]
    fn test_bool_first_false_wins() {
        let list = RspListBuilder::new()
            .received(RspValue::Bool(true))
            .received(RspValue::Bool(false))
            .received(RspValue::Error(Error::Cancelled))
            .build();
        // The error payload after the first `false` is never inspected.
        assert!(!reconcile_bool(&list).unwrap());

        let all_true = RspListBuilder::new()
            .received(RspValue::Bool(true))
            .timed_out()
            .received(RspValue::Bool(true))
            .build();
        assert!(reconcile_bool(&all_true).unwrap());
        assert!(!reconcile_bool(&RspList::new()).unwrap());
    }

    #[test]
    fn test_first_enumeration_chunk() {
        use crate::cluster::results::EnumerationPointer;

        let chunk = EnumerationDataChunk {
            pointer: EnumerationPointer::new("e1", -1),
            data: vec![Bytes::from_static(b"k1")],
        };
        let list = RspListBuilder::new()
            .suspected()
            .received_empty()
            .received(RspValue::Chunk(chunk.clone()))
            .build();

        let found = first_enumeration_chunk(&list).unwrap().unwrap();
        assert_eq!(found, &chunk);
        assert!(found.is_last_chunk());
    }

    #[test]
    fn test_cluster_operation_statuses() {
        let completed = RspValue::ClusterOperation(
            ClusterOperationResult::new(ClusterOperationStatus::Completed).with_detail("n1"),
        );

        let partial = RspListBuilder::new()
            .received(completed.clone())
            .timed_out()
            .build();
        let res = reconcile_cluster_operation(&partial).unwrap().unwrap();
        assert_eq!(res.status, ClusterOperationStatus::PartialTimeout);
        assert_eq!(res.detail.as_deref(), Some("n1"));

        let full = RspListBuilder::new().timed_out().suspected().build();
        let res = reconcile_cluster_operation(&full).unwrap().unwrap();
        assert_eq!(res.status, ClusterOperationStatus::FullTimeout);
        assert!(res.detail.is_none());

        let live = RspListBuilder::new()
            .received(completed)
            .suspected()
            .build();
        let res = reconcile_cluster_operation(&live).unwrap().unwrap();
        assert_eq!(res.status, ClusterOperationStatus::Completed);
    }
}
