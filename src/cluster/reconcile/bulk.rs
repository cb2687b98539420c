//! Reconciliation of multi-key operations on a replicated cache.

use super::{bad_response, payload};
use crate::cache::entry::CacheEntry;
use crate::cluster::response::{ResponseKind, ResponseState, RspList, RspValue};
use crate::error::Result;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};

/// Union of the keys a bulk operation failed for, across received responses.
///
/// Keys keep the order in which they were first reported. Empty payloads
/// contribute nothing.
pub fn merge_bulk_failed_keys(results: &RspList) -> Result<Vec<Bytes>> {
    let mut seen = HashSet::new();
    let mut failed = Vec::new();

    for rsp in results {
        if rsp.state() != ResponseState::Received {
            continue;
        }

        let keys = match payload(rsp)? {
            Some(RspValue::Keys(keys)) => keys,
            None => continue,
            _ => return Err(bad_response(rsp, ResponseKind::Keys)),
        };

        for key in keys {
            if seen.insert(key.clone()) {
                failed.push(key.clone());
            }
        }
    }

    Ok(failed)
}

/// Items a bulk insert committed on every received member.
///
/// A key commits only if each member reports it; a key missing from any one
/// member is dropped. Values are taken from the first member's report.
pub fn intersect_bulk_inserts(results: &RspList) -> Result<HashMap<Bytes, CacheEntry>> {
    let mut inserted: Option<HashMap<Bytes, CacheEntry>> = None;

    for rsp in results {
        if rsp.state() != ResponseState::Received {
            continue;
        }

        let empty = HashMap::new();
        let reported = match payload(rsp)? {
            Some(RspValue::KeyedEntries(entries)) => entries,
            None => &empty,
            _ => return Err(bad_response(rsp, ResponseKind::KeyedEntries)),
        };

        match inserted.as_mut() {
            None => inserted = Some(reported.clone()),
            Some(acc) => acc.retain(|key, _| reported.contains_key(key)),
        }
    }

    Ok(inserted.unwrap_or_default())
}

/// Items removed by a bulk remove: the first received non-empty report.
pub fn first_bulk_removal(results: &RspList) -> Result<Option<&HashMap<Bytes, CacheEntry>>> {
    for rsp in results {
        if rsp.state() != ResponseState::Received {
            continue;
        }

        match payload(rsp)? {
            Some(RspValue::KeyedEntries(entries)) => return Ok(Some(entries)),
            None => {}
            _ => return Err(bad_response(rsp, ResponseKind::KeyedEntries)),
        }
    }

    Ok(None)
}
