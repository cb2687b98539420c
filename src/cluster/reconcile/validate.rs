//! Surfacing member errors before a response list is reconciled.

use crate::cache::entry::CacheEntry;
use crate::cluster::response::{ResponseKind, ResponseState, RspList, RspValue};
use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::HashMap;
use tracing::{error, warn};

/// Check a response list for member errors and malformed payloads.
///
/// Suspected members are skipped, or raised as [`Error::Suspected`] when
/// `throw_suspected` is set. Unanswered members are skipped.
///
/// Invalid-reader and licensing errors abort immediately. Parser errors are
/// tolerated unless every member reported one, since an index may only be
/// defined on some members. A payload of a kind other than `expected` counts
/// as a bad response.
///
/// A single remaining error is raised as-is. Several errors raise the first
/// locking error if there is one; otherwise the first error when all carry
/// the same message, or an [`Error::Aggregate`] when they differ.
pub fn validate_responses(
    results: &RspList,
    expected: Option<ResponseKind>,
    throw_suspected: bool,
) -> Result<()> {
    let mut parser_errors = Vec::new();
    let mut errors = Vec::new();

    for rsp in results {
        match rsp.state() {
            ResponseState::Suspected if throw_suspected => {
                return Err(Error::Suspected(rsp.sender()));
            }
            ResponseState::Suspected | ResponseState::TimedOut => continue,
            ResponseState::Received => {}
        }

        let Some(value) = rsp.value() else {
            continue;
        };

        match value {
            RspValue::Error(err @ (Error::InvalidReader(_) | Error::Licensing(_))) => {
                return Err(err.clone());
            }
            RspValue::Error(err @ Error::Parser(_)) => parser_errors.push(err.clone()),
            RspValue::Error(err) => errors.push(err.clone()),
            other => {
                if let Some(kind) = expected {
                    if other.kind() != kind {
                        errors.push(Error::BadResponse(format!(
                            "bad response returned by group member {}",
                            rsp.sender()
                        )));
                    }
                }
            }
        }
    }

    if !parser_errors.is_empty() && parser_errors.len() == results.len() {
        error!(
            parser_errors = parser_errors.len(),
            results = results.len(),
            error = %parser_errors[0],
            "Every member failed to parse the query"
        );
        return Err(parser_errors.swap_remove(0));
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0).into_remote()),
        _ => {
            if let Some(locking) = errors.iter().find(|e| matches!(e, Error::Locking(_))) {
                return Err(locking.clone());
            }

            let errors: Vec<Error> = errors.into_iter().map(Error::into_remote).collect();
            let first = errors[0].to_string();
            if errors.iter().all(|e| e.to_string() == first) {
                Err(errors[0].clone())
            } else {
                warn!(count = errors.len(), "Members reported distinct errors");
                Err(Error::Aggregate(errors))
            }
        }
    }
}

/// Fail if any member was suspected.
pub fn verify_no_suspects(results: &RspList) -> Result<()> {
    match results.iter().find(|rsp| rsp.was_suspected()) {
        Some(rsp) => Err(Error::Suspected(rsp.sender())),
        None => Ok(()),
    }
}

/// Require an answer from every member.
///
/// Suspected members raise [`Error::Suspected`] and unanswered ones raise
/// [`Error::Timeout`]. Otherwise returns the last member's keyed payload.
pub fn verify_all_answered(results: &RspList) -> Result<Option<&HashMap<Bytes, CacheEntry>>> {
    for rsp in results {
        match rsp.state() {
            ResponseState::Suspected => return Err(Error::Suspected(rsp.sender())),
            ResponseState::TimedOut => {
                return Err(Error::Timeout("operation timeout".to_string()));
            }
            ResponseState::Received => {}
        }
    }

    let Some(last) = results.iter().last() else {
        return Ok(None);
    };

    match last.value() {
        Some(RspValue::KeyedEntries(entries)) => Ok(Some(entries)),
        None => Ok(None),
        Some(_) => Err(super::bad_response(last, ResponseKind::KeyedEntries)),
    }
}
