//! Error types for cluster reconciliation and resource coordination.

use crate::types::NodeId;
use thiserror::Error;

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
///
/// Errors are `Clone` because they travel as response payloads from cluster
/// members and as results of asynchronous operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The operation did not complete on the addressed members in time.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// A member was suspected failed while collecting responses.
    #[error("node suspected: {0}")]
    Suspected(NodeId),

    /// A query or index expression could not be parsed.
    #[error("parser error: {0}")]
    Parser(String),

    /// The node is not licensed to serve the operation.
    #[error("licensing error: {0}")]
    Licensing(String),

    /// The item is locked by another holder.
    #[error("locking error: {0}")]
    Locking(String),

    /// A server-side reader became invalid.
    #[error("invalid reader: {0}")]
    InvalidReader(String),

    /// A member answered with a payload of the wrong kind.
    #[error("bad response: {0}")]
    BadResponse(String),

    /// Domain failure reported by the cache engine.
    #[error("cache error: {0}")]
    Cache(String),

    /// A non-cache failure raised on a remote member.
    #[error("remote error: {0}")]
    Remote(String),

    /// Several distinct failures reported by different members.
    #[error("{} errors reported by cluster members", .0.len())]
    Aggregate(Vec<Error>),

    /// Enumerator misuse or a missing value.
    #[error("enumeration error: {0}")]
    Enumeration(String),

    /// Resource pool errors.
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),

    /// Payload encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The async processor no longer accepts work.
    #[error("async processor is shutting down")]
    ShuttingDown,

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error belongs to the cache's own error family.
    ///
    /// Anything else raised on a member is wrapped in [`Error::Remote`]
    /// before being surfaced to the caller.
    pub fn is_cache_error(&self) -> bool {
        !matches!(
            self,
            Error::Internal(_) | Error::Serialization(_) | Error::Cancelled
        )
    }

    /// Wrap non-cache errors as [`Error::Remote`], pass cache errors through.
    pub fn into_remote(self) -> Self {
        if self.is_cache_error() {
            self
        } else {
            Error::Remote(self.to_string())
        }
    }
}

/// Resource pool errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    /// Opening a connection failed.
    #[error("connection open failed: {0}")]
    OpenFailed(String),

    /// The connection is not open.
    #[error("connection not open")]
    NotOpen,

    /// A statement failed to execute.
    #[error("statement failed: {0}")]
    StatementFailed(String),

    /// Transaction control failed.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// The sync table name is not a plain identifier.
    #[error("invalid sync table name: {0}")]
    InvalidTableName(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<lz4_flex::block::DecompressError> for Error {
    fn from(e: lz4_flex::block::DecompressError) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_family() {
        assert!(Error::Locking("held".into()).is_cache_error());
        assert!(Error::Timeout("t".into()).is_cache_error());
        assert!(!Error::Internal("boom".into()).is_cache_error());
    }

    #[test]
    fn test_into_remote_wraps_foreign_errors() {
        let wrapped = Error::Internal("null reference".into()).into_remote();
        assert_eq!(
            wrapped,
            Error::Remote("internal error: null reference".into())
        );

        let kept = Error::Cache("key exists".into()).into_remote();
        assert_eq!(kept, Error::Cache("key exists".into()));
    }

    #[test]
    fn test_aggregate_display() {
        let e = Error::Aggregate(vec![Error::Cancelled, Error::Timeout("x".into())]);
        assert_eq!(e.to_string(), "2 errors reported by cluster members");
    }
}
