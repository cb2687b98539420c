//! Cache engine contract, stored entries and the local reference engine.

pub mod engine;
pub mod entry;
pub mod local;

pub use engine::{
    CacheEngine, CacheItem, CallbackEntry, ContextValue, OperationContext, OperationContextField,
};
pub use entry::{CacheEntry, EvictionHint, ExpirationHint, GroupInfo, LockOptions, QueryInfo};
pub use local::LocalCache;
