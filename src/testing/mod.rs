//! Test doubles and helpers.
//!
//! These stand in for the pieces that live outside the crate: the cache
//! engine, the client-facing completion listener, the database behind the
//! sync table and the cluster transport that produces response lists.
//!
//! # Architecture
//!
//! ```text
//!   RspListBuilder ──▶ reconcile::*
//!
//!   RecordingEngine ◀── tasks / LazyKeysetEnumerator
//!        │ (records every call, injects failures and panics)
//!        ▼
//!   LocalCache
//!
//!   RecordingListener ◀── CompletionDispatcher
//!
//!   ScriptedConnection ◀── DbConnectionPool
//!        (in-memory sync table, transactional)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use quorum_cache::testing::{RecordingEngine, RecordingListener};
//! use quorum_cache::tasks::{CompletionDispatcher, TaskRuntime};
//! use std::sync::Arc;
//!
//! let engine = Arc::new(RecordingEngine::new());
//! let listener = Arc::new(RecordingListener::new());
//! let (sender, _dispatcher) = CompletionDispatcher::spawn(listener.clone());
//! let runtime = TaskRuntime::new(engine.clone(), sender, Default::default());
//! ```

pub mod callbacks;
pub mod connection;
pub mod engine;
pub mod responses;
pub mod utils;


pub use callbacks::RecordingListener;
pub use connection::ScriptedConnection;
pub use engine::{EngineCall, RecordingEngine};
pub use responses::RspListBuilder;
pub use utils::wait_until;
