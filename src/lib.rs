// ============================================================================
// Rainstore Library
// ============================================================================

//! Storage engine for a caching layer, persisted in a document store.
//!
//! Keys are dotted paths (`"users.42.profile"`) and hold either a value or a
//! list of unique members. Values can be scanned per namespace.
//!
//! ```
//! use rainstore::{DocumentStorageEngine, EngineConfig, MemoryDatabase, StorageEngine, Value};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let db = Arc::new(MemoryDatabase::new());
//! let engine = DocumentStorageEngine::initialize(db, EngineConfig::new()).await?;
//!
//! engine.upsert("users.1", Value::object([("name", "ada")])).await?;
//! engine.upsert("users.1", Value::object([("admin", true)])).await?;
//! engine.add_to_list("users.online", "users.1".into()).await?;
//!
//! let admins = engine
//!     .filter(&|v| v.get("admin") == Some(&Value::Boolean(true)), None, "users")
//!     .await?;
//! assert_eq!(admins.len(), 1);
//! assert_eq!(engine.get_list_count("users.online").await?, 1);
//! # Ok::<(), rainstore::StoreError>(())
//! # }).unwrap();
//! ```

pub mod adapter;
pub mod config;
pub mod core;
pub mod storage;

// Re-export main types for convenience
pub use adapter::DocumentStorageEngine;
pub use config::{CollectionLayout, EngineConfig};
pub use crate::core::{EntryKind, Result, StoreError, Value};
pub use storage::{Database, Members, MemoryDatabase, StorageEngine};
