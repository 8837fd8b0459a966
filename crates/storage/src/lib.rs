//! Pulse Storage - Storage layer for Pulse collections.
//!
//! This crate provides the per-collection storage pieces:
//!
//! - `RecordStore`: Keyed record table with lazy primary-key discovery
//! - `IndexTable`: Named, ordered, duplicate-free key lists
//! - `Relation`: Single-hop foreign-key links to other collections
//! - `materialize`: Builds resolved, relation-expanded group views
//! - `HistoryLog`: Append-only mutation journal
//!
//! # Example
//!
//! ```rust
//! use pulse_storage::{materialize, IndexTable, NoForeignData, RecordStore};
//! use pulse_core::json;
//!
//! let mut store = RecordStore::new();
//! let record = json!({"id": 1, "name": "a"});
//! let record = record.as_object().unwrap();
//! let key = store.admit(record, &["id", "_id"]).unwrap();
//! store.upsert(key.clone(), record.clone());
//!
//! let mut indexes = IndexTable::new();
//! indexes.declare("list");
//! indexes.push_unique("list", key);
//!
//! let group = materialize(indexes.keys("list").unwrap(), &store, &[], &NoForeignData);
//! assert_eq!(group, vec![json!({"id": 1, "name": "a"})]);
//! ```

pub mod group;
pub mod history;
pub mod index;
pub mod record_store;
pub mod relation;

pub use group::materialize;
pub use history::{HistoryEntry, HistoryLog, Mutation, MutationType};
pub use index::IndexTable;
pub use record_store::{RecordStore, DEFAULT_PRIMARY_KEYS};
pub use relation::{ForeignLookup, NoForeignData, Relation};
