//! Pulse Core - Core types for the Pulse reactive collection store.
//!
//! This crate provides the foundational types shared by every other Pulse crate:
//!
//! - `Key`: Primary key values (integer or string)
//! - `Record`: A field → value mapping stored in a collection
//! - `NodeKey`: The `collection/property` address of a dependency graph node
//! - `Error`: Error types for store operations
//! - `Diagnostics`: The store-wide error sink
//!
//! # Example
//!
//! ```rust
//! use pulse_core::{Key, NodeKey};
//! use serde_json::json;
//!
//! let key = Key::from_value(&json!(7)).unwrap();
//! assert_eq!(key, Key::Int(7));
//!
//! let node: NodeKey = "todos/done".parse().unwrap();
//! assert_eq!(node.collection(), "todos");
//! assert_eq!(node.property(), "done");
//! ```

mod diagnostics;
mod error;
mod key;
mod node;
mod record;

pub use diagnostics::{DataRejection, Diagnostic, Diagnostics};
pub use error::{Error, ErrorKind, Result};
pub use key::Key;
pub use node::NodeKey;
pub use record::{field, Record};

/// Re-exported so downstream crates and hosts agree on one value type.
pub use serde_json::{json, Map, Value};
