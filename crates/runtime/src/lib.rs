//! Pulse Runtime - The reactive collection store.
//!
//! This crate ties records, indexes and the dependency graph together into a
//! [`Store`] that keeps every derived value current as data changes.
//!
//! # Core Components
//!
//! - `StoreBuilder`, `CollectionConfig`: Declaring collections and building the store
//! - `Store`: Mutations (`collect`, `update`, `delete`, `move_keys`, `put`, ...) and reads
//! - `FilterContext`: What a running filter sees; every read becomes a graph edge
//! - `ActionContext`: Mutation routines with throttling and nested dispatch
//! - `RequestClient`: The capability routes issue requests through
//! - `KeyValueStorage`: Where persisted properties are mirrored
//!
//! # Example
//!
//! ```rust
//! use pulse_core::{json, Value};
//! use pulse_runtime::{CollectionConfig, StoreBuilder};
//!
//! let users = CollectionConfig::new("users");
//! let posts = CollectionConfig::new("posts")
//!     .parent("author", "users", None)
//!     .index("feed")
//!     .data("minLikes", json!(1))
//!     .filter("popular", |ctx| {
//!         let min = ctx.local("minLikes").and_then(Value::as_i64).unwrap_or(0);
//!         let feed = ctx.local("feed").and_then(Value::as_array).cloned().unwrap_or_default();
//!         let popular: Vec<Value> = feed
//!             .into_iter()
//!             .filter(|post| post["likes"].as_i64().unwrap_or(0) >= min)
//!             .collect();
//!         Value::Array(popular)
//!     });
//!
//! let mut store = StoreBuilder::new().collection(users).collection(posts).build().unwrap();
//! store.collect("users", [json!({"id": 1, "name": "ana"})], None).unwrap();
//! store
//!     .collect("posts", [json!([
//!         {"id": 10, "author": 1, "likes": 3},
//!         {"id": 11, "author": 1, "likes": 0},
//!     ])], Some("feed"))
//!     .unwrap();
//!
//! let popular = store.get("posts", "popular").unwrap();
//! assert_eq!(popular[0]["users"]["name"], json!("ana"));
//!
//! store.set_data("posts", "minLikes", json!(0)).unwrap();
//! assert_eq!(store.get("posts", "popular").unwrap().as_array().map(Vec::len), Some(2));
//! ```

pub mod action;
mod collection;
pub mod config;
pub mod engine;
mod mutation;
pub mod persist;
mod regen;
pub mod request;
pub mod store;

pub use action::ActionContext;
pub use config::{ActionFn, CollectionConfig, EngineOptions, FilterFn, LoadFn, RouteFn, WatchFn};
pub use engine::FilterContext;
pub use persist::{storage_key, KeyValueStorage, MemoryStorage};
pub use request::{Headers, Method, Request, RequestClient, Response, ResponseFuture};
pub use store::{Store, StoreBuilder};
