//! Pulse Reactive - Dependency tracking and regeneration for Pulse.
//!
//! This crate implements the reactive half of the store: which derived values
//! read which properties, and in what order stale values are recomputed.
//!
//! # Core Concepts
//!
//! - `DependencyRecorder`: Recording mode; logs property reads during a filter run
//! - `DependencyGraph`: `collection/property` nodes with dependency/dependent edges
//! - `RegenQueue`: Deduplicating FIFO of filters awaiting re-execution
//! - `SubscriptionManager`: Callbacks notified of property changes
//!
//! # Example
//!
//! ```rust
//! use pulse_core::NodeKey;
//! use pulse_reactive::{DependencyGraph, DependencyRecorder, EdgePolicy, NodeKind};
//!
//! let data = NodeKey::new("todos", "items");
//! let filter = NodeKey::new("todos", "count");
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node(data.clone(), NodeKind::Data);
//! graph.add_node(filter.clone(), NodeKind::Filter);
//!
//! // Record the reads made while the filter runs
//! let recorder = DependencyRecorder::new();
//! recorder.start();
//! recorder.record(data.clone());
//! let found = recorder.finish();
//!
//! graph.populate(&filter, &found, EdgePolicy::Accumulate);
//! let search = graph.find_all_dependents(&data, 1000);
//! assert_eq!(search.nodes, vec![filter]);
//! ```

pub mod change;
pub mod graph;
pub mod queue;
pub mod recorder;
pub mod subscription;

pub use change::{PropertyChange, PropertyKind};
pub use graph::{DependencyGraph, DependentSearch, EdgePolicy, GraphNode, NodeKind};
pub use queue::{RegenQueue, Step};
pub use recorder::DependencyRecorder;
pub use subscription::{ChangeCallback, Subscription, SubscriptionId, SubscriptionManager};
