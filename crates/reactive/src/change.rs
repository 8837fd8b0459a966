//! Property change notifications.

use pulse_core::{NodeKey, Value};

/// Which slot of a collection a change was written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    /// A mutable data property.
    Data,
    /// A filter output.
    Filter,
    /// The resolved array of a group.
    Group,
    /// The raw key list backing a group.
    IndexKeys,
}

/// A new value written to a collection property.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyChange {
    /// The property that changed.
    pub node: NodeKey,
    /// The slot it was written to.
    pub kind: PropertyKind,
    /// The value after the change.
    pub value: Value,
}

impl PropertyChange {
    /// Creates a change notification.
    pub fn new(node: NodeKey, kind: PropertyKind, value: Value) -> Self {
        Self { node, kind, value }
    }
}
