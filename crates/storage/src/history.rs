//! History log for Pulse collections.
//!
//! Every record-store mutation appends one `HistoryEntry`. Entries are never
//! pruned or rewritten. Each entry keeps the values needed to reverse it, but
//! nothing in the store reads them back.

use chrono::{DateTime, Utc};
use pulse_core::{Key, Record, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// The kind of a recorded mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationType {
    Collect,
    Update,
    Delete,
    Move,
    Put,
    NewGroup,
    Increment,
    Decrement,
}

/// A single recorded mutation and its reversal payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Mutation {
    /// Records were collected.
    Collect {
        data_collected: Vec<Value>,
        indexes_created: Vec<String>,
        indexes_modified: Vec<String>,
    },
    /// Fields of one record were changed. `None` marks a field that did not exist.
    Update {
        key: Key,
        previous_values: BTreeMap<String, Option<Value>>,
        new_values: Record,
    },
    /// A record was deleted.
    Delete { key: Key, deleted: Record },
    /// Keys were moved between indexes.
    Move {
        keys: Vec<Key>,
        previous_source_index: String,
        previous_dest_index: String,
    },
    /// Keys were appended to an index.
    Put {
        keys: Vec<Key>,
        dest_index: String,
        previous_dest_keys: Vec<Key>,
    },
    /// An index was declared from a literal key list.
    NewGroup { created_group: String, keys: Vec<Key> },
    /// A numeric field was incremented.
    Increment {
        key: Key,
        field: String,
        amount: Value,
        previous_value: Value,
    },
    /// A numeric field was decremented.
    Decrement {
        key: Key,
        field: String,
        amount: Value,
        previous_value: Value,
    },
}

impl Mutation {
    /// Returns the kind of this mutation.
    pub fn kind(&self) -> MutationType {
        match self {
            Mutation::Collect { .. } => MutationType::Collect,
            Mutation::Update { .. } => MutationType::Update,
            Mutation::Delete { .. } => MutationType::Delete,
            Mutation::Move { .. } => MutationType::Move,
            Mutation::Put { .. } => MutationType::Put,
            Mutation::NewGroup { .. } => MutationType::NewGroup,
            Mutation::Increment { .. } => MutationType::Increment,
            Mutation::Decrement { .. } => MutationType::Decrement,
        }
    }
}

/// An immutable history record.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// What happened.
    pub mutation: Mutation,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// Collection that was mutated.
    pub collection: String,
    /// Action that was running, if any.
    pub from_action: Option<String>,
}

impl HistoryEntry {
    /// Returns the kind of the recorded mutation.
    #[inline]
    pub fn kind(&self) -> MutationType {
        self.mutation.kind()
    }
}

/// Append-only mutation journal shared by all collections.
#[derive(Clone, Debug, Default)]
pub struct HistoryLog {
    entries: Vec<HistoryEntry>,
}

impl HistoryLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry stamped with the current time.
    pub fn record(&mut self, collection: &str, from_action: Option<&str>, mutation: Mutation) {
        tracing::trace!(collection, kind = ?mutation.kind(), "recording history");
        self.entries.push(HistoryEntry {
            mutation,
            timestamp: Utc::now(),
            collection: collection.into(),
            from_action: from_action.map(Into::into),
        });
    }

    /// Returns all entries in order.
    #[inline]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Returns the most recent entry.
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    /// Iterates over entries of one kind.
    pub fn of_type(&self, kind: MutationType) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().filter(move |e| e.kind() == kind)
    }

    /// Iterates over entries of one collection.
    pub fn for_collection<'a>(&'a self, collection: &'a str) -> impl Iterator<Item = &'a HistoryEntry> {
        self.entries.iter().filter(move |e| e.collection == collection)
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
