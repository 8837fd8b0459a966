//! Record storage for a single collection.
//!
//! This module provides the `RecordStore` struct which owns the keyed record
//! table of one collection. The primary-key field is either declared up front
//! or discovered from the first record that carries one of the candidate
//! field names; once fixed it never changes.

use hashbrown::HashMap;
use pulse_core::{Key, Record};

/// Conventional primary-key field names probed when none is declared.
pub const DEFAULT_PRIMARY_KEYS: &[&str] = &["id", "_id"];

const NO_PRIMARY_KEY: &str = "No primary key supplied.";
const PRIMARY_KEY_MISMATCH: &str = "Primary key mismatch";
const PRIMARY_KEY_TYPE: &str = "Primary key must be an integer or a string";

/// Keyed record table for one collection.
#[derive(Clone, Debug, Default)]
pub struct RecordStore {
    /// Name of the primary-key field, once known.
    primary_key: Option<String>,
    /// Primary key → record.
    records: HashMap<Key, Record>,
}

impl RecordStore {
    /// Creates an empty store whose primary key will be discovered lazily.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with a declared primary-key field.
    pub fn with_primary_key(field: impl Into<String>) -> Self {
        Self {
            primary_key: Some(field.into()),
            records: HashMap::new(),
        }
    }

    /// Returns the primary-key field, if known.
    #[inline]
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    /// Fixes the primary key from the first candidate present on `record`.
    ///
    /// Does nothing if the primary key is already known.
    pub fn discover_primary_key<S: AsRef<str>>(&mut self, record: &Record, candidates: &[S]) {
        if self.primary_key.is_some() {
            return;
        }
        self.primary_key = candidates
            .iter()
            .map(AsRef::as_ref)
            .find(|name| record.contains_key(*name))
            .map(Into::into);
    }

    /// Reads the primary key of `record`.
    ///
    /// Returns the rejection message if the record cannot be stored.
    pub fn key_of(&self, record: &Record) -> Result<Key, &'static str> {
        let field = self.primary_key.as_deref().ok_or(NO_PRIMARY_KEY)?;
        let value = record.get(field).ok_or(PRIMARY_KEY_MISMATCH)?;
        Key::from_value(value).ok_or(PRIMARY_KEY_TYPE)
    }

    /// Discovers the primary key if needed, then reads the key of `record`.
    pub fn admit<S: AsRef<str>>(
        &mut self,
        record: &Record,
        candidates: &[S],
    ) -> Result<Key, &'static str> {
        self.discover_primary_key(record, candidates);
        self.key_of(record)
    }

    /// Inserts or replaces a record, returning the previous one.
    pub fn upsert(&mut self, key: Key, record: Record) -> Option<Record> {
        self.records.insert(key, record)
    }

    /// Gets a record by key.
    #[inline]
    pub fn get(&self, key: &Key) -> Option<&Record> {
        self.records.get(key)
    }

    /// Gets a mutable record by key.
    #[inline]
    pub fn get_mut(&mut self, key: &Key) -> Option<&mut Record> {
        self.records.get_mut(key)
    }

    /// Returns true if a record with this key exists.
    #[inline]
    pub fn contains(&self, key: &Key) -> bool {
        self.records.contains_key(key)
    }

    /// Removes a record by key, returning it.
    pub fn remove(&mut self, key: &Key) -> Option<Record> {
        self.records.remove(key)
    }

    /// Returns the number of records.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the store is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates over all records in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Record)> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_discover_first_candidate_wins() {
        let mut store = RecordStore::new();
        store.discover_primary_key(&record(json!({"_id": "a", "id": 1})), DEFAULT_PRIMARY_KEYS);
        assert_eq!(store.primary_key(), Some("id"));
    }

    #[test]
    fn test_discover_is_fixed_once_known() {
        let mut store = RecordStore::new();
        store.discover_primary_key(&record(json!({"_id": "a"})), DEFAULT_PRIMARY_KEYS);
        store.discover_primary_key(&record(json!({"id": 1})), DEFAULT_PRIMARY_KEYS);
        assert_eq!(store.primary_key(), Some("_id"));
    }

    #[test]
    fn test_declared_primary_key_not_overridden() {
        let mut store = RecordStore::with_primary_key("uuid");
        store.discover_primary_key(&record(json!({"id": 1})), DEFAULT_PRIMARY_KEYS);
        assert_eq!(store.primary_key(), Some("uuid"));
    }

    #[test]
    fn test_admit_rejections() {
        let mut store = RecordStore::new();
        assert_eq!(
            store.admit(&record(json!({"name": "x"})), DEFAULT_PRIMARY_KEYS),
            Err(NO_PRIMARY_KEY)
        );
        assert_eq!(store.primary_key(), None);

        assert_eq!(
            store.admit(&record(json!({"id": 1})), DEFAULT_PRIMARY_KEYS),
            Ok(Key::Int(1))
        );
        assert_eq!(
            store.admit(&record(json!({"_id": 2})), DEFAULT_PRIMARY_KEYS),
            Err(PRIMARY_KEY_MISMATCH)
        );
        assert_eq!(
            store.admit(&record(json!({"id": [1]})), DEFAULT_PRIMARY_KEYS),
            Err(PRIMARY_KEY_TYPE)
        );
    }

    #[test]
    fn test_upsert_replaces() {
        let mut store = RecordStore::with_primary_key("id");
        assert!(store
            .upsert(Key::Int(1), record(json!({"id": 1, "v": "a"})))
            .is_none());
        let previous = store.upsert(Key::Int(1), record(json!({"id": 1, "v": "b"})));

        assert_eq!(previous.unwrap()["v"], json!("a"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&Key::Int(1)).unwrap()["v"], json!("b"));
    }

    #[test]
    fn test_remove() {
        let mut store = RecordStore::with_primary_key("id");
        store.upsert(Key::Int(1), record(json!({"id": 1})));
        assert!(store.remove(&Key::Int(1)).is_some());
        assert!(store.remove(&Key::Int(1)).is_none());
        assert!(store.is_empty());
    }
}
