//! Record-store mutations.
//!
//! Every mutation appends one history entry, marks the groups it touched as
//! stale and runs the regeneration pipeline before returning. Problems are
//! reported to the diagnostics sink; the mutation applies whatever part of
//! it is valid.

use std::collections::BTreeMap;

use pulse_core::{Error, Key, NodeKey, Record, Result, Value};
use pulse_reactive::{NodeKind, PropertyKind};
use pulse_storage::Mutation;

use crate::store::Store;

const NOT_AN_OBJECT: &str = "Record must be an object";

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

impl Store {
    /// Adds or replaces records, optionally appending their keys to an index.
    ///
    /// Arrays are flattened one level. Records without a usable primary key
    /// are rejected to the error sink. Returns how many records were stored.
    pub fn collect<I>(&mut self, collection: &str, records: I, index: Option<&str>) -> Result<usize>
    where
        I: IntoIterator<Item = Value>,
    {
        self.collect_into(collection, records, index.as_slice())
    }

    /// Same as [`Store::collect`] with any number of target indexes.
    ///
    /// Indexes that do not exist yet are created.
    pub fn collect_into<I>(&mut self, collection: &str, records: I, indexes: &[&str]) -> Result<usize>
    where
        I: IntoIterator<Item = Value>,
    {
        self.scoped(|store| store.collect_records(collection, records, indexes))
    }

    pub(crate) fn collect_records<I>(&mut self, collection: &str, records: I, indexes: &[&str]) -> Result<usize>
    where
        I: IntoIterator<Item = Value>,
    {
        self.require(collection)?;
        let conflict = self.collections.get(collection).and_then(|target| {
            indexes.iter().find(|index| {
                let kind = target.kind_of(index);
                (kind.is_some() && kind != Some(NodeKind::Group)) || target.actions.contains_key(**index)
            })
        });
        if let Some(index) = conflict {
            return Err(self.fail(Error::namespace_conflict(collection, *index)));
        }

        let candidates = self.options.primary_key_candidates.clone();
        let mut indexes_created = Vec::new();
        let mut indexes_modified = Vec::new();
        let mut collected = Vec::new();
        let mut keys = Vec::new();
        {
            let Store {
                collections,
                diagnostics,
                indexes_to_regen,
                ..
            } = self;
            let target = collections
                .get_mut(collection)
                .ok_or_else(|| Error::collection_not_found(collection))?;

            for index in indexes {
                if target.indexes.declare(*index) {
                    tracing::debug!(collection, index, "created index");
                    indexes_created.push(index.to_string());
                } else {
                    indexes_modified.push(index.to_string());
                }
                indexes_to_regen.insert(NodeKey::new(collection, *index));
            }

            for value in flatten(records) {
                let record = match value {
                    Value::Object(record) => record,
                    other => {
                        diagnostics.reject(collection, other, NOT_AN_OBJECT);
                        continue;
                    }
                };
                let key = match target.records.admit(&record, &candidates) {
                    Ok(key) => key,
                    Err(message) => {
                        diagnostics.reject(collection, Value::Object(record), message);
                        continue;
                    }
                };
                for index in indexes {
                    target.indexes.push_unique(index, key.clone());
                }
                if target.records.contains(&key) {
                    for name in target.indexes.containing(&key) {
                        indexes_to_regen.insert(NodeKey::new(collection, name));
                    }
                }
                collected.push(Value::Object(record.clone()));
                target.records.upsert(key.clone(), record);
                keys.push(key);
            }
        }

        for key in &keys {
            self.link_filters(collection, key);
        }
        let count = collected.len();
        self.history.record(
            collection,
            self.performing_action.as_deref(),
            Mutation::Collect {
                data_collected: collected,
                indexes_created,
                indexes_modified,
            },
        );
        tracing::debug!(collection, count, "collected records");
        self.regenerate_groups_and_filters();
        Ok(count)
    }

    /// Merges `patch` into one record.
    ///
    /// Fields the record does not have are added with a validation warning.
    /// Changing the primary-key field is refused for that field.
    pub fn update(&mut self, collection: &str, key: impl Into<Key>, patch: Value) -> Result<()> {
        let key = key.into();
        self.scoped(|store| store.update_record(collection, key, patch))
    }

    fn update_record(&mut self, collection: &str, key: Key, patch: Value) -> Result<()> {
        self.require_record(collection, &key)?;
        let Value::Object(patch) = patch else {
            return Err(self.fail(Error::InvalidPatch {
                collection: collection.to_string(),
                key,
            }));
        };

        let mut previous_values = BTreeMap::new();
        let mut new_values = Record::new();
        let mut warnings = Vec::new();
        if let Some(target) = self.collections.get_mut(collection) {
            let primary_key = target.records.primary_key().map(str::to_string);
            if let Some(record) = target.records.get_mut(&key) {
                for (field, value) in patch {
                    if primary_key.as_deref() == Some(field.as_str()) && record.get(&field) != Some(&value) {
                        warnings.push(format!(
                            "cannot change primary key \"{}\" of \"{}\" in collection {}",
                            field, key, collection
                        ));
                        continue;
                    }
                    if !record.contains_key(&field) {
                        warnings.push(format!(
                            "data \"{}\" does not have property \"{}\" to update",
                            key, field
                        ));
                    }
                    let previous = record.insert(field.clone(), value.clone());
                    previous_values.insert(field.clone(), previous);
                    new_values.insert(field, value);
                }
            }
        }
        for warning in warnings {
            self.diagnostics.warn(warning);
        }

        self.history.record(
            collection,
            self.performing_action.as_deref(),
            Mutation::Update {
                key: key.clone(),
                previous_values,
                new_values,
            },
        );
        self.internal_data_modified(collection, &key);
        Ok(())
    }

    /// Deletes records and removes their keys from every index.
    ///
    /// Unknown keys are reported and skipped. Returns how many were deleted.
    pub fn delete<K>(&mut self, collection: &str, keys: impl IntoIterator<Item = K>) -> Result<usize>
    where
        K: Into<Key>,
    {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();
        self.scoped(|store| store.delete_records(collection, keys))
    }

    fn delete_records(&mut self, collection: &str, keys: Vec<Key>) -> Result<usize> {
        self.require(collection)?;
        let mut deleted = 0;
        for key in keys {
            let removed = self.collections.get_mut(collection).and_then(|target| {
                let record = target.records.remove(&key)?;
                Some((record, target.indexes.remove_everywhere(&key)))
            });
            let Some((record, touched)) = removed else {
                self.diagnostics
                    .report(&Error::record_not_found(collection, key));
                continue;
            };
            for index in touched {
                self.indexes_to_regen
                    .insert(NodeKey::new(collection, index));
            }
            self.history.record(
                collection,
                self.performing_action.as_deref(),
                Mutation::Delete {
                    key: key.clone(),
                    deleted: record,
                },
            );
            self.internal_data_modified(collection, &key);
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Moves keys from one index to another.
    ///
    /// Stops at the first key without a record; keys moved before it stay
    /// moved and the error is returned.
    pub fn move_keys<K>(
        &mut self,
        collection: &str,
        keys: impl IntoIterator<Item = K>,
        from: &str,
        to: &str,
    ) -> Result<()>
    where
        K: Into<Key>,
    {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();
        self.scoped(|store| store.move_records(collection, keys, from, to))
    }

    fn move_records(&mut self, collection: &str, keys: Vec<Key>, from: &str, to: &str) -> Result<()> {
        self.require_index(collection, from)?;
        self.require_index(collection, to)?;

        let mut moved = Vec::new();
        let mut failure = None;
        if let Some(target) = self.collections.get_mut(collection) {
            for key in keys {
                if !target.records.contains(&key) {
                    failure = Some(Error::record_not_found(collection, key));
                    break;
                }
                target.indexes.remove_key(from, &key);
                target.indexes.push_unique(to, key.clone());
                moved.push(key);
            }
        }

        if !moved.is_empty() {
            self.history.record(
                collection,
                self.performing_action.as_deref(),
                Mutation::Move {
                    keys: moved,
                    previous_source_index: from.to_string(),
                    previous_dest_index: to.to_string(),
                },
            );
            self.indexes_to_regen.insert(NodeKey::new(collection, from));
            self.indexes_to_regen.insert(NodeKey::new(collection, to));
            self.regenerate_groups_and_filters();
        }
        match failure {
            Some(error) => Err(self.fail(error)),
            None => Ok(()),
        }
    }

    /// Appends keys to an index, skipping keys already in it.
    ///
    /// Stops at the first key without a record, like [`Store::move_keys`].
    pub fn put<K>(&mut self, collection: &str, keys: impl IntoIterator<Item = K>, to: &str) -> Result<()>
    where
        K: Into<Key>,
    {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();
        self.scoped(|store| store.put_records(collection, keys, to))
    }

    fn put_records(&mut self, collection: &str, keys: Vec<Key>, to: &str) -> Result<()> {
        self.require_index(collection, to)?;

        let mut put = Vec::new();
        let mut previous_dest_keys = Vec::new();
        let mut failure = None;
        if let Some(target) = self.collections.get_mut(collection) {
            previous_dest_keys = target.indexes.keys(to).map(<[Key]>::to_vec).unwrap_or_default();
            for key in keys {
                if !target.records.contains(&key) {
                    failure = Some(Error::record_not_found(collection, key));
                    break;
                }
                target.indexes.push_unique(to, key.clone());
                put.push(key);
            }
        }

        if !put.is_empty() {
            self.history.record(
                collection,
                self.performing_action.as_deref(),
                Mutation::Put {
                    keys: put,
                    dest_index: to.to_string(),
                    previous_dest_keys,
                },
            );
            self.indexes_to_regen.insert(NodeKey::new(collection, to));
            self.regenerate_groups_and_filters();
        }
        match failure {
            Some(error) => Err(self.fail(error)),
            None => Ok(()),
        }
    }

    /// Declares a new index from a literal key list.
    ///
    /// Nothing is regenerated.
    pub fn new_group<K>(&mut self, collection: &str, name: &str, keys: impl IntoIterator<Item = K>) -> Result<()>
    where
        K: Into<Key>,
    {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();
        self.scoped(|store| {
            store.require(collection)?;
            let created = store.collections.get_mut(collection).is_some_and(|target| {
                let taken = target.kind_of(name).is_some() || target.actions.contains_key(name);
                !taken && target.indexes.create_from(name, keys.iter().cloned())
            });
            if !created {
                return Err(store.fail(Error::namespace_conflict(collection, name)));
            }
            store.history.record(
                collection,
                store.performing_action.as_deref(),
                Mutation::NewGroup {
                    created_group: name.to_string(),
                    keys,
                },
            );
            store.indexes_to_regen.insert(NodeKey::new(collection, name));
            store.regenerate_groups_and_filters();
            Ok(())
        })
    }

    /// Adds `amount` to a numeric field.
    pub fn increment(
        &mut self,
        collection: &str,
        key: impl Into<Key>,
        field: &str,
        amount: impl Into<Value>,
    ) -> Result<()> {
        let (key, amount) = (key.into(), amount.into());
        self.scoped(|store| store.step_field(collection, key, field, amount, Direction::Up))
    }

    /// Subtracts `amount` from a numeric field.
    pub fn decrement(
        &mut self,
        collection: &str,
        key: impl Into<Key>,
        field: &str,
        amount: impl Into<Value>,
    ) -> Result<()> {
        let (key, amount) = (key.into(), amount.into());
        self.scoped(|store| store.step_field(collection, key, field, amount, Direction::Down))
    }

    fn step_field(
        &mut self,
        collection: &str,
        key: Key,
        field: &str,
        amount: Value,
        direction: Direction,
    ) -> Result<()> {
        self.require_record(collection, &key)?;
        let previous = self
            .collections
            .get(collection)
            .and_then(|target| target.records.get(&key))
            .and_then(|record| record.get(field))
            .cloned();
        let next = previous
            .as_ref()
            .and_then(|current| step_value(current, &amount, direction));
        let (Some(previous_value), Some(next)) = (previous, next) else {
            return Err(self.fail(Error::NotNumeric {
                collection: collection.to_string(),
                key,
                field: field.to_string(),
            }));
        };

        if let Some(record) = self
            .collections
            .get_mut(collection)
            .and_then(|target| target.records.get_mut(&key))
        {
            record.insert(field.to_string(), next);
        }
        let (key_copy, field) = (key.clone(), field.to_string());
        let mutation = match direction {
            Direction::Up => Mutation::Increment {
                key: key_copy,
                field,
                amount,
                previous_value,
            },
            Direction::Down => Mutation::Decrement {
                key: key_copy,
                field,
                amount,
                previous_value,
            },
        };
        self.history
            .record(collection, self.performing_action.as_deref(), mutation);
        self.internal_data_modified(collection, &key);
        Ok(())
    }

    /// Writes a data property and regenerates everything that reads it.
    pub fn set_data(&mut self, collection: &str, property: &str, value: Value) -> Result<()> {
        self.scoped(|store| {
            store.require(collection)?;
            match store
                .collections
                .get(collection)
                .and_then(|target| target.kind_of(property))
            {
                Some(NodeKind::Data) => {}
                Some(_) => {
                    return Err(store.fail(Error::ReadOnlyProperty {
                        collection: collection.to_string(),
                        property: property.to_string(),
                    }))
                }
                None => return Err(store.fail(Error::property_not_found(collection, property))),
            }

            let node = NodeKey::new(collection, property);
            store.deliver(&node, PropertyKind::Data, value);
            store.find_and_update_dependents(std::slice::from_ref(&node));
            store.process_regen_queue();
            Ok(())
        })
    }

    /// Regenerates one filter and whatever its new output changes.
    pub fn force_update(&mut self, collection: &str, filter: &str) -> Result<()> {
        self.scoped(|store| {
            store.require(collection)?;
            let known = store
                .collections
                .get(collection)
                .is_some_and(|target| target.filters.contains_key(filter));
            if !known {
                return Err(store.fail(Error::FilterNotFound {
                    collection: collection.to_string(),
                    filter: filter.to_string(),
                }));
            }
            store.queue.enqueue(NodeKey::new(collection, filter));
            store.process_regen_queue();
            Ok(())
        })
    }

    /// Marks groups holding `key` and filters linked to it, then regenerates.
    fn internal_data_modified(&mut self, collection: &str, key: &Key) {
        if let Some(target) = self.collections.get(collection) {
            for index in target.indexes.containing(key) {
                self.indexes_to_regen
                    .insert(NodeKey::new(collection, index));
            }
        }
        self.link_filters(collection, key);
        self.regenerate_groups_and_filters();
    }

    fn require_record(&mut self, collection: &str, key: &Key) -> Result<()> {
        self.require(collection)?;
        let found = self
            .collections
            .get(collection)
            .is_some_and(|target| target.records.contains(key));
        if found {
            Ok(())
        } else {
            Err(self.fail(Error::record_not_found(collection, key.clone())))
        }
    }

    fn require_index(&mut self, collection: &str, index: &str) -> Result<()> {
        self.require(collection)?;
        let found = self
            .collections
            .get(collection)
            .is_some_and(|target| target.indexes.contains_index(index));
        if found {
            Ok(())
        } else {
            Err(self.fail(Error::index_not_found(collection, index)))
        }
    }
}

fn flatten(records: impl IntoIterator<Item = Value>) -> Vec<Value> {
    let mut flat = Vec::new();
    for value in records {
        match value {
            Value::Array(items) => flat.extend(items),
            other => flat.push(other),
        }
    }
    flat
}

/// Integer arithmetic while both sides are integers and it does not
/// overflow; floating point otherwise.
fn step_value(current: &Value, amount: &Value, direction: Direction) -> Option<Value> {
    if let (Some(a), Some(b)) = (current.as_i64(), amount.as_i64()) {
        let stepped = match direction {
            Direction::Up => a.checked_add(b),
            Direction::Down => a.checked_sub(b),
        };
        if let Some(value) = stepped {
            return Some(Value::from(value));
        }
    }
    let (a, b) = (current.as_f64()?, amount.as_f64()?);
    let stepped = match direction {
        Direction::Up => a + b,
        Direction::Down => a - b,
    };
    serde_json::Number::from_f64(stepped).map(Value::Number)
}
