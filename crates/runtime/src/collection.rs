//! Runtime state of one collection.

use hashbrown::HashMap;
use indexmap::{IndexMap, IndexSet};
use pulse_core::{Key, Record, Value};
use pulse_reactive::NodeKind;
use pulse_storage::{ForeignLookup, IndexTable, RecordStore, Relation};

use crate::config::{ActionFn, CollectionConfig, FilterFn, LoadFn, RouteFn, WatchFn};

pub(crate) struct Collection {
    pub(crate) records: RecordStore,
    pub(crate) indexes: IndexTable,
    pub(crate) relations: Vec<Relation>,
    /// Current value of every data property, filter output and group
    pub(crate) properties: HashMap<String, Value>,
    pub(crate) data: IndexSet<String>,
    pub(crate) groups: IndexSet<String>,
    pub(crate) filters: IndexMap<String, FilterFn>,
    pub(crate) actions: IndexMap<String, ActionFn>,
    pub(crate) routes: IndexMap<String, RouteFn>,
    pub(crate) watchers: IndexMap<String, Vec<WatchFn>>,
    pub(crate) persist: IndexSet<String>,
    pub(crate) on_load: Option<LoadFn>,
}

impl Collection {
    /// Builds the runtime state; namespace validation has already passed.
    pub(crate) fn from_config(config: &CollectionConfig) -> Self {
        let records = match &config.primary_key {
            Some(field) => RecordStore::with_primary_key(field.clone()),
            None => RecordStore::new(),
        };

        let mut properties = HashMap::new();
        let mut indexes = IndexTable::new();
        for name in &config.indexes {
            indexes.declare(name.clone());
            properties.insert(name.clone(), Value::Array(Vec::new()));
        }
        for (name, value) in &config.data {
            properties.insert(name.clone(), value.clone());
        }

        let mut watchers: IndexMap<String, Vec<WatchFn>> = IndexMap::new();
        for (property, callback) in &config.watch {
            watchers
                .entry(property.clone())
                .or_default()
                .push(callback.clone());
        }

        Self {
            records,
            indexes,
            relations: config.relations.clone(),
            properties,
            data: config.data.iter().map(|(n, _)| n.clone()).collect(),
            groups: config.indexes.iter().cloned().collect(),
            filters: config.filters.iter().cloned().collect(),
            actions: config.actions.iter().cloned().collect(),
            routes: config.routes.iter().cloned().collect(),
            watchers,
            persist: config.persist.iter().cloned().collect(),
            on_load: config.on_load.clone(),
        }
    }

    /// Returns what kind of graph node a property is, if it is declared.
    pub(crate) fn kind_of(&self, property: &str) -> Option<NodeKind> {
        if self.data.contains(property) {
            Some(NodeKind::Data)
        } else if self.filters.contains_key(property) {
            Some(NodeKind::Filter)
        } else if self.groups.contains(property) {
            Some(NodeKind::Group)
        } else {
            None
        }
    }

    /// Returns the declared graph vertices of this collection.
    pub(crate) fn vertices(&self) -> impl Iterator<Item = (&str, NodeKind)> {
        self.data
            .iter()
            .map(|n| (n.as_str(), NodeKind::Data))
            .chain(self.groups.iter().map(|n| (n.as_str(), NodeKind::Group)))
            .chain(self.filters.keys().map(|n| (n.as_str(), NodeKind::Filter)))
    }
}

/// Read-only view over every collection, used to resolve relations.
pub(crate) struct Collections<'a>(pub(crate) &'a IndexMap<String, Collection>);

impl ForeignLookup for Collections<'_> {
    fn foreign_record(&self, collection: &str, key: &Key) -> Option<&Record> {
        self.0.get(collection)?.records.get(key)
    }
}
