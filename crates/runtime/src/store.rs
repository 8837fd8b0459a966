//! The store and its builder.
//!
//! A [`Store`] owns every collection, the dependency graph, the regeneration
//! queue and the history log. All state lives in one value passed by `&mut`;
//! hosts that need sharing wrap it themselves.

use std::rc::Rc;
use std::time::Instant;

use hashbrown::HashMap;
use indexmap::{IndexMap, IndexSet};
use pulse_core::{Diagnostics, Error, Key, NodeKey, Record, Result, Value};
use pulse_reactive::{
    DependencyGraph, PropertyChange, PropertyKind, RegenQueue, SubscriptionId, SubscriptionManager,
};
use pulse_storage::{materialize, HistoryLog};

use crate::collection::{Collection, Collections};
use crate::config::{CollectionConfig, EngineOptions};
use crate::persist::{storage_key, KeyValueStorage};
use crate::request::RequestClient;

/// Builds a [`Store`] from collection declarations.
#[derive(Default)]
pub struct StoreBuilder {
    collections: Vec<CollectionConfig>,
    options: EngineOptions,
    storage: Option<Rc<dyn KeyValueStorage>>,
    request: Option<Rc<dyn RequestClient>>,
}

impl StoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collection.
    pub fn collection(mut self, config: CollectionConfig) -> Self {
        self.collections.push(config);
        self
    }

    /// Replaces the engine options.
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the storage used by persisted properties.
    pub fn storage(mut self, storage: Rc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Sets the request capability used by routes.
    pub fn request_client(mut self, client: Rc<dyn RequestClient>) -> Self {
        self.request = Some(client);
        self
    }

    /// Validates the declarations and builds the store.
    ///
    /// Building seeds records, materializes every group and generates every
    /// filter in declaration order. Filters that read a filter declared later
    /// are deferred and settled before this returns.
    pub fn build(self) -> Result<Store> {
        self.validate()?;

        let mut store = Store::new(self.options, self.storage, self.request);
        for config in &self.collections {
            let collection = Collection::from_config(config);
            for (property, kind) in collection.vertices() {
                store
                    .graph
                    .add_node(NodeKey::new(config.name.as_str(), property), kind);
            }
            store.collections.insert(config.name.clone(), collection);
        }

        store.load_persisted();

        for config in &self.collections {
            for (index, records) in &config.records {
                let indexes: Vec<&str> = index.iter().map(String::as_str).collect();
                store.collect_records(&config.name, records.iter().cloned(), &indexes)?;
            }
        }

        let groups: Vec<NodeKey> = store
            .collections
            .iter()
            .flat_map(|(name, c)| c.groups.iter().map(move |g| NodeKey::new(name.as_str(), g.as_str())))
            .collect();
        for group in &groups {
            store.rebuild_group(group);
        }

        let filters: Vec<NodeKey> = store
            .collections
            .iter()
            .flat_map(|(name, c)| c.filters.keys().map(move |f| NodeKey::new(name.as_str(), f.as_str())))
            .collect();
        for filter in &filters {
            store.execute_filter(filter);
        }
        store.process_regen_queue();

        store.ready = true;
        tracing::debug!(
            collections = store.collections.len(),
            nodes = store.graph.len(),
            "store built"
        );

        let hooks: Vec<_> = store
            .collections
            .values()
            .filter_map(|c| c.on_load.clone())
            .collect();
        for hook in hooks {
            hook(&store);
        }
        Ok(store)
    }

    fn validate(&self) -> Result<()> {
        let mut names: IndexSet<&str> = IndexSet::new();
        for config in &self.collections {
            if !names.insert(config.name()) {
                return Err(Error::namespace_conflict(config.name(), config.name()));
            }
        }
        for config in &self.collections {
            if let Some((name, _)) = config.namespace().into_iter().find(|(_, n)| *n > 1) {
                return Err(Error::namespace_conflict(config.name(), name));
            }
            for relation in &config.relations {
                if !names.contains(relation.target_collection()) {
                    return Err(Error::UnknownRelationTarget {
                        collection: config.name().to_string(),
                        field: relation.source_field().to_string(),
                        target: relation.target_collection().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A set of reactive collections.
pub struct Store {
    pub(crate) collections: IndexMap<String, Collection>,
    pub(crate) graph: DependencyGraph,
    pub(crate) queue: RegenQueue,
    pub(crate) history: HistoryLog,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) subscriptions: SubscriptionManager,
    pub(crate) options: EngineOptions,
    pub(crate) storage: Option<Rc<dyn KeyValueStorage>>,
    pub(crate) request: Option<Rc<dyn RequestClient>>,
    /// Expiry of each throttled `(collection, action)`
    pub(crate) throttles: HashMap<(String, String), Instant>,
    pub(crate) performing_action: Option<String>,
    pub(crate) indexes_to_regen: IndexSet<NodeKey>,
    pub(crate) filters_to_force_regen: IndexSet<NodeKey>,
    /// Filter → record it last looked up with `find_by_id`
    pub(crate) record_links: IndexMap<NodeKey, (String, Key)>,
    /// Filter → index it last materialized with `get_group`
    pub(crate) group_links: IndexMap<NodeKey, (String, String)>,
    pending_changes: Vec<PropertyChange>,
    pending_watchers: IndexSet<NodeKey>,
    depth: usize,
    ready: bool,
}

impl Store {
    fn new(
        options: EngineOptions,
        storage: Option<Rc<dyn KeyValueStorage>>,
        request: Option<Rc<dyn RequestClient>>,
    ) -> Self {
        Self {
            collections: IndexMap::new(),
            graph: DependencyGraph::new(),
            queue: RegenQueue::new(),
            history: HistoryLog::new(),
            diagnostics: Diagnostics::new(),
            subscriptions: SubscriptionManager::new(),
            options,
            storage,
            request,
            throttles: HashMap::new(),
            performing_action: None,
            indexes_to_regen: IndexSet::new(),
            filters_to_force_regen: IndexSet::new(),
            record_links: IndexMap::new(),
            group_links: IndexMap::new(),
            pending_changes: Vec::new(),
            pending_watchers: IndexSet::new(),
            depth: 0,
            ready: false,
        }
    }

    /// Returns the builder.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Names of every collection, in declaration order.
    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Current value of a data property, filter output or group.
    pub fn get(&self, collection: &str, property: &str) -> Option<&Value> {
        self.collections.get(collection)?.properties.get(property)
    }

    pub(crate) fn property(&self, node: &NodeKey) -> Option<&Value> {
        self.get(node.collection(), node.property())
    }

    /// Looks up a record by primary key.
    pub fn find_by_id(&self, collection: &str, key: impl Into<Key>) -> Option<&Record> {
        let key = key.into();
        let found = self.collections.get(collection)?.records.get(&key);
        if found.is_none() {
            tracing::debug!(collection, %key, "record not found");
        }
        found
    }

    /// Freshly materializes an index. An undeclared index yields an empty group.
    pub fn get_group(&self, collection: &str, index: &str) -> Vec<Value> {
        let Some(target) = self.collections.get(collection) else {
            return Vec::new();
        };
        target
            .indexes
            .keys(index)
            .map(|keys| {
                materialize(
                    keys,
                    &target.records,
                    &target.relations,
                    &Collections(&self.collections),
                )
            })
            .unwrap_or_default()
    }

    /// Key list of an index.
    pub fn index_keys(&self, collection: &str, index: &str) -> Option<&[Key]> {
        self.collections.get(collection)?.indexes.keys(index)
    }

    /// Names of every index of a collection.
    pub fn index_names(&self, collection: &str) -> Vec<&str> {
        self.collections
            .get(collection)
            .map(|c| c.indexes.names().collect())
            .unwrap_or_default()
    }

    /// Number of records in a collection.
    pub fn collection_size(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map_or(0, |c| c.records.len())
    }

    /// Primary-key field of a collection, once declared or discovered.
    pub fn primary_key(&self, collection: &str) -> Option<&str> {
        self.collections.get(collection)?.records.primary_key()
    }

    /// Every mutation applied so far.
    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Every problem reported so far.
    pub fn errors(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn queue(&self) -> &RegenQueue {
        &self.queue
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Nodes `node` was computed from.
    pub fn dependencies(&self, node: &NodeKey) -> Vec<NodeKey> {
        self.graph
            .node(node)
            .map(|n| n.dependencies().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Nodes that read `node`.
    pub fn dependents(&self, node: &NodeKey) -> Vec<NodeKey> {
        self.graph
            .node(node)
            .map(|n| n.dependents().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Name of the action currently executing, if any.
    pub fn performing_action(&self) -> Option<&str> {
        self.performing_action.as_deref()
    }

    /// Subscribes to changes of one property.
    ///
    /// Callbacks run after the outermost store operation returns, once per
    /// change, in the order the changes happened.
    pub fn subscribe<F>(&mut self, collection: &str, property: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&PropertyChange) + 'static,
    {
        self.subscriptions
            .subscribe(NodeKey::new(collection, property), callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.unsubscribe(id)
    }

    /// Writes a property slot and schedules its notifications.
    pub(crate) fn deliver(&mut self, node: &NodeKey, kind: PropertyKind, value: Value) {
        let Some(collection) = self.collections.get_mut(node.collection()) else {
            return;
        };
        let persisted = collection.persist.contains(node.property());
        let watched = collection.watchers.contains_key(node.property());
        if kind != PropertyKind::IndexKeys {
            collection
                .properties
                .insert(node.property().to_string(), value.clone());
            if persisted {
                self.persist_value(node, &value);
            }
            if watched && self.ready {
                self.pending_watchers.insert(node.clone());
            }
        }
        if self.ready {
            self.pending_changes
                .push(PropertyChange::new(node.clone(), kind, value));
        }
    }

    /// Runs `op` as one store operation.
    ///
    /// Notifications are held until the outermost operation finishes.
    pub(crate) fn scoped<T>(&mut self, op: impl FnOnce(&mut Self) -> T) -> T {
        self.depth += 1;
        let result = op(self);
        self.depth -= 1;
        if self.depth == 0 && self.ready {
            self.flush_notifications();
        }
        result
    }

    fn flush_notifications(&mut self) {
        let changes = std::mem::take(&mut self.pending_changes);
        for change in &changes {
            self.subscriptions.notify_all(change);
        }

        let watched = std::mem::take(&mut self.pending_watchers);
        for node in watched {
            let callbacks = self
                .collections
                .get(node.collection())
                .and_then(|c| c.watchers.get(node.property()))
                .cloned()
                .unwrap_or_default();
            for callback in callbacks {
                callback(self);
            }
        }
    }

    /// Resolves a collection or reports it missing.
    pub(crate) fn require(&mut self, collection: &str) -> Result<()> {
        if self.collections.contains_key(collection) {
            Ok(())
        } else {
            Err(self.fail(Error::collection_not_found(collection)))
        }
    }

    /// Reports an error and hands it back for returning.
    pub(crate) fn fail(&mut self, error: Error) -> Error {
        self.diagnostics.report(&error);
        error
    }

    fn load_persisted(&mut self) {
        let mut targets = Vec::new();
        for (name, collection) in &self.collections {
            for property in &collection.persist {
                targets.push((
                    NodeKey::new(name.as_str(), property.as_str()),
                    collection.kind_of(property).is_some(),
                ));
            }
        }
        if targets.is_empty() {
            return;
        }
        let Some(storage) = self.storage.clone() else {
            self.diagnostics
                .warn("No storage API present, data will not persist");
            return;
        };

        for (node, declared) in targets {
            if !declared {
                let error = Error::property_not_found(node.collection(), node.property());
                self.diagnostics.report(&error);
                continue;
            }
            let key = storage_key(node.collection(), node.property());
            match storage.get(&key) {
                Some(text) => match serde_json::from_str::<Value>(&text) {
                    Ok(value) => {
                        tracing::debug!(property = %node, "restored persisted value");
                        if let Some(collection) = self.collections.get_mut(node.collection()) {
                            collection
                                .properties
                                .insert(node.property().to_string(), value);
                        }
                    }
                    Err(error) => self.diagnostics.report(&Error::from(error)),
                },
                None => {
                    if let Some(value) = self.property(&node).cloned() {
                        self.persist_value(&node, &value);
                    }
                }
            }
        }
    }

    fn persist_value(&mut self, node: &NodeKey, value: &Value) {
        let Some(storage) = &self.storage else {
            return;
        };
        match serde_json::to_string(value) {
            Ok(text) => storage.set(&storage_key(node.collection(), node.property()), text),
            Err(error) => self.diagnostics.report(&Error::from(error)),
        }
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("collections", &self.collections.keys().collect::<Vec<_>>())
            .field("nodes", &self.graph.len())
            .field("pending", &self.queue.len())
            .field("history", &self.history.len())
            .finish()
    }
}
