//! Construction-time configuration.
//!
//! A store is built from one `CollectionConfig` per collection plus
//! store-wide `EngineOptions`. Everything a collection declares (data
//! properties, indexes, filters, actions) is fixed once the store is built.

use std::rc::Rc;

use indexmap::IndexMap;
use pulse_core::Value;
use pulse_reactive::EdgePolicy;
use pulse_storage::{Relation, DEFAULT_PRIMARY_KEYS};
use serde::{Deserialize, Serialize};

use crate::action::ActionContext;
use crate::engine::FilterContext;
use crate::request::{RequestClient, ResponseFuture};
use crate::store::Store;

/// A derived computation over the visible state of every collection.
pub type FilterFn = Rc<dyn Fn(&FilterContext<'_>) -> Value>;
/// A named mutation routine.
pub type ActionFn = Rc<dyn Fn(&mut ActionContext<'_>, Value) -> pulse_core::Result<Value>>;
/// A named request routine.
pub type RouteFn = Rc<dyn Fn(&dyn RequestClient, Value) -> ResponseFuture>;
/// Invoked after a watched property has been regenerated.
pub type WatchFn = Rc<dyn Fn(&Store)>;
/// Invoked once the store has finished building.
pub type LoadFn = Rc<dyn Fn(&Store)>;

/// Store-wide engine tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Expansion rounds allowed when collecting transitive dependents.
    pub max_dependent_rounds: usize,
    /// Filter executions allowed in one queue drain.
    pub max_drain_executions: usize,
    /// How a filter's edges change when it regenerates.
    pub edge_policy: EdgePolicy,
    /// Field names probed, in order, when a collection declares no primary key.
    pub primary_key_candidates: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_dependent_rounds: 1000,
            max_drain_executions: 10_000,
            edge_policy: EdgePolicy::Accumulate,
            primary_key_candidates: DEFAULT_PRIMARY_KEYS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Declaration of one collection.
///
/// # Example
///
/// ```rust
/// use pulse_runtime::{CollectionConfig, StoreBuilder};
/// use pulse_core::json;
///
/// let todos = CollectionConfig::new("todos")
///     .data("filterText", json!(""))
///     .index("open")
///     .filter("openCount", |ctx| {
///         let open = ctx.local("open").and_then(|v| v.as_array()).map(Vec::len);
///         json!(open.unwrap_or(0))
///     });
///
/// let mut store = StoreBuilder::new().collection(todos).build().unwrap();
/// store.collect("todos", [json!({"id": 1, "title": "write"})], Some("open")).unwrap();
/// assert_eq!(store.get("todos", "openCount"), Some(&json!(1)));
/// ```
#[derive(Clone)]
pub struct CollectionConfig {
    pub(crate) name: String,
    pub(crate) primary_key: Option<String>,
    pub(crate) relations: Vec<Relation>,
    pub(crate) data: Vec<(String, Value)>,
    pub(crate) records: Vec<(Option<String>, Vec<Value>)>,
    pub(crate) indexes: Vec<String>,
    pub(crate) filters: Vec<(String, FilterFn)>,
    pub(crate) actions: Vec<(String, ActionFn)>,
    pub(crate) routes: Vec<(String, RouteFn)>,
    pub(crate) watch: Vec<(String, WatchFn)>,
    pub(crate) persist: Vec<String>,
    pub(crate) on_load: Option<LoadFn>,
}

impl CollectionConfig {
    /// Starts the declaration of a collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: None,
            relations: Vec::new(),
            data: Vec::new(),
            records: Vec::new(),
            indexes: Vec::new(),
            filters: Vec::new(),
            actions: Vec::new(),
            routes: Vec::new(),
            watch: Vec::new(),
            persist: Vec::new(),
            on_load: None,
        }
    }

    /// Returns the collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares the primary-key field instead of discovering it.
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    /// Declares that `field` holds a key of `collection`.
    ///
    /// When groups are built, the foreign record is attached under `alias`,
    /// or under the target collection's name when no alias is given.
    pub fn parent(
        mut self,
        field: impl Into<String>,
        collection: impl Into<String>,
        alias: Option<&str>,
    ) -> Self {
        self.relations
            .push(Relation::new(field, collection, alias.map(Into::into)));
        self
    }

    /// Declares a mutable data property with its initial value.
    pub fn data(mut self, name: impl Into<String>, value: Value) -> Self {
        self.data.push((name.into(), value));
        self
    }

    /// Seeds records that are collected when the store is built.
    pub fn records(mut self, records: impl IntoIterator<Item = Value>) -> Self {
        self.records.push((None, records.into_iter().collect()));
        self
    }

    /// Seeds records into an index when the store is built.
    pub fn records_into(mut self, index: impl Into<String>, records: impl IntoIterator<Item = Value>) -> Self {
        self.records
            .push((Some(index.into()), records.into_iter().collect()));
        self
    }

    /// Declares an index; its materialized group shares the name.
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.indexes.push(name.into());
        self
    }

    /// Declares a group. Same as [`CollectionConfig::index`].
    pub fn group(self, name: impl Into<String>) -> Self {
        self.index(name)
    }

    /// Declares a filter.
    pub fn filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&FilterContext<'_>) -> Value + 'static,
    {
        self.filters.push((name.into(), Rc::new(filter)));
        self
    }

    /// Declares an action.
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&mut ActionContext<'_>, Value) -> pulse_core::Result<Value> + 'static,
    {
        self.actions.push((name.into(), Rc::new(action)));
        self
    }

    /// Declares a route.
    pub fn route<F>(mut self, name: impl Into<String>, route: F) -> Self
    where
        F: Fn(&dyn RequestClient, Value) -> ResponseFuture + 'static,
    {
        self.routes.push((name.into(), Rc::new(route)));
        self
    }

    /// Registers a callback run after `property` changes and regeneration settles.
    pub fn watch<F>(mut self, property: impl Into<String>, callback: F) -> Self
    where
        F: Fn(&Store) + 'static,
    {
        self.watch.push((property.into(), Rc::new(callback)));
        self
    }

    /// Mirrors a property into the store's key/value storage.
    pub fn persist(mut self, property: impl Into<String>) -> Self {
        self.persist.push(property.into());
        self
    }

    /// Registers a callback run once the store has been built.
    pub fn on_load<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Store) + 'static,
    {
        self.on_load = Some(Rc::new(callback));
        self
    }

    /// Returns the names this collection declares, with the kind of each.
    pub(crate) fn namespace(&self) -> IndexMap<&str, usize> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        let names = self
            .data
            .iter()
            .map(|(n, _)| n.as_str())
            .chain(self.indexes.iter().map(String::as_str))
            .chain(self.filters.iter().map(|(n, _)| n.as_str()))
            .chain(self.actions.iter().map(|(n, _)| n.as_str()));
        for name in names {
            *counts.entry(name).or_default() += 1;
        }
        counts
    }
}
