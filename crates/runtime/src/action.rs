//! Actions and routes.
//!
//! An action runs with an [`ActionContext`] scoped to its collection. Every
//! mutation it makes is recorded in history under the action's name, and all
//! notifications are held until the outermost action returns.

use std::time::{Duration, Instant};

use pulse_core::{Error, Key, Record, Result, Value};

use crate::request::ResponseFuture;
use crate::store::Store;

/// Handle given to a running action.
pub struct ActionContext<'a> {
    store: &'a mut Store,
    collection: String,
    action: String,
}

impl<'a> ActionContext<'a> {
    /// Collection the action belongs to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Name of the running action.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The whole store, for reads across collections.
    pub fn store(&self) -> &Store {
        &*self.store
    }

    /// The whole store, for mutations across collections.
    pub fn store_mut(&mut self) -> &mut Store {
        &mut *self.store
    }

    /// Reads a property of this collection.
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.store.get(&self.collection, property)
    }

    pub fn find_by_id(&self, key: impl Into<Key>) -> Option<&Record> {
        self.store.find_by_id(&self.collection, key)
    }

    pub fn get_group(&self, index: &str) -> Vec<Value> {
        self.store.get_group(&self.collection, index)
    }

    pub fn collect<I>(&mut self, records: I, index: Option<&str>) -> Result<usize>
    where
        I: IntoIterator<Item = Value>,
    {
        self.store.collect(&self.collection, records, index)
    }

    pub fn collect_into<I>(&mut self, records: I, indexes: &[&str]) -> Result<usize>
    where
        I: IntoIterator<Item = Value>,
    {
        self.store.collect_into(&self.collection, records, indexes)
    }

    pub fn update(&mut self, key: impl Into<Key>, patch: Value) -> Result<()> {
        self.store.update(&self.collection, key, patch)
    }

    pub fn delete<K: Into<Key>>(&mut self, keys: impl IntoIterator<Item = K>) -> Result<usize> {
        self.store.delete(&self.collection, keys)
    }

    pub fn move_keys<K: Into<Key>>(&mut self, keys: impl IntoIterator<Item = K>, from: &str, to: &str) -> Result<()> {
        self.store.move_keys(&self.collection, keys, from, to)
    }

    pub fn put<K: Into<Key>>(&mut self, keys: impl IntoIterator<Item = K>, to: &str) -> Result<()> {
        self.store.put(&self.collection, keys, to)
    }

    pub fn new_group<K: Into<Key>>(&mut self, name: &str, keys: impl IntoIterator<Item = K>) -> Result<()> {
        self.store.new_group(&self.collection, name, keys)
    }

    pub fn increment(&mut self, key: impl Into<Key>, field: &str, amount: impl Into<Value>) -> Result<()> {
        self.store.increment(&self.collection, key, field, amount)
    }

    pub fn decrement(&mut self, key: impl Into<Key>, field: &str, amount: impl Into<Value>) -> Result<()> {
        self.store.decrement(&self.collection, key, field, amount)
    }

    pub fn set_data(&mut self, property: &str, value: Value) -> Result<()> {
        self.store.set_data(&self.collection, property, value)
    }

    pub fn force_update(&mut self, filter: &str) -> Result<()> {
        self.store.force_update(&self.collection, filter)
    }

    /// Invokes another action of this collection.
    pub fn dispatch(&mut self, action: &str, param: Value) -> Result<Value> {
        self.store.dispatch(&self.collection, action, param)
    }

    /// Invokes a route of this collection.
    pub fn route(&self, name: &str, param: Value) -> Result<ResponseFuture> {
        self.store.route(&self.collection, name, param)
    }

    /// Refuses further calls of this action until `duration` has passed.
    pub fn throttle(&mut self, duration: Duration) {
        tracing::debug!(
            collection = %self.collection,
            action = %self.action,
            ?duration,
            "throttling action"
        );
        self.store.throttles.insert(
            (self.collection.clone(), self.action.clone()),
            Instant::now() + duration,
        );
    }
}

impl Store {
    /// Runs an action.
    ///
    /// A throttled action is refused with [`Error::Throttled`] without being
    /// invoked.
    pub fn dispatch(&mut self, collection: &str, action: &str, param: Value) -> Result<Value> {
        self.require(collection)?;
        let callable = self
            .collections
            .get(collection)
            .and_then(|target| target.actions.get(action))
            .cloned();
        let Some(callable) = callable else {
            return Err(self.fail(Error::ActionNotFound {
                collection: collection.to_string(),
                action: action.to_string(),
            }));
        };

        let slot = (collection.to_string(), action.to_string());
        match self.throttles.get(&slot) {
            Some(until) if Instant::now() < *until => {
                return Err(self.fail(Error::Throttled {
                    collection: collection.to_string(),
                    action: action.to_string(),
                }));
            }
            Some(_) => {
                self.throttles.remove(&slot);
            }
            None => {}
        }

        tracing::debug!(collection, action, "dispatching action");
        self.scoped(|store| {
            let outer = store.performing_action.replace(action.to_string());
            let result = {
                let mut context = ActionContext {
                    store: &mut *store,
                    collection: collection.to_string(),
                    action: action.to_string(),
                };
                callable(&mut context, param)
            };
            store.performing_action = outer;
            result
        })
    }

    /// Builds the request future of a route.
    pub fn route(&self, collection: &str, name: &str, param: Value) -> Result<ResponseFuture> {
        let route = self
            .collections
            .get(collection)
            .ok_or_else(|| Error::collection_not_found(collection))?
            .routes
            .get(name)
            .cloned()
            .ok_or_else(|| Error::RouteNotFound {
                collection: collection.to_string(),
                route: name.to_string(),
            })?;
        let client = self.request.clone().ok_or(Error::NoRequestClient)?;
        tracing::debug!(collection, route = name, "calling route");
        Ok(route(client.as_ref(), param))
    }
}
