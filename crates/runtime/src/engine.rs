//! Filter execution.
//!
//! A filter is run with a [`FilterContext`] that records every property it
//! reads. The recorded reads become graph edges once the filter has run
//! successfully. A filter that read another filter which has never been
//! generated is deferred to the back of the regeneration queue and its output
//! is discarded.

use std::cell::RefCell;

use indexmap::IndexMap;
use pulse_core::{Error, Key, NodeKey, Record, Value};
use pulse_reactive::{DependencyRecorder, PropertyKind};
use pulse_storage::materialize;

use crate::collection::{Collection, Collections};
use crate::store::Store;

/// Read access handed to a running filter.
///
/// Every [`FilterContext::get`] is recorded as a dependency of the filter.
/// [`FilterContext::find_by_id`] and [`FilterContext::get_group`] instead link
/// the filter to a single record or index, so that collecting into them
/// forces the filter to regenerate. Only the latest link of each kind is kept.
pub struct FilterContext<'a> {
    collections: &'a IndexMap<String, Collection>,
    filter: &'a NodeKey,
    recorder: &'a DependencyRecorder,
    record_link: RefCell<Option<(String, Key)>>,
    group_link: RefCell<Option<(String, String)>>,
}

impl<'a> FilterContext<'a> {
    pub(crate) fn new(
        collections: &'a IndexMap<String, Collection>,
        filter: &'a NodeKey,
        recorder: &'a DependencyRecorder,
    ) -> Self {
        Self {
            collections,
            filter,
            recorder,
            record_link: RefCell::new(None),
            group_link: RefCell::new(None),
        }
    }

    /// Collection the running filter belongs to.
    pub fn collection(&self) -> &str {
        self.filter.collection()
    }

    /// Name of the running filter.
    pub fn name(&self) -> &str {
        self.filter.property()
    }

    /// Reads a property of any collection.
    pub fn get(&self, collection: &str, property: &str) -> Option<&'a Value> {
        self.recorder.record(NodeKey::new(collection, property));
        self.collections.get(collection)?.properties.get(property)
    }

    /// Reads a property of the filter's own collection.
    pub fn local(&self, property: &str) -> Option<&'a Value> {
        self.get(self.filter.collection(), property)
    }

    /// Looks up one record and links the filter to it.
    pub fn find_by_id(&self, collection: &str, key: impl Into<Key>) -> Option<&'a Record> {
        let key = key.into();
        let target = self.collections.get(collection)?;
        let record = target.records.get(&key);
        *self.record_link.borrow_mut() = Some((collection.to_string(), key));
        record
    }

    /// Materializes an index and links the filter to it.
    ///
    /// An undeclared index yields an empty group.
    pub fn get_group(&self, collection: &str, index: &str) -> Vec<Value> {
        let Some(target) = self.collections.get(collection) else {
            return Vec::new();
        };
        *self.group_link.borrow_mut() = Some((collection.to_string(), index.to_string()));
        target
            .indexes
            .keys(index)
            .map(|keys| {
                materialize(
                    keys,
                    &target.records,
                    &target.relations,
                    &Collections(self.collections),
                )
            })
            .unwrap_or_default()
    }

    /// Key list of an index. Not recorded as a dependency.
    pub fn index_keys(&self, collection: &str, index: &str) -> Option<&'a [Key]> {
        self.collections.get(collection)?.indexes.keys(index)
    }

    /// Number of records in a collection. Not recorded as a dependency.
    pub fn collection_size(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map_or(0, |c| c.records.len())
    }

    fn into_links(self) -> (Option<(String, Key)>, Option<(String, String)>) {
        (self.record_link.into_inner(), self.group_link.into_inner())
    }
}

/// Result of running one filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// Output delivered; `changed` tells whether it differs from the last one.
    Generated { changed: bool },
    /// Read an ungenerated filter; re-queued.
    Deferred,
    /// No such filter.
    Missing,
}

impl Store {
    /// Runs a filter, records its reads and delivers its output.
    pub(crate) fn execute_filter(&mut self, node: &NodeKey) -> Outcome {
        let filter = self
            .collections
            .get(node.collection())
            .and_then(|c| c.filters.get(node.property()))
            .cloned();
        let Some(filter) = filter else {
            self.diagnostics.report(&Error::FilterNotFound {
                collection: node.collection().to_string(),
                filter: node.property().to_string(),
            });
            return Outcome::Missing;
        };

        tracing::debug!(filter = %node, "executing filter");
        let recorder = DependencyRecorder::new();
        let (output, links) = {
            let context = FilterContext::new(&self.collections, node, &recorder);
            recorder.start();
            let output = filter(&context);
            (output, context.into_links())
        };
        let found = recorder.finish();
        self.apply_links(node, links);

        if let Some(unresolved) = self.graph.first_unresolved(node, &found) {
            tracing::debug!(
                filter = %node,
                dependency = %unresolved,
                "dependency has not been generated yet, saving filter to regen queue"
            );
            self.queue.enqueue(node.clone());
            return Outcome::Deferred;
        }

        self.graph.populate(node, &found, self.options.edge_policy);
        self.graph.mark_generated(node);

        let output = if output.is_null() {
            Value::Bool(false)
        } else {
            output
        };
        let changed = self.property(node) != Some(&output);
        self.deliver(node, PropertyKind::Filter, output);
        Outcome::Generated { changed }
    }

    fn apply_links(&mut self, node: &NodeKey, links: (Option<(String, Key)>, Option<(String, String)>)) {
        let (record, group) = links;
        if let Some(record) = record {
            self.record_links.insert(node.clone(), record);
        }
        if let Some(group) = group {
            self.group_links.insert(node.clone(), group);
        }
    }

    /// Marks every filter linked to `key` for a forced regeneration.
    pub(crate) fn link_filters(&mut self, collection: &str, key: &Key) {
        for (filter, (linked, linked_key)) in &self.record_links {
            if linked == collection && linked_key == key {
                self.filters_to_force_regen.insert(filter.clone());
            }
        }
    }

    /// Marks every filter that read `group` through `get_group` for a
    /// forced regeneration.
    pub(crate) fn link_group_filters(&mut self, group: &NodeKey) {
        for (filter, (linked, index)) in &self.group_links {
            if linked == group.collection() && index == group.property() {
                self.filters_to_force_regen.insert(filter.clone());
            }
        }
    }
}
