//! The regeneration pipeline.
//!
//! After a mutation the store rebuilds every group marked stale, queues the
//! transitive dependents of those groups, queues filters linked to the
//! touched records or to a rebuilt group and then drains the queue. Draining is bounded twice: the
//! queue itself stops on an immediate repeat, and the store stops after
//! `max_drain_executions` executions.
//!
//! The repeat guard is a backstop. Through the public API an ungenerated
//! filter is always either pending or running, and a deferred filter goes to
//! the back of the queue, so a deferral cycle alternates its members and is
//! stopped by the execution cap instead.

use indexmap::IndexSet;
use pulse_core::{Error, Key, NodeKey, Value};
use pulse_reactive::{PropertyKind, Step};
use pulse_storage::materialize;

use crate::collection::Collections;
use crate::engine::Outcome;
use crate::store::Store;

impl Store {
    /// Rebuilds stale groups, queues their dependents and drains the queue.
    pub(crate) fn regenerate_groups_and_filters(&mut self) {
        let stale: Vec<NodeKey> = self.indexes_to_regen.drain(..).collect();
        for group in &stale {
            self.rebuild_group(group);
            self.link_group_filters(group);
        }
        let declared: Vec<NodeKey> = stale
            .into_iter()
            .filter(|group| self.graph.contains(group))
            .collect();
        self.find_and_update_dependents(&declared);

        let forced: Vec<NodeKey> = self.filters_to_force_regen.drain(..).collect();
        for filter in forced {
            self.queue.enqueue(filter);
        }
        self.process_regen_queue();
    }

    /// Materializes a group and delivers both its resolved array and its keys.
    pub(crate) fn rebuild_group(&mut self, group: &NodeKey) {
        let Some(collection) = self.collections.get(group.collection()) else {
            return;
        };
        let Some(keys) = collection.indexes.keys(group.property()) else {
            return;
        };
        let resolved = materialize(
            keys,
            &collection.records,
            &collection.relations,
            &Collections(&self.collections),
        );
        let keys = Value::Array(keys.iter().map(Key::to_value).collect());
        tracing::debug!(%group, size = resolved.len(), "rebuilt group");

        self.deliver(group, PropertyKind::Group, Value::Array(resolved));
        self.deliver(group, PropertyKind::IndexKeys, keys);
    }

    /// Queues every transitive dependent of `changed`.
    pub(crate) fn find_and_update_dependents(&mut self, changed: &[NodeKey]) {
        if changed.is_empty() {
            return;
        }
        let search = self
            .graph
            .find_all_dependents_of(changed, self.options.max_dependent_rounds);
        if search.overflowed {
            let origin = changed
                .iter()
                .map(NodeKey::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            self.diagnostics.report(&Error::GraphOverflow {
                node: origin,
                rounds: search.rounds,
            });
        }
        tracing::debug!(found = search.nodes.len(), "found dependents");
        for dependent in search.nodes {
            if self.graph.is_filter(&dependent) {
                self.queue.enqueue(dependent);
            }
        }
    }

    /// Drains the regeneration queue.
    pub(crate) fn process_regen_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        tracing::debug!(pending = self.queue.len(), "processing regen queue");

        let limit = self.options.max_drain_executions;
        let mut executions = 0;
        loop {
            let entry = match self.queue.next_step() {
                Step::Run(entry) => entry,
                Step::Repeat(_) | Step::Idle => break,
            };
            if executions == limit {
                self.diagnostics.report(&Error::GraphOverflow {
                    node: entry.to_string(),
                    rounds: limit,
                });
                self.queue.enqueue(entry);
                self.queue.end_drain();
                break;
            }
            executions += 1;

            if let Outcome::Generated { changed: true } = self.execute_filter(&entry) {
                self.enqueue_direct_dependents(&entry);
            }
        }
    }

    /// Queues the filters that read `node`, other than `node` itself.
    fn enqueue_direct_dependents(&mut self, node: &NodeKey) {
        let dependents: IndexSet<NodeKey> = self
            .graph
            .node(node)
            .map(|n| n.dependents().clone())
            .unwrap_or_default();
        for dependent in dependents {
            if &dependent != node && self.graph.is_filter(&dependent) {
                self.queue.enqueue(dependent);
            }
        }
    }
}
