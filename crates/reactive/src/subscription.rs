//! Subscription management for property changes.
//!
//! This module provides subscription IDs and a manager for tracking callbacks
//! registered against individual collection properties.

use crate::change::PropertyChange;
use indexmap::IndexMap;
use pulse_core::NodeKey;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback type for change notifications.
pub type ChangeCallback = Box<dyn Fn(&PropertyChange)>;

/// A subscription to one property.
pub struct Subscription {
    /// Unique identifier
    id: SubscriptionId,
    /// Property being watched
    target: NodeKey,
    /// Callback to invoke on changes
    callback: ChangeCallback,
    /// Whether this subscription is active
    active: bool,
}

impl Subscription {
    /// Creates a new subscription.
    pub fn new<F>(id: SubscriptionId, target: NodeKey, callback: F) -> Self
    where
        F: Fn(&PropertyChange) + 'static,
    {
        Self {
            id,
            target,
            callback: Box::new(callback),
            active: true,
        }
    }

    /// Returns the subscription ID.
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the watched property.
    #[inline]
    pub fn target(&self) -> &NodeKey {
        &self.target
    }

    /// Returns whether this subscription is active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Deactivates this subscription.
    #[inline]
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    /// Notifies this subscription if the change targets its property.
    pub fn notify(&self, change: &PropertyChange) {
        if self.active && self.target == change.node {
            (self.callback)(change);
        }
    }
}

/// Manages property subscriptions for a store.
pub struct SubscriptionManager {
    /// Subscriptions in registration order
    subscriptions: IndexMap<SubscriptionId, Subscription>,
    /// Next subscription ID to assign
    next_id: SubscriptionId,
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionManager {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: IndexMap::new(),
            next_id: 1,
        }
    }

    /// Subscribes to changes of `target`.
    ///
    /// Returns the subscription ID that can be used to unsubscribe.
    pub fn subscribe<F>(&mut self, target: NodeKey, callback: F) -> SubscriptionId
    where
        F: Fn(&PropertyChange) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;

        self.subscriptions
            .insert(id, Subscription::new(id, target, callback));
        id
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.shift_remove(&id).is_some()
    }

    /// Notifies every active subscription watching the changed property.
    pub fn notify_all(&self, change: &PropertyChange) {
        for sub in self.subscriptions.values() {
            sub.notify(change);
        }
    }

    /// Returns the number of subscriptions watching `target`.
    pub fn count_for(&self, target: &NodeKey) -> usize {
        self.subscriptions
            .values()
            .filter(|s| s.target() == target)
            .count()
    }

    /// Returns the number of subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Clears all subscriptions.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }
}
