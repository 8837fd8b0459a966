//! The regeneration queue.
//!
//! A FIFO of filters waiting to be re-executed. A pending entry is never
//! queued twice. Draining is driven by the store, one `Step` at a time, so
//! that executing an entry may enqueue further entries.
//!
//! The only loop protection here is the immediate-repeat guard: if the entry
//! about to run is the one that ran just before it, the drain stops.

use pulse_core::NodeKey;
use std::collections::VecDeque;

/// What the drainer should do next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Execute this entry.
    Run(NodeKey),
    /// This entry repeats the previous one; stop the current drain.
    Repeat(NodeKey),
    /// Nothing left to do.
    Idle,
}

/// Deduplicating FIFO of pending regenerations.
#[derive(Clone, Debug, Default)]
pub struct RegenQueue {
    pending: VecDeque<NodeKey>,
    last_processed: Option<NodeKey>,
    guard_trips: usize,
}

impl RegenQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry unless an equal entry is already pending.
    ///
    /// Returns true if the entry was added.
    pub fn enqueue(&mut self, entry: NodeKey) -> bool {
        if self.pending.contains(&entry) {
            return false;
        }
        tracing::trace!(%entry, "queued for regeneration");
        self.pending.push_back(entry);
        true
    }

    /// Pops the next entry and applies the immediate-repeat guard.
    pub fn next_step(&mut self) -> Step {
        match self.pending.pop_front() {
            None => {
                self.last_processed = None;
                Step::Idle
            }
            Some(entry) if self.last_processed.as_ref() == Some(&entry) => {
                tracing::warn!(%entry, "prevented infinite loop");
                self.last_processed = None;
                self.guard_trips += 1;
                Step::Repeat(entry)
            }
            Some(entry) => {
                self.last_processed = Some(entry.clone());
                Step::Run(entry)
            }
        }
    }

    /// Forgets the last processed entry, ending the current drain pass.
    pub fn end_drain(&mut self) {
        self.last_processed = None;
    }

    /// Returns true if an equal entry is pending.
    pub fn contains(&self, entry: &NodeKey) -> bool {
        self.pending.contains(entry)
    }

    /// Iterates over pending entries in FIFO order.
    pub fn pending(&self) -> impl Iterator<Item = &NodeKey> {
        self.pending.iter()
    }

    /// Returns how many times the repeat guard stopped a drain.
    #[inline]
    pub fn guard_trips(&self) -> usize {
        self.guard_trips
    }

    /// Returns the number of pending entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(s: &str) -> NodeKey {
        s.parse().unwrap()
    }

    #[test]
    fn test_enqueue_dedups_pending() {
        let mut queue = RegenQueue::new();
        assert!(queue.enqueue(key("c/f")));
        assert!(!queue.enqueue(key("c/f")));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = RegenQueue::new();
        queue.enqueue(key("c/a"));
        queue.enqueue(key("c/b"));

        assert_eq!(queue.next_step(), Step::Run(key("c/a")));
        assert_eq!(queue.next_step(), Step::Run(key("c/b")));
        assert_eq!(queue.next_step(), Step::Idle);
    }

    #[test]
    fn test_popped_entry_can_be_requeued() {
        let mut queue = RegenQueue::new();
        queue.enqueue(key("c/a"));
        assert_eq!(queue.next_step(), Step::Run(key("c/a")));
        assert!(queue.enqueue(key("c/a")));
    }

    #[test]
    fn test_repeat_guard_trips_on_back_to_back_entry() {
        let mut queue = RegenQueue::new();
        queue.enqueue(key("c/a"));
        assert_eq!(queue.next_step(), Step::Run(key("c/a")));

        // Re-enqueued while running
        queue.enqueue(key("c/a"));
        queue.enqueue(key("c/b"));
        assert_eq!(queue.next_step(), Step::Repeat(key("c/a")));
        assert_eq!(queue.guard_trips(), 1);

        // The rest stays queued and the guard is reset
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next_step(), Step::Run(key("c/b")));
    }

    #[test]
    fn test_idle_resets_last_processed() {
        let mut queue = RegenQueue::new();
        queue.enqueue(key("c/a"));
        queue.next_step();
        assert_eq!(queue.next_step(), Step::Idle);

        queue.enqueue(key("c/a"));
        assert_eq!(queue.next_step(), Step::Run(key("c/a")));
    }

    #[test]
    fn test_end_drain_resets_last_processed() {
        let mut queue = RegenQueue::new();
        queue.enqueue(key("c/a"));
        queue.next_step();
        queue.end_drain();

        queue.enqueue(key("c/a"));
        assert_eq!(queue.next_step(), Step::Run(key("c/a")));
    }

    proptest! {
        /// Property: no entry is ever pending twice.
        #[test]
        fn pending_entries_are_unique(names in prop::collection::vec(0u8..6, 0..40)) {
            let mut queue = RegenQueue::new();
            for n in names {
                queue.enqueue(NodeKey::new("c", format!("f{}", n)));
            }
            let mut seen: Vec<&NodeKey> = queue.pending().collect();
            let total = seen.len();
            seen.sort();
            seen.dedup();
            prop_assert_eq!(seen.len(), total);
        }
    }
}
