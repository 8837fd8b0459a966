//! Recording mode.
//!
//! While a filter executes, every property read made through its context is
//! reported here. The recorder is owned by the execution that created it and
//! passed down explicitly, so there is no process-wide "recording" flag.

use core::cell::{Cell, RefCell};
use indexmap::IndexSet;
use pulse_core::NodeKey;

/// Discovery buffer for the reads of one filter execution.
#[derive(Debug, Default)]
pub struct DependencyRecorder {
    recording: Cell<bool>,
    found: RefCell<IndexSet<NodeKey>>,
}

impl DependencyRecorder {
    /// Creates an idle recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters recording mode.
    pub fn start(&self) {
        self.recording.set(true);
    }

    /// Returns true while recording.
    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording.get()
    }

    /// Logs a read. Ignored unless recording; repeated reads are logged once.
    pub fn record(&self, node: NodeKey) {
        if self.recording.get() {
            self.found.borrow_mut().insert(node);
        }
    }

    /// Leaves recording mode and drains the reads in first-read order.
    pub fn finish(&self) -> Vec<NodeKey> {
        self.recording.set(false);
        self.found.borrow_mut().drain(..).collect()
    }
}
