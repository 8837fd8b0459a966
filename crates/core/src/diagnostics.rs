//! The store-wide error sink.
//!
//! Nothing in the store aborts on bad input. Every rejected record, failed
//! assertion and validation warning is emitted as a `tracing` event and kept
//! here so hosts can inspect what went wrong after the fact.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, ErrorKind};

/// A record dropped by `collect`, kept with the reason it was dropped.
#[derive(Clone, Debug, Serialize)]
pub struct DataRejection {
    /// Collection the record was collected into.
    pub collection: String,
    /// The rejected record, unchanged.
    pub record: Value,
    /// Why the record was rejected.
    pub message: String,
    /// When the rejection happened.
    pub timestamp: DateTime<Utc>,
}

/// One reported problem.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    /// Classification of the problem.
    pub kind: ErrorKind,
    /// Human readable description.
    pub message: String,
    /// When it was reported.
    pub timestamp: DateTime<Utc>,
}

/// Append-only sink of diagnostics and data rejections.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    rejections: Vec<DataRejection>,
}

impl Diagnostics {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a rejected record.
    pub fn reject(&mut self, collection: &str, record: Value, message: &str) {
        let error = Error::data_rejection(collection, message);
        tracing::error!(
            collection,
            "{} - Data was not collected, but saved to the error sink instead",
            error
        );
        let timestamp = Utc::now();
        self.rejections.push(DataRejection {
            collection: collection.into(),
            record,
            message: message.into(),
            timestamp,
        });
        self.entries.push(Diagnostic {
            kind: ErrorKind::DataRejection,
            message: error.to_string(),
            timestamp,
        });
    }

    /// Records an error that was handled by logging and continuing.
    pub fn report(&mut self, error: &Error) {
        match error.kind() {
            ErrorKind::ValidationWarning | ErrorKind::Throttled => {
                tracing::warn!("{}", error)
            }
            _ => tracing::error!("{}", error),
        }
        self.entries.push(Diagnostic {
            kind: error.kind(),
            message: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Records a non-fatal validation warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.entries.push(Diagnostic {
            kind: ErrorKind::ValidationWarning,
            message,
            timestamp: Utc::now(),
        });
    }

    /// Returns all diagnostics in report order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Returns all rejected records in rejection order.
    pub fn rejections(&self) -> &[DataRejection] {
        &self.rejections
    }

    /// Returns the number of diagnostics of the given kind.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Returns the number of diagnostics.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been reported.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
