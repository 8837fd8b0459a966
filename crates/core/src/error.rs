//! Error types for Pulse store operations.

use crate::key::Key;
use serde::Serialize;
use thiserror::Error as ThisError;

/// Result type alias for Pulse operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Classification of errors, matching how each one is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// A record was dropped because it has no usable primary key.
    DataRejection,
    /// A name was declared twice in one collection's namespace.
    NamespaceConflict,
    /// An unknown collection, index, record, property or callable was named.
    ReferenceError,
    /// A write touched an unmodeled field; the write was still applied.
    ValidationWarning,
    /// A dependent traversal or a queue drain exceeded its bound.
    GraphOverflow,
    /// An action was invoked while throttled.
    Throttled,
    /// The request capability failed or is missing.
    Request,
    /// A persisted value could not be encoded or decoded.
    Storage,
}

/// Error types for Pulse store operations.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Record rejected on collect.
    #[error("[Data Rejection] {message} (collection {collection})")]
    DataRejection { collection: String, message: String },
    /// Duplicate name in a collection namespace.
    #[error("namespace conflict: \"{name}\" is already declared on collection {collection}")]
    NamespaceConflict { collection: String, name: String },
    /// Collection not found.
    #[error("\"{name}\" is not a valid collection")]
    CollectionNotFound { name: String },
    /// Index not found.
    #[error("index \"{index}\" not found in collection {collection}")]
    IndexNotFound { collection: String, index: String },
    /// Record not found.
    #[error("data for id \"{key}\" not found in collection {collection}")]
    RecordNotFound { collection: String, key: Key },
    /// Property not found.
    #[error("property \"{property}\" does not exist on collection {collection}")]
    PropertyNotFound { collection: String, property: String },
    /// Attempt to write a derived property.
    #[error("cannot set \"{property}\" on collection {collection}: only data properties are writable")]
    ReadOnlyProperty { collection: String, property: String },
    /// Filter not found.
    #[error("filter \"{filter}\" not found in collection {collection}")]
    FilterNotFound { collection: String, filter: String },
    /// Action not found.
    #[error("action \"{action}\" not found in collection {collection}")]
    ActionNotFound { collection: String, action: String },
    /// Route not found.
    #[error("route \"{route}\" not found in collection {collection}")]
    RouteNotFound { collection: String, route: String },
    /// Relation declared against an unknown collection.
    #[error("relation {collection}.{field} targets \"{target}\", which is not a valid collection")]
    UnknownRelationTarget {
        collection: String,
        field: String,
        target: String,
    },
    /// Numeric operation on a non-numeric value.
    #[error("property {field} for {key} in collection {collection} is not a number")]
    NotNumeric {
        collection: String,
        key: Key,
        field: String,
    },
    /// Update patch that is not a JSON object.
    #[error("update for \"{key}\" in collection {collection} must be an object")]
    InvalidPatch { collection: String, key: Key },
    /// Malformed `collection/property` address.
    #[error("invalid node key \"{value}\": expected collection/property")]
    InvalidNodeKey { value: String },
    /// Dependent traversal or drain exceeded its bound.
    #[error("maximum rounds ({rounds}) exceeded while traversing from {node}")]
    GraphOverflow { node: String, rounds: usize },
    /// Action is throttled.
    #[error("action \"{action}\" on collection {collection} is throttled")]
    Throttled { collection: String, action: String },
    /// No request capability configured.
    #[error("no request client configured")]
    NoRequestClient,
    /// Request capability failure.
    #[error("request failed: {message}")]
    Request { message: String },
    /// JSON encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Returns how this error is classified.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::DataRejection { .. } => ErrorKind::DataRejection,
            Error::NamespaceConflict { .. } => ErrorKind::NamespaceConflict,
            Error::CollectionNotFound { .. }
            | Error::IndexNotFound { .. }
            | Error::RecordNotFound { .. }
            | Error::PropertyNotFound { .. }
            | Error::ReadOnlyProperty { .. }
            | Error::FilterNotFound { .. }
            | Error::ActionNotFound { .. }
            | Error::RouteNotFound { .. }
            | Error::UnknownRelationTarget { .. }
            | Error::NotNumeric { .. }
            | Error::InvalidPatch { .. }
            | Error::InvalidNodeKey { .. } => ErrorKind::ReferenceError,
            Error::GraphOverflow { .. } => ErrorKind::GraphOverflow,
            Error::Throttled { .. } => ErrorKind::Throttled,
            Error::NoRequestClient | Error::Request { .. } => ErrorKind::Request,
            Error::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Creates a data rejection error.
    pub fn data_rejection(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Error::DataRejection {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Creates a namespace conflict error.
    pub fn namespace_conflict(collection: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NamespaceConflict {
            collection: collection.into(),
            name: name.into(),
        }
    }

    /// Creates a collection not found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Error::CollectionNotFound { name: name.into() }
    }

    /// Creates an index not found error.
    pub fn index_not_found(collection: impl Into<String>, index: impl Into<String>) -> Self {
        Error::IndexNotFound {
            collection: collection.into(),
            index: index.into(),
        }
    }

    /// Creates a record not found error.
    pub fn record_not_found(collection: impl Into<String>, key: Key) -> Self {
        Error::RecordNotFound {
            collection: collection.into(),
            key,
        }
    }

    /// Creates a property not found error.
    pub fn property_not_found(collection: impl Into<String>, property: impl Into<String>) -> Self {
        Error::PropertyNotFound {
            collection: collection.into(),
            property: property.into(),
        }
    }

    /// Creates an invalid node key error.
    pub fn invalid_node_key(value: impl Into<String>) -> Self {
        Error::InvalidNodeKey {
            value: value.into(),
        }
    }
}
