//! Dependency graph node addresses.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifies a property of a collection: `"collection/property"`.
///
/// Graph nodes, regeneration queue entries and subscriptions are all keyed
/// by this address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey {
    collection: String,
    property: String,
}

impl NodeKey {
    /// Creates a node address.
    pub fn new(collection: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            property: property.into(),
        }
    }

    /// Returns the collection name.
    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the property name.
    #[inline]
    pub fn property(&self) -> &str {
        &self.property
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.property)
    }
}

impl FromStr for NodeKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((collection, property)) if !collection.is_empty() && !property.is_empty() => {
                Ok(Self::new(collection, property))
            }
            _ => Err(Error::invalid_node_key(s)),
        }
    }
}
