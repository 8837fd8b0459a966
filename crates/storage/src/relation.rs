//! Single-hop foreign-key relations.
//!
//! A relation links a field of one collection's records to the primary key of
//! another collection. Relations are resolved only when a group is
//! materialized; a foreign record that does not exist is simply left out.

use pulse_core::{Key, Record};

/// Read access to other collections' records, keyed by primary key.
pub trait ForeignLookup {
    /// Looks up a record of `collection` by key.
    fn foreign_record(&self, collection: &str, key: &Key) -> Option<&Record>;
}

/// A lookup with no foreign data, for collections without relations.
pub struct NoForeignData;

impl ForeignLookup for NoForeignData {
    fn foreign_record(&self, _collection: &str, _key: &Key) -> Option<&Record> {
        None
    }
}

/// A declared `source field → target collection` link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relation {
    source_field: String,
    target_collection: String,
    alias: Option<String>,
}

impl Relation {
    /// Creates a relation.
    pub fn new(
        source_field: impl Into<String>,
        target_collection: impl Into<String>,
        alias: Option<String>,
    ) -> Self {
        Self {
            source_field: source_field.into(),
            target_collection: target_collection.into(),
            alias,
        }
    }

    /// Returns the field holding the foreign key.
    #[inline]
    pub fn source_field(&self) -> &str {
        &self.source_field
    }

    /// Returns the collection the foreign key points into.
    #[inline]
    pub fn target_collection(&self) -> &str {
        &self.target_collection
    }

    /// Returns the output alias, if one was declared.
    #[inline]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Returns the field the resolved record is attached under.
    pub fn output_field(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.target_collection)
    }

    /// Resolves the foreign record referenced by `record`, if any.
    pub fn resolve<'a>(&self, record: &Record, lookup: &'a dyn ForeignLookup) -> Option<&'a Record> {
        let key = Key::from_value(record.get(&self.source_field)?)?;
        lookup.foreign_record(&self.target_collection, &key)
    }
}
