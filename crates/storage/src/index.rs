//! Named indexes: ordered, duplicate-free lists of primary keys.

use indexmap::IndexMap;
use pulse_core::Key;

/// The indexes declared on (or created by) one collection.
#[derive(Clone, Debug, Default)]
pub struct IndexTable {
    /// Index name → key list, in declaration order.
    indexes: IndexMap<String, Vec<Key>>,
}

impl IndexTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an empty index.
    ///
    /// Returns false if the name is already taken.
    pub fn declare(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.indexes.contains_key(&name) {
            return false;
        }
        self.indexes.insert(name, Vec::new());
        true
    }

    /// Declares an index from a literal key sequence, dropping duplicates.
    ///
    /// Returns false (and changes nothing) if the name is already taken.
    pub fn create_from(&mut self, name: impl Into<String>, keys: impl IntoIterator<Item = Key>) -> bool {
        let name = name.into();
        if self.indexes.contains_key(&name) {
            return false;
        }
        let mut list: Vec<Key> = Vec::new();
        for key in keys {
            if !list.contains(&key) {
                list.push(key);
            }
        }
        self.indexes.insert(name, list);
        true
    }

    /// Returns true if the index exists.
    #[inline]
    pub fn contains_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Returns the key list of an index.
    pub fn keys(&self, name: &str) -> Option<&[Key]> {
        self.indexes.get(name).map(Vec::as_slice)
    }

    /// Appends a key to an index unless it is already present.
    ///
    /// Returns true if the key was appended.
    pub fn push_unique(&mut self, name: &str, key: Key) -> bool {
        match self.indexes.get_mut(name) {
            Some(list) if !list.contains(&key) => {
                list.push(key);
                true
            }
            _ => false,
        }
    }

    /// Removes a key from one index.
    ///
    /// Returns true if the key was present.
    pub fn remove_key(&mut self, name: &str, key: &Key) -> bool {
        match self.indexes.get_mut(name) {
            Some(list) => {
                let before = list.len();
                list.retain(|k| k != key);
                list.len() != before
            }
            None => false,
        }
    }

    /// Removes a key from every index, returning the names it was removed from.
    pub fn remove_everywhere(&mut self, key: &Key) -> Vec<String> {
        let mut touched = Vec::new();
        for (name, list) in self.indexes.iter_mut() {
            let before = list.len();
            list.retain(|k| k != key);
            if list.len() != before {
                touched.push(name.clone());
            }
        }
        touched
    }

    /// Returns the names of the indexes containing `key`.
    pub fn containing<'a>(&'a self, key: &'a Key) -> impl Iterator<Item = &'a str> + 'a {
        self.indexes
            .iter()
            .filter(move |(_, list)| list.contains(key))
            .map(|(name, _)| name.as_str())
    }

    /// Returns all index names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.indexes.keys().map(String::as_str)
    }

    /// Returns the number of indexes.
    #[inline]
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    /// Returns true if there are no indexes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}
