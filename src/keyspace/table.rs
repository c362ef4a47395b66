//! KeySpace implementation
//!
//! HashMap-based keyspace. Locking is the caller's job (see `engine`).

use std::collections::HashMap;

use crate::error::{Result, SkipKvError};
use crate::sortedset::SortedSet;

use super::Value;

/// Map from key to a typed value
#[derive(Debug, Default)]
pub struct KeySpace {
    entries: HashMap<String, Value>,
}

impl KeySpace {
    /// Create an empty keyspace
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Read a string value
    ///
    /// `Ok(None)` if absent, `Err(WrongKind)` if the key holds a sorted set.
    pub fn get_string(&self, key: &str) -> Result<Option<&str>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Str(value)) => Ok(Some(value)),
            Some(Value::SortedSet(_)) => Err(SkipKvError::WrongKind),
        }
    }

    /// Read a sorted set
    ///
    /// `Ok(None)` if absent, `Err(WrongKind)` if the key holds a string.
    pub fn get_sorted_set(&self, key: &str) -> Result<Option<&SortedSet>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::SortedSet(set)) => Ok(Some(set)),
            Some(Value::Str(_)) => Err(SkipKvError::WrongKind),
        }
    }

    /// Store a string, replacing whatever the key held before
    pub fn set_string(&mut self, key: &str, value: impl Into<String>) -> Option<Value> {
        self.entries.insert(key.to_string(), Value::Str(value.into()))
    }

    /// Sorted set under `key` for writing.
    ///
    /// A string under `key` is discarded and replaced by an empty set; an
    /// absent key gets an empty set.
    pub fn sorted_set_mut(&mut self, key: &str) -> &mut SortedSet {
        if let Some(Value::Str(_)) = self.entries.get(key) {
            self.entries.remove(key);
        }

        let value = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| Value::SortedSet(SortedSet::new()));

        match value {
            Value::SortedSet(set) => set,
            Value::Str(_) => unreachable!("string value survived migration"),
        }
    }

    /// Delete `key` under any kind
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate all entries in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}
