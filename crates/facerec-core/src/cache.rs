//! In-memory name → reference encoding mapping used by the matching flow.
//!
//! Iteration order is insertion order of first appearance. Re-inserting an
//! existing name replaces its encoding in place, so a later duplicate row in
//! the store overrides an earlier one without moving it.

use crate::encoding::Encoding;

#[derive(Debug, Clone, Default)]
pub struct EncodingCache {
    entries: Vec<(String, Encoding)>,
}

impl EncodingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from rows in store order.
    pub fn from_rows<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = (String, Encoding)>,
    {
        let mut cache = Self::new();
        for (name, encoding) in rows {
            cache.insert(name, encoding);
        }
        cache
    }

    /// Insert or overwrite the encoding for `name`.
    pub fn insert(&mut self, name: String, encoding: Encoding) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = encoding,
            None => self.entries.push((name, encoding)),
        }
    }

    /// Remove `name`; returns its encoding if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Encoding> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, name: &str) -> Option<&Encoding> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entries in matching order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Encoding)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
