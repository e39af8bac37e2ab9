//! Insertion-ordered, unique-by-id collections for sequence and structure
//! records.
//!
//! Uniqueness is layered on an order-preserving map: lookup is O(1) by id,
//! iteration follows insertion order, and a duplicate insert is rejected
//! unless the caller removes the old entry first (force-reload).

use crate::error::{ProtrepError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Records that can be stored in an [`IdCollection`]
pub trait HasId {
    fn record_id(&self) -> &str;
}

/// Insertion-ordered map of records keyed by their identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdCollection<T> {
    inner: IndexMap<String, T>,
}

impl<T: HasId> IdCollection<T> {
    pub fn new() -> Self {
        Self {
            inner: IndexMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }

    /// Append a record, rejecting duplicates
    pub fn append(&mut self, record: T) -> Result<()> {
        let id = record.record_id().to_string();
        if self.inner.contains_key(&id) {
            return Err(ProtrepError::AlreadyLoaded(id));
        }
        self.inner.insert(id, record);
        Ok(())
    }

    pub fn get_by_id(&self, id: &str) -> Result<&T> {
        self.inner
            .get(id)
            .ok_or_else(|| ProtrepError::NotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut T> {
        self.inner
            .get_mut(id)
            .ok_or_else(|| ProtrepError::NotFound(id.to_string()))
    }

    /// Remove a record by id, preserving the order of the remaining entries
    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.inner.shift_remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.inner.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.inner.values_mut()
    }

    pub fn ids(&self) -> Vec<String> {
        self.inner.keys().cloned().collect()
    }

    /// Ordered view of the records matching a predicate; does not mutate the
    /// source collection
    pub fn filtered<P>(&self, predicate: P) -> Vec<&T>
    where
        P: Fn(&T) -> bool,
    {
        self.inner.values().filter(|r| predicate(r)).collect()
    }
}

impl<T: HasId> Default for IdCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}
