//! Monotonic completion state for a (user, course) pair.
//!
//! Remote rows are authoritative; a local cache supplements them during
//! outages. Both sides reconcile by union, so completion only ever grows.

use std::collections::btree_map::{BTreeMap, Entry};

use chrono::{DateTime, Utc};

use crate::model::{ChapterId, SlideId};

/// Map from an entity id to the time it was first completed.
///
/// Monotonic: inserting an id that is already present keeps the earlier
/// timestamp, and entries are never removed. Union is the only merge
/// operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionMap<Id: Ord + Copy> {
    entries: BTreeMap<Id, DateTime<Utc>>,
}

impl<Id: Ord + Copy> Default for CompletionMap<Id> {
    fn default() -> Self {
        Self::new()
    }
}

/// Completed slides for a (user, course) pair.
pub type CompletionSet = CompletionMap<SlideId>;

/// Chapters whose quiz has at least one recorded result.
pub type QuizCompletionSet = CompletionMap<ChapterId>;

impl<Id: Ord + Copy> CompletionMap<Id> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: Id) -> bool {
        self.entries.contains_key(&id)
    }

    #[must_use]
    pub fn completed_at(&self, id: Id) -> Option<DateTime<Utc>> {
        self.entries.get(&id).copied()
    }

    /// Records a completion. Returns true if the id was newly recorded; a
    /// re-mark keeps the earlier timestamp.
    pub fn insert(&mut self, id: Id, at: DateTime<Utc>) -> bool {
        match self.entries.entry(id) {
            Entry::Vacant(slot) => {
                slot.insert(at);
                true
            }
            Entry::Occupied(mut slot) => {
                if at < *slot.get() {
                    slot.insert(at);
                }
                false
            }
        }
    }

    /// Merges another map into this one; the earlier timestamp wins per id.
    pub fn union(&mut self, other: &Self) {
        for (&id, &at) in &other.entries {
            self.insert(id, at);
        }
    }

    /// Returns the union of two maps without mutating either.
    #[must_use]
    pub fn unioned(mut self, other: &Self) -> Self {
        self.union(other);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id, DateTime<Utc>)> + '_ {
        self.entries.iter().map(|(&id, &at)| (id, at))
    }

    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.entries.keys().copied()
    }
}

impl<Id: Ord + Copy> FromIterator<(Id, DateTime<Utc>)> for CompletionMap<Id> {
    fn from_iter<T: IntoIterator<Item = (Id, DateTime<Utc>)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (id, at) in iter {
            map.insert(id, at);
        }
        map
    }
}
