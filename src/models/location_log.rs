use std::collections::VecDeque;

use crate::models::location::LocationRecord;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// Bounded log of past overrides, at most one entry per location name.
///
/// Entries are kept oldest-first; reads for display go through
/// [`HistoryLog::newest_first`].
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: VecDeque<LocationRecord>,
    capacity: usize,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuilds a log from persisted oldest-first records by replaying inserts.
    pub fn from_records(records: impl IntoIterator<Item = LocationRecord>, capacity: usize) -> Self {
        let mut log = Self::new(capacity);
        for record in records {
            log.insert(record);
        }
        log
    }

    /// Records `location` as the most recent entry, returning the evicted oldest entry if any.
    pub fn insert(&mut self, location: LocationRecord) -> Option<LocationRecord> {
        self.entries.retain(|entry| !entry.same_location(&location));
        self.entries.push_back(location);
        if self.entries.len() > self.capacity {
            self.entries.pop_front()
        } else {
            None
        }
    }

    pub fn remove(&mut self, location: &LocationRecord) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.same_location(location));
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, location: &LocationRecord) -> bool {
        self.entries.iter().any(|entry| entry.same_location(location))
    }

    pub fn newest_first(&self) -> Vec<LocationRecord> {
        self.entries.iter().rev().cloned().collect()
    }

    pub fn oldest_first(&self) -> Vec<LocationRecord> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for HistoryLog {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// User-curated locations, unique by name, in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct FavoritesSet {
    entries: Vec<LocationRecord>,
}

impl FavoritesSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first persisted occurrence of each name.
    pub fn from_records(records: impl IntoIterator<Item = LocationRecord>) -> Self {
        let mut set = Self::new();
        for record in records {
            set.add(record);
        }
        set
    }

    /// Appends `location` unless a favorite with the same name exists.
    pub fn add(&mut self, location: LocationRecord) -> bool {
        if self.contains(&location) {
            return false;
        }
        self.entries.push(location);
        true
    }

    /// Removes every favorite sharing the name of `location`.
    pub fn remove(&mut self, location: &LocationRecord) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.same_location(location));
        before - self.entries.len()
    }

    pub fn contains(&self, location: &LocationRecord) -> bool {
        self.entries.iter().any(|entry| entry.same_location(location))
    }

    pub fn to_vec(&self) -> Vec<LocationRecord> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
