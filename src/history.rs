//! In-memory view of the database: a mapping from path to visit statistics.

use crate::types::Entry;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// All tracked directories, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: HashMap<String, Entry>,
}

impl History {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert an entry, replacing any previous entry for the same path.
    pub fn insert(&mut self, entry: Entry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    /// Record a visit: bump an existing entry or create a new one.
    pub fn touch(&mut self, path: &str, now: DateTime<Utc>) -> &Entry {
        self.entries
            .entry(path.to_string())
            .and_modify(|e| e.touch(now))
            .or_insert_with(|| Entry::new(path, now))
    }

    /// Remove the entry for `path`, returning it if it was present.
    pub fn remove(&mut self, path: &str) -> Option<Entry> {
        self.entries.remove(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Entries sorted by path, the order they are written to disk in.
    pub fn sorted_by_path(&self) -> Vec<&Entry> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    /// Entries in rank order, best first.
    pub fn ranked(&self, now: DateTime<Utc>) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.rank(b, now));
        entries
    }

    /// Drop the lowest-ranked entries until at most `limit` remain.
    ///
    /// Scores are fixed for a given `now`, so cutting the ranked list once removes
    /// the same entries as repeatedly removing the minimum. Returns the evicted
    /// entries, worst first.
    pub fn evict(&mut self, limit: usize, now: DateTime<Utc>) -> Vec<Entry> {
        if self.entries.len() <= limit {
            return Vec::new();
        }

        let mut ranked = self.ranked(now);
        let mut evicted = ranked.split_off(limit);
        evicted.reverse();

        for entry in &evicted {
            self.entries.remove(&entry.path);
        }

        evicted
    }
}

impl FromIterator<Entry> for History {
    /// Later entries for the same path replace earlier ones.
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        let mut history = History::new();
        for entry in iter {
            history.insert(entry);
        }
        history
    }
}
