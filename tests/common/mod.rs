//! Shared test infrastructure for fdb integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use fdb::{Config, Entry, Storage, Store};
use std::path::PathBuf;
use tempfile::TempDir;

/// Fixed reference time so scores are deterministic.
pub const NOW: i64 = 1_700_000_000;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn now() -> DateTime<Utc> {
    at(NOW)
}

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Store,
}

impl TestEnv {
    /// Create a new test environment with the default history size.
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// Create a test environment with a bounded history.
    pub fn with_limit(limit: usize) -> Self {
        Self::with_config(Config::new().history_size(limit))
    }

    /// Create a test environment from a config; the database path is replaced.
    pub fn with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::open(config.db_path(temp_dir.path().join("fdb.jsonl")));
        Self { temp_dir, store }
    }

    pub fn db_path(&self) -> PathBuf {
        self.store.config().db_path.clone()
    }

    /// Another handle on the same database, as a separate process would have.
    pub fn reopen(&self) -> Store {
        Store::open(self.store.config().clone())
    }

    /// Raw storage for the database file.
    pub fn storage(&self) -> Storage {
        Storage::new(self.db_path())
    }

    /// Record a visit at a fixed time.
    pub fn record_at(&self, path: &str, secs: i64) -> Entry {
        self.store.record_at(path, at(secs)).expect("Failed to record")
    }

    /// Record a visit at the reference time.
    pub fn record(&self, path: &str) -> Entry {
        self.record_at(path, NOW)
    }

    /// Query at the reference time.
    pub fn query(&self, patterns: &[&str]) -> Vec<String> {
        self.store.query_at(patterns, now()).expect("Failed to query").collect()
    }

    /// Look up one entry.
    pub fn entry(&self, path: &str) -> Option<Entry> {
        self.storage().load().expect("Failed to load").get(path).cloned()
    }

    /// Number of stored entries.
    pub fn total_count(&self) -> usize {
        self.storage().load().expect("Failed to load").len()
    }

    /// Assert the stored paths, ignoring order.
    pub fn assert_paths(&self, expected: &[&str]) {
        let mut actual: Vec<String> = self
            .storage()
            .load()
            .expect("Failed to load")
            .iter()
            .map(|e| e.path.clone())
            .collect();
        actual.sort();
        let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        expected.sort();
        assert_eq!(actual, expected, "Unexpected database contents");
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
