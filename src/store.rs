//! High-level store API: record, query and delete.

use crate::config::Config;
use crate::storage::{Mutation, Storage};
use crate::types::Entry;
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use std::path::{Component, Path, PathBuf};

/// Errors that can occur during store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Path given to record/delete is not absolute.
    RelativePath(String),
    /// Another process held the database lock for too long.
    LockTimeout(PathBuf),
    /// Database or lock file is not accessible.
    PermissionDenied(PathBuf),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::RelativePath(path) => write!(f, "path is not absolute: {}", path),
            StoreError::LockTimeout(path) => write!(f, "timed out waiting for lock: {}", path.display()),
            StoreError::PermissionDenied(path) => write!(f, "permission denied: {}", path.display()),
        }
    }
}

impl std::error::Error for StoreError {}

/// Ranked query results, best match first. Consumed as it is iterated.
#[derive(Debug)]
pub struct Matches {
    inner: std::vec::IntoIter<Entry>,
}

impl Iterator for Matches {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.inner.next().map(|e| e.path)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Matches {}

/// The frecency database.
pub struct Store {
    config: Config,
    storage: Storage,
}

impl Store {
    /// Open the database described by `config`. The file is read lazily by each
    /// operation, so this never fails and never touches the disk.
    pub fn open(config: Config) -> Self {
        let storage = Storage::new(config.db_path.clone());
        Self { config, storage }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Record a visit to `path` now.
    pub fn record(&self, path: &str) -> Result<Entry> {
        self.record_at(path, Utc::now())
    }

    /// Record a visit to `path` at `now`.
    pub fn record_at(&self, path: &str, now: DateTime<Utc>) -> Result<Entry> {
        let mut recorded = self.record_all_at(&[path], now)?;
        recorded.pop().ok_or_else(|| eyre::eyre!("No entry recorded for {}", path))
    }

    /// Record visits to several paths in one critical section.
    pub fn record_all<S: AsRef<str>>(&self, paths: &[S]) -> Result<Vec<Entry>> {
        self.record_all_at(paths, Utc::now())
    }

    /// Record visits to several paths at `now`. Nothing is written unless every
    /// path is absolute.
    ///
    /// The returned entries reflect the state right after the visit; an entry
    /// may still be evicted by the same call if it ranks last.
    pub fn record_all_at<S: AsRef<str>>(&self, paths: &[S], now: DateTime<Utc>) -> Result<Vec<Entry>> {
        let paths = normalize_all(paths)?;
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        self.storage
            .with_exclusive_access(self.config.history_size, now, |history| {
                let recorded: Vec<Entry> = paths.iter().map(|p| history.touch(p, now).clone()).collect();
                for entry in &recorded {
                    log::debug!("Recorded {} (hits {})", entry.path, entry.hits);
                }
                Ok((recorded, Mutation::Changed))
            })
            .context("Failed to record visit")
    }

    /// Paths matching every pattern, best first.
    pub fn query<S: AsRef<str>>(&self, patterns: &[S]) -> Result<Matches> {
        self.query_at(patterns, Utc::now())
    }

    /// Paths matching every pattern, ranked as of `now`. Takes no lock: a query
    /// racing a writer sees either the old or the new file, never a mix.
    pub fn query_at<S: AsRef<str>>(&self, patterns: &[S], now: DateTime<Utc>) -> Result<Matches> {
        let history = self.storage.load().context("Failed to load database")?;
        let sort_by = self.config.sort_by;
        let match_mode = self.config.match_mode;

        let mut matched: Vec<Entry> = history
            .iter()
            .filter(|e| match_mode.matches(&e.path, patterns))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.sort_cmp(b, sort_by, now));

        log::debug!("Query {} pattern(s): {} match(es)", patterns.len(), matched.len());

        Ok(Matches {
            inner: matched.into_iter(),
        })
    }

    /// Remove `path` if present. Returns whether an entry was removed.
    pub fn delete(&self, path: &str) -> Result<bool> {
        Ok(self.delete_all(&[path])? > 0)
    }

    /// Remove several paths in one critical section. Absent paths are ignored.
    /// Returns the number of entries removed.
    pub fn delete_all<S: AsRef<str>>(&self, paths: &[S]) -> Result<usize> {
        self.delete_all_at(paths, Utc::now())
    }

    /// Remove several paths at `now`. The history is also trimmed to the
    /// configured size, so a database grown under a larger limit shrinks here.
    pub fn delete_all_at<S: AsRef<str>>(&self, paths: &[S], now: DateTime<Utc>) -> Result<usize> {
        let paths = normalize_all(paths)?;
        if paths.is_empty() {
            return Ok(0);
        }

        self.storage
            .with_exclusive_access(self.config.history_size, now, |history| {
                let removed = paths.iter().filter(|p| history.remove(p).is_some()).count();
                let mutation = if removed > 0 {
                    log::debug!("Deleted {} entr(ies)", removed);
                    Mutation::Changed
                } else {
                    Mutation::Unchanged
                };
                Ok((removed, mutation))
            })
            .context("Failed to delete entry")
    }

    /// Every entry, in rank order as of `now`.
    pub fn entries_at(&self, now: DateTime<Utc>) -> Result<Vec<Entry>> {
        let history = self.storage.load().context("Failed to load database")?;
        Ok(history.ranked(now))
    }

    /// Every entry, in rank order.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        self.entries_at(Utc::now())
    }
}

/// Normalize an absolute path: collapse repeated separators and `.`
/// components, drop trailing separators. `..` is kept as given.
pub fn normalize_path(path: &str) -> Result<String> {
    if !Path::new(path).is_absolute() {
        return Err(eyre::eyre!(StoreError::RelativePath(path.to_string())));
    }

    let normalized: PathBuf = Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    normalized
        .to_str()
        .map(String::from)
        .ok_or_else(|| eyre::eyre!("Path is not valid UTF-8: {}", path))
}

fn normalize_all<S: AsRef<str>>(paths: &[S]) -> Result<Vec<String>> {
    paths.iter().map(|p| normalize_path(p.as_ref())).collect()
}
