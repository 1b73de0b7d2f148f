//! Runtime configuration from environment variables and CLI overrides.

use crate::types::{MatchMode, SortBy};
use std::path::{Path, PathBuf};

/// Environment variable naming the database file.
pub const DB_PATH_ENV: &str = "FDB_DB_PATH";

/// Environment variable bounding the number of entries.
pub const HISTORY_SIZE_ENV: &str = "FDB_HISTORY_SIZE";

/// Database location when `FDB_DB_PATH` is unset.
pub const DEFAULT_DB_PATH: &str = "~/.fdb";

/// Entry limit when `FDB_HISTORY_SIZE` is unset or invalid.
pub const DEFAULT_HISTORY_SIZE: usize = 600;

/// Settings for a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database file
    pub db_path: PathBuf,
    /// Maximum number of entries (None = unlimited)
    pub history_size: Option<usize>,
    /// Query result ordering
    pub sort_by: SortBy,
    /// Query pattern semantics
    pub match_mode: MatchMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: expand_home(DEFAULT_DB_PATH),
            history_size: Some(DEFAULT_HISTORY_SIZE),
            sort_by: SortBy::default(),
            match_mode: MatchMode::default(),
        }
    }
}

impl Config {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `FDB_DB_PATH` and `FDB_HISTORY_SIZE` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup(DB_PATH_ENV)
            .filter(|p| !p.is_empty())
            .map(|p| expand_home(&p))
            .unwrap_or_else(|| expand_home(DEFAULT_DB_PATH));

        let history_size = match lookup(HISTORY_SIZE_ENV) {
            None => DEFAULT_HISTORY_SIZE,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    log::debug!(
                        "Ignoring invalid {}={:?}, using {}",
                        HISTORY_SIZE_ENV,
                        raw,
                        DEFAULT_HISTORY_SIZE
                    );
                    DEFAULT_HISTORY_SIZE
                }
            },
        };

        Self {
            db_path,
            history_size: Some(history_size),
            ..Self::default()
        }
    }

    /// Set the database path (a leading `~` is expanded).
    pub fn db_path(mut self, path: impl AsRef<Path>) -> Self {
        self.db_path = match path.as_ref().to_str() {
            Some(s) => expand_home(s),
            None => path.as_ref().to_path_buf(),
        };
        self
    }

    /// Set the entry limit; zero is ignored.
    pub fn history_size(mut self, size: usize) -> Self {
        if size > 0 {
            self.history_size = Some(size);
        }
        self
    }

    /// Disable eviction.
    pub fn unlimited(mut self) -> Self {
        self.history_size = None;
        self
    }

    pub fn sort_by(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    pub fn match_mode(mut self, match_mode: MatchMode) -> Self {
        self.match_mode = match_mode;
        self
    }
}

/// Replace a leading `~` with the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };

    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}
