//! Core data types for the frecency database.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Constant term of the frecency denominator.
const FRECENCY_BASE: f64 = 0.25;

/// Decay per second of age.
const FRECENCY_DECAY: f64 = 3e-6;

/// Visit statistics for one directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    /// Absolute directory path, unique within the database
    pub path: String,

    /// Number of recorded visits (always >= 1 once persisted)
    pub hits: u32,

    /// Most recent recorded visit, whole seconds
    #[serde(with = "chrono::serde::ts_seconds")]
    pub last_access: DateTime<Utc>,
}

impl Entry {
    /// Create an entry for a first visit at `now`.
    pub fn new(path: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            hits: 1,
            last_access: now.trunc_subsecs(0),
        }
    }

    /// Record another visit at `now`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.hits = self.hits.saturating_add(1);
        self.last_access = now.trunc_subsecs(0);
    }

    /// Seconds since the last visit, clamped to zero for timestamps in the future.
    pub fn age(&self, now: DateTime<Utc>) -> i64 {
        (now - self.last_access).num_seconds().max(0)
    }

    /// Blend of visit count and recency: `hits / (0.25 + 3e-6 * age)`.
    pub fn frecency(&self, now: DateTime<Utc>) -> f64 {
        self.hits as f64 / (FRECENCY_BASE + FRECENCY_DECAY * self.age(now) as f64)
    }

    /// Ordering used for ranking and eviction: higher frecency first, then more
    /// recent, then path ascending. The last element under this order is the one
    /// evicted first.
    pub fn rank(&self, other: &Entry, now: DateTime<Utc>) -> Ordering {
        other
            .frecency(now)
            .total_cmp(&self.frecency(now))
            .then_with(|| other.last_access.cmp(&self.last_access))
            .then_with(|| self.path.cmp(&other.path))
    }

    /// Ordering for an arbitrary sort mode.
    pub fn sort_cmp(&self, other: &Entry, sort_by: SortBy, now: DateTime<Utc>) -> Ordering {
        match sort_by {
            SortBy::Frecency => self.rank(other, now),
            SortBy::Atime => other
                .last_access
                .cmp(&self.last_access)
                .then_with(|| other.hits.cmp(&self.hits))
                .then_with(|| self.path.cmp(&other.path)),
            SortBy::Hits => other
                .hits
                .cmp(&self.hits)
                .then_with(|| other.last_access.cmp(&self.last_access))
                .then_with(|| self.path.cmp(&other.path)),
        }
    }
}

/// How query results are ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    /// Combined frequency and recency
    #[default]
    Frecency,
    /// Most recently visited first
    Atime,
    /// Most visited first
    Hits,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frecency" => Ok(SortBy::Frecency),
            "atime" => Ok(SortBy::Atime),
            "hits" => Ok(SortBy::Hits),
            other => Err(format!("unknown sort method '{}' (expected frecency, atime or hits)", other)),
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortBy::Frecency => write!(f, "frecency"),
            SortBy::Atime => write!(f, "atime"),
            SortBy::Hits => write!(f, "hits"),
        }
    }
}

/// How query patterns are matched against a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Every pattern is a substring of the path, in any position
    #[default]
    Contains,
    /// Every pattern is a substring, and they occur in the given order without overlapping
    Ordered,
}

impl MatchMode {
    /// Check whether `path` satisfies all `patterns`. No patterns matches everything.
    pub fn matches<S: AsRef<str>>(&self, path: &str, patterns: &[S]) -> bool {
        match self {
            MatchMode::Contains => patterns.iter().all(|p| path.contains(p.as_ref())),
            MatchMode::Ordered => {
                let mut rest = path;
                for pattern in patterns {
                    let pattern = pattern.as_ref();
                    match rest.find(pattern) {
                        Some(pos) => rest = &rest[pos + pattern.len()..],
                        None => return false,
                    }
                }
                true
            }
        }
    }
}
