//! fdb: a frecency-ranked directory database.
//!
//! Shell hooks record every directory the user visits; a jump function then
//! asks for the best match for a few patterns. Ranking blends how often and
//! how recently a directory was visited. Each call is a separate short-lived
//! process, so all state lives in one JSONL file guarded by an advisory lock.
//!
//! # Example
//!
//! ```no_run
//! use fdb::{Config, Store};
//!
//! let store = Store::open(Config::from_env());
//!
//! // Record visits
//! store.record("/home/user/src/fdb").unwrap();
//! store.record("/home/user/docs").unwrap();
//!
//! // Best match for a pattern
//! let best = store.query(&["src"]).unwrap().next();
//! assert_eq!(best.as_deref(), Some("/home/user/src/fdb"));
//!
//! // Forget a directory that no longer exists
//! store.delete("/home/user/docs").unwrap();
//! ```

mod history;
mod lock;
mod storage;
mod store;
mod types;

pub mod config;

// Re-export public API
pub use config::Config;
pub use history::History;
pub use lock::FileLock;
pub use storage::{Mutation, Storage, parse_entries};
pub use store::{Matches, Store, StoreError, normalize_path};
pub use types::{Entry, MatchMode, SortBy};
