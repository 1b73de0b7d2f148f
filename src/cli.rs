//! CLI argument parsing for fdb.

use clap::{Parser, Subcommand};
use fdb::SortBy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fdb",
    about = "Frecency-ranked directory database for shell jump hooks",
    version,
    after_help = "Environment: FDB_DB_PATH (default ~/.fdb), FDB_HISTORY_SIZE (default 600)\n\
                  Logs are written to: ~/.local/share/fdb/logs/fdb.log (set RUST_LOG to enable)"
)]
pub struct Cli {
    /// Path to the database file (overrides FDB_DB_PATH)
    #[arg(short = 'i', long, global = true)]
    pub db_path: Option<PathBuf>,

    /// Don't limit the size of the database
    #[arg(short, long, global = true)]
    pub unlimited: bool,

    /// Sort method for queries (frecency, atime, hits)
    #[arg(short, long, global = true, default_value_t = SortBy::Frecency)]
    pub sort_by: SortBy,

    /// Require query patterns to appear in the given order
    #[arg(long, global = true)]
    pub ordered: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record visits to directories
    #[command(visible_alias = "a")]
    Add {
        /// Absolute directory paths
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print matching directories, best first
    #[command(visible_alias = "q")]
    Query {
        /// Substrings every result must contain (none lists everything)
        patterns: Vec<String>,
    },

    /// Remove directories from the database
    #[command(visible_alias = "d")]
    Delete {
        /// Absolute directory paths
        #[arg(required = true)]
        paths: Vec<String>,
    },
}
