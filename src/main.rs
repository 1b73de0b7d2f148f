//! fdb CLI - frecency-ranked directory database.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use fdb::{Config, MatchMode, Store};
use log::{info, warn};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

mod cli;

use cli::{Cli, Command};

/// Open (or create) the append-only log file under `log_dir`.
fn open_log_file(log_dir: &Path) -> Result<(fs::File, PathBuf)> {
    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("fdb.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .context("Failed to open log file")?;

    Ok((file, log_file))
}

/// Log to the data directory when possible, otherwise to stderr. Never fails.
fn setup_logging() {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fdb")
        .join("logs");

    let mut builder = env_logger::Builder::from_default_env();
    match open_log_file(&log_dir) {
        Ok((file, log_file)) => {
            builder.target(env_logger::Target::Pipe(Box::new(file))).init();
            info!("Logging initialized, writing to: {}", log_file.display());
        }
        Err(e) => {
            builder.target(env_logger::Target::Stderr).init();
            warn!("Logging to stderr: {:#}", e);
        }
    }
}

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::from_env().sort_by(cli.sort_by);

    if let Some(path) = &cli.db_path {
        config = config.db_path(path);
    }
    if cli.unlimited {
        config = config.unlimited();
    }
    if cli.ordered {
        config = config.match_mode(MatchMode::Ordered);
    }

    config
}

/// Print one path per line, stopping quietly if the reader went away
/// (`fdb query foo | head -n 1`).
fn print_paths(paths: impl Iterator<Item = String>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    for path in paths {
        if let Err(e) = writeln!(out, "{}", path) {
            return match e.kind() {
                io::ErrorKind::BrokenPipe => Ok(()),
                _ => Err(e).context("Failed to write to stdout"),
            };
        }
    }

    match out.flush() {
        Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e).context("Failed to flush stdout"),
        _ => Ok(()),
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli);
    info!("Database: {}", config.db_path.display());
    let store = Store::open(config);

    match cli.command {
        Command::Add { paths } => {
            store.record_all(&paths).context("Failed to add paths")?;
        }

        Command::Query { patterns } => {
            let matches = store.query(&patterns).context("Failed to query database")?;
            print_paths(matches)?;
        }

        Command::Delete { paths } => {
            let removed = store.delete_all(&paths).context("Failed to delete paths")?;
            info!("Removed {} of {} path(s)", removed, paths.len());
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    setup_logging();

    let cli = Cli::parse();
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_log_file_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("fdb").join("logs");

        let (_file, log_file) = open_log_file(&log_dir).unwrap();

        assert_eq!(log_file, log_dir.join("fdb.log"));
        assert!(log_file.is_file());
    }

    #[test]
    fn test_open_log_file_under_plain_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        fs::write(&blocker, "").unwrap();

        assert!(open_log_file(&blocker.join("logs")).is_err());
    }
}
