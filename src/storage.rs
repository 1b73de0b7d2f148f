//! Storage layer: JSONL database file with atomic replacement.

use crate::history::History;
use crate::lock::FileLock;
use crate::store::StoreError;
use crate::types::Entry;
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use std::fs::{self, File, OpenOptions, Permissions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Outcome of a mutation run under exclusive access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// History was modified and must be written back.
    Changed,
    /// Nothing to persist.
    Unchanged,
}

/// Storage handle for reading and writing the database file.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the database. A missing or unreadable file yields an empty history;
    /// only permission errors are reported.
    pub fn load(&self) -> Result<History> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("No database at {}, starting empty", self.path.display());
                return Ok(History::new());
            }
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(eyre::eyre!(StoreError::PermissionDenied(self.path.clone())));
            }
            Err(e) => {
                log::warn!("Failed to open {}: {}", self.path.display(), e);
                return Ok(History::new());
            }
        };

        match file.metadata() {
            Ok(meta) if !meta.is_file() => {
                log::warn!("{} is not a regular file, starting empty", self.path.display());
                return Ok(History::new());
            }
            Err(e) => {
                log::warn!("Failed to stat {}: {}", self.path.display(), e);
                return Ok(History::new());
            }
            Ok(_) => {}
        }

        Ok(parse_entries(BufReader::new(file)).collect())
    }

    /// Write the whole history to a temp file next to the database, then
    /// rename it over the target so readers never see a partial file.
    ///
    /// A symlinked database is written through to its target, and the
    /// existing file mode is kept.
    pub fn save(&self, history: &History) -> Result<()> {
        let target = self.write_target();
        let parent = match target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).wrap_err_with(|| format!("Failed to create directory {}", parent.display()))?;

        let file_name = target
            .file_name()
            .ok_or_else(|| eyre::eyre!("Database path has no file name: {}", target.display()))?;
        let temp_path = parent.join(format!(".{}.tmp.{}", file_name.to_string_lossy(), std::process::id()));
        let permissions = fs::metadata(&target).ok().map(|m| m.permissions());

        if let Err(e) = write_entries(&temp_path, history, permissions) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, &target) {
            let _ = fs::remove_file(&temp_path);
            return Err(map_io_error(e, &target)).context("Failed to replace database file");
        }

        // Persist the rename itself
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }

        log::debug!("Saved {} entries to {}", history.len(), self.path.display());
        Ok(())
    }

    /// File the temp file is renamed over: the symlink target if the database
    /// path is a symlink, else the path itself.
    fn write_target(&self) -> PathBuf {
        match fs::symlink_metadata(&self.path) {
            Ok(meta) if meta.file_type().is_symlink() => {
                fs::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone())
            }
            _ => self.path.clone(),
        }
    }

    /// Run one read-modify-write cycle while holding the database lock.
    ///
    /// The history is loaded, handed to `f`, trimmed to `limit` entries and
    /// saved if `f` reported a change or eviction removed something. The lock
    /// is released on every exit path.
    pub fn with_exclusive_access<T, F>(&self, limit: Option<usize>, now: DateTime<Utc>, f: F) -> Result<T>
    where
        F: FnOnce(&mut History) -> Result<(T, Mutation)>,
    {
        let _lock = FileLock::acquire(&self.path)?;

        let mut history = self.load()?;
        let (value, mutation) = f(&mut history)?;

        let mut dirty = mutation == Mutation::Changed;
        if let Some(limit) = limit {
            for entry in history.evict(limit, now) {
                log::info!("Evicted {} (hits {}, score {:.4})", entry.path, entry.hits, entry.frecency(now));
                dirty = true;
            }
        }

        if dirty {
            self.save(&history).context("Failed to save database")?;
        }

        Ok(value)
    }
}

/// Parse JSONL entries, skipping lines that are malformed or violate entry
/// invariants. Reading stops at the first I/O error.
pub fn parse_entries<R: BufRead>(reader: R) -> impl Iterator<Item = Entry> {
    let lines = reader.lines().enumerate().map_while(|(index, line)| match line {
        Ok(l) => Some((index + 1, l)),
        Err(e) => {
            log::warn!("Stopped reading at line {}: {}", index + 1, e);
            None
        }
    });

    lines.filter_map(|(line_no, line)| {
        if line.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<Entry>(&line) {
            Ok(entry) if entry.hits == 0 => {
                log::warn!("Skipping entry with zero hits at line {}", line_no);
                None
            }
            Ok(entry) if !Path::new(&entry.path).is_absolute() => {
                log::warn!("Skipping relative path at line {}: {}", line_no, entry.path);
                None
            }
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Failed to parse entry at line {}: {}", line_no, e);
                None
            }
        }
    })
}

fn write_entries(path: &Path, history: &History, permissions: Option<Permissions>) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|e| map_io_error(e, path))
        .context("Failed to create temporary database file")?;
    if let Some(permissions) = permissions {
        file.set_permissions(permissions)
            .context("Failed to copy database permissions")?;
    }

    let mut writer = BufWriter::new(file);
    for entry in history.sorted_by_path() {
        let json = serde_json::to_string(entry).context("Failed to serialize entry")?;
        writeln!(writer, "{}", json).context("Failed to write temporary database file")?;
    }

    let file = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Failed to flush temporary database file")?;
    file.sync_all().context("Failed to sync temporary database file")?;

    Ok(())
}

fn map_io_error(e: io::Error, path: &Path) -> eyre::Report {
    match e.kind() {
        io::ErrorKind::PermissionDenied => eyre::eyre!(StoreError::PermissionDenied(path.to_path_buf())),
        _ => eyre::Report::new(e),
    }
}
