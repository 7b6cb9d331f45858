//! # prt-store
//!
//! Durable artifacts for one issuance run.
//!
//! - [`keys`] — the epoch key file (`keys-<stamp>.json`), written atomically
//! - [`tokens`] — the token database (`tokens-<stamp>.db`), one SQLite file
//!   holding one or more issued batches
//!
//! ## Token database
//!
//! - Foreign keys enforced
//! - Rollback journal, so a finished artifact is a single file
//! - Timestamps are Unix epoch seconds
//! - Schema version stored in `PRAGMA user_version`

pub mod keys;
pub mod migrations;
pub mod schema;
pub mod tokens;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use prt_types::epoch::format_epoch_stamp;
use rand::RngCore;
use rusqlite::{Connection, OpenFlags};

pub use keys::{read_keys, write_keys, StoredKeys};
pub use tokens::{read_batches, write_tokens, StoredBatch};

/// Current token database schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Storage error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The destination could not be created or written.
    #[error("cannot write {}: {source}", .path.display())]
    Unwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An existing artifact could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    /// An artifact parsed but its contents are inconsistent.
    #[error("corrupt artifact: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Key file name for an epoch ending at `epoch_end`.
pub fn key_file_name(epoch_end: &DateTime<Utc>) -> String {
    format!("keys-{}.json", format_epoch_stamp(epoch_end))
}

/// Token database name for an epoch ending at `epoch_end`.
pub fn token_db_file_name(epoch_end: &DateTime<Utc>) -> String {
    format!("tokens-{}.db", format_epoch_stamp(epoch_end))
}

/// Open or create a token database at the given path.
///
/// Configures pragmas and runs any pending migrations.
pub fn open(path: &Path) -> Result<Connection> {
    ensure_parent_dir(path)?;
    let conn = Connection::open(path).map_err(|e| StoreError::Unwritable {
        path: path.to_path_buf(),
        source: io::Error::other(e),
    })?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(StoreError::Unwritable {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
    }
    Ok(())
}

/// Open an existing token database without write access.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(StoreError::Unreadable {
            path: path.to_path_buf(),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    migrations::check_current(&conn)?;
    Ok(conn)
}

/// Open an in-memory database (for testing).
pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    migrations::run(&conn)?;
    Ok(conn)
}

/// Configure SQLite pragmas.
fn configure(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = DELETE;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = FULL;",
    )?;
    Ok(())
}

/// A fresh `.<name>.<hex>.tmp` path beside `path`.
pub(crate) fn temp_sibling(path: &Path) -> Result<PathBuf> {
    ensure_parent_dir(path)?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path.file_name().ok_or_else(|| StoreError::Unwritable {
        path: path.to_path_buf(),
        source: io::Error::from(io::ErrorKind::InvalidInput),
    })?;
    let mut suffix = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut suffix);
    Ok(parent.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        hex::encode(suffix)
    )))
}

/// Move a finished temp file to `path`.
///
/// Fails with [`io::ErrorKind::AlreadyExists`] instead of replacing an
/// existing `path`.
pub(crate) fn persist_new(temp: &Path, path: &Path) -> io::Result<()> {
    fs::hard_link(temp, path)?;
    let _ = fs::remove_file(temp);
    Ok(())
}

/// Create `path` holding `data`, via a temp file in the same directory.
///
/// The temp file is created with mode `0600` on Unix, synced, then linked to
/// `path`. An existing `path` is never replaced. On failure the temp file is
/// removed and `path` is untouched.
pub(crate) fn create_file_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temp_path = temp_sibling(path)?;

    let written = (|| -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        persist_new(&temp_path, path)
    })();

    if let Err(source) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::Unwritable {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

/// Remove a database file and any journal left beside it.
pub(crate) fn remove_database(path: &Path) {
    for suffix in ["", "-journal", "-wal", "-shm"] {
        let mut candidate = path.as_os_str().to_owned();
        candidate.push(suffix);
        let _ = fs::remove_file(PathBuf::from(candidate));
    }
}
