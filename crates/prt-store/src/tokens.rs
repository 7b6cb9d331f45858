//! Token database reads and writes.

use std::path::Path;

use chrono::{DateTime, Utc};
use prt_types::{Token, TokenBatch};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::{open, open_read_only, persist_new, remove_database, temp_sibling, Result, StoreError};

/// A batch read back from a token database.
#[derive(Debug)]
pub struct StoredBatch {
    /// Row id, increasing in write order.
    pub id: i64,
    pub issued_at: DateTime<Utc>,
    /// Timestamps are truncated to whole seconds.
    pub batch: TokenBatch,
}

/// Insert one batch and its tokens in a single transaction.
///
/// Returns the new batch id.
pub fn insert_batch(
    conn: &mut Connection,
    batch: &TokenBatch,
    issued_at: DateTime<Utc>,
) -> Result<i64> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO batches (public_key, p_reveal, epoch_end, issued_at)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            batch.public_key.as_slice(),
            f64::from(batch.p_reveal),
            batch.epoch_end.timestamp(),
            issued_at.timestamp(),
        ],
    )?;
    let batch_id = tx.last_insert_rowid();
    {
        let mut stmt =
            tx.prepare("INSERT INTO tokens (batch_id, position, token) VALUES (?1, ?2, ?3)")?;
        for (position, token) in batch.tokens.iter().enumerate() {
            stmt.execute(rusqlite::params![
                batch_id,
                position as i64,
                token.to_bytes().as_slice(),
            ])?;
        }
    }
    tx.commit()?;
    Ok(batch_id)
}

fn timestamp(secs: i64, column: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Corrupt(format!("{column} out of range: {secs}")))
}

/// All batches in write order, tokens in issuance order.
pub fn load_batches(conn: &Connection) -> Result<Vec<StoredBatch>> {
    let mut batch_stmt = conn.prepare(
        "SELECT id, public_key, p_reveal, epoch_end, issued_at FROM batches ORDER BY id",
    )?;
    let rows = batch_stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, Vec<u8>>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut token_stmt =
        conn.prepare("SELECT token FROM tokens WHERE batch_id = ?1 ORDER BY position")?;

    let mut batches = Vec::with_capacity(rows.len());
    for (id, public_key, p_reveal, epoch_end, issued_at) in rows {
        let public_key: [u8; 32] = public_key
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Corrupt(format!("batch {id}: bad public key length")))?;
        let tokens = token_stmt
            .query_map([id], |row| row.get::<_, Vec<u8>>(0))?
            .map(|blob| {
                let blob = blob?;
                Token::from_bytes(&blob).map_err(|e| StoreError::Corrupt(format!("batch {id}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        batches.push(StoredBatch {
            id,
            issued_at: timestamp(issued_at, "issued_at")?,
            batch: TokenBatch {
                tokens,
                public_key,
                p_reveal: p_reveal as f32,
                epoch_end: timestamp(epoch_end, "epoch_end")?,
            },
        });
    }
    Ok(batches)
}

/// Persist a batch to the token database at `path`.
///
/// An existing database gains one more batch in a single transaction and
/// keeps everything already in it. A new database is built beside `path` and
/// only appears at `path` once it holds the batch.
///
/// # Errors
///
/// - [`StoreError::Unwritable`] if the database cannot be created
/// - [`StoreError::Sqlite`] if the insert fails; nothing from this batch is kept
pub fn write_tokens(batch: TokenBatch, path: &Path) -> Result<()> {
    let appended = path.exists();
    let batch_id = if appended {
        let mut conn = open(path)?;
        insert_batch(&mut conn, &batch, Utc::now())?
    } else {
        create_with_batch(&batch, path)?
    };

    info!(
        path = %path.display(),
        batch_id,
        tokens = batch.tokens.len(),
        appended,
        "wrote token batch"
    );
    Ok(())
}

fn create_with_batch(batch: &TokenBatch, path: &Path) -> Result<i64> {
    let temp = temp_sibling(path)?;
    let built = open(&temp).and_then(|mut conn| {
        let batch_id = insert_batch(&mut conn, batch, Utc::now())?;
        conn.close().map_err(|(_, e)| StoreError::Sqlite(e))?;
        Ok(batch_id)
    });
    let persisted = built.and_then(|batch_id| {
        persist_new(&temp, path)
            .map(|()| batch_id)
            .map_err(|source| StoreError::Unwritable {
                path: path.to_path_buf(),
                source,
            })
    });

    if persisted.is_err() {
        warn!(path = %path.display(), "discarding incomplete token database");
        remove_database(&temp);
    }
    persisted
}

/// Read every batch from an existing token database.
pub fn read_batches(path: &Path) -> Result<Vec<StoredBatch>> {
    let conn = open_read_only(path)?;
    load_batches(&conn)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::{open_memory, token_db_file_name};
    use chrono::TimeZone;
    use prt_types::{TOKEN_EPHEMERAL_SIZE, TOKEN_OPENING_SIZE, TOKEN_PAYLOAD_SIZE};

    fn token(fill: u8) -> Token {
        Token {
            ephemeral: [fill; TOKEN_EPHEMERAL_SIZE],
            body: [fill.wrapping_add(1); TOKEN_PAYLOAD_SIZE],
            opening: [fill.wrapping_add(2); TOKEN_OPENING_SIZE],
        }
    }

    fn batch(count: u8) -> TokenBatch {
        TokenBatch {
            tokens: (0..count).map(token).collect(),
            public_key: [0xAB; 32],
            p_reveal: 0.3,
            epoch_end: Utc
                .timestamp_opt(1_700_086_400, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn test_insert_and_load() {
        let mut conn = open_memory().expect("open");
        let original = batch(10);
        let id = insert_batch(&mut conn, &original, Utc::now()).expect("insert");

        let loaded = load_batches(&conn).expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, id);
        assert_eq!(loaded[0].batch.tokens, original.tokens);
        assert_eq!(loaded[0].batch.public_key, original.public_key);
        assert_eq!(loaded[0].batch.p_reveal, 0.3);
        assert_eq!(loaded[0].batch.epoch_end, original.epoch_end);
    }

    #[test]
    fn test_write_creates_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let original = batch(4);
        let path = dir.path().join(token_db_file_name(&original.epoch_end));
        write_tokens(original.clone(), &path).expect("write");

        let stored = read_batches(&path).expect("read");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].batch.tokens, original.tokens);
        assert!(!std::path::PathBuf::from(format!("{}-journal", path.display())).exists());

        let names: Vec<String> = fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, [token_db_file_name(&original.epoch_end)]);
    }

    #[test]
    fn test_append_keeps_earlier_batches() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shared.db");
        write_tokens(batch(3), &path).expect("first");
        write_tokens(batch(5), &path).expect("second");

        let stored = read_batches(&path).expect("read");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].batch.tokens.len(), 3);
        assert_eq!(stored[1].batch.tokens.len(), 5);
        assert!(stored[0].id < stored[1].id);
    }

    #[test]
    fn test_failed_fresh_write_leaves_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.db");
        let mut bad = batch(2);
        bad.p_reveal = 2.0;

        assert!(matches!(write_tokens(bad, &path), Err(StoreError::Sqlite(_))));
        assert!(!path.exists());
        assert_eq!(fs::read_dir(dir.path()).expect("read_dir").count(), 0);
    }

    #[test]
    fn test_failed_append_keeps_existing_batches() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shared.db");
        write_tokens(batch(3), &path).expect("first");

        let mut bad = batch(2);
        bad.p_reveal = -1.0;
        assert!(write_tokens(bad, &path).is_err());

        let stored = read_batches(&path).expect("read");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].batch.tokens.len(), 3);
    }

    #[test]
    fn test_foreign_file_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("junk.db");
        fs::write(&path, b"definitely not sqlite").expect("write junk");
        assert!(write_tokens(batch(1), &path).is_err());
        assert!(path.exists(), "pre-existing files are never removed");
        assert!(read_batches(&dir.path().join("missing.db")).is_err());
    }
}
