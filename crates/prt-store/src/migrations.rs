//! Token database migrations.
//!
//! Schema version stored in `PRAGMA user_version`. Migrations are forward-only.

use rusqlite::Connection;

use crate::{schema, Result, StoreError, SCHEMA_VERSION};

fn user_version(conn: &Connection) -> Result<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Run all pending migrations.
pub fn run(conn: &Connection) -> Result<()> {
    let current_version = user_version(conn)?;

    if current_version == 0 {
        tracing::debug!("initializing token database schema v{SCHEMA_VERSION}");
        conn.execute_batch(schema::SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        for version in (current_version + 1)..=SCHEMA_VERSION {
            tracing::info!("running token database migration to v{version}");
            run_migration(conn, version)?;
            conn.pragma_update(None, "user_version", version)?;
        }
    } else if current_version > SCHEMA_VERSION {
        return Err(StoreError::Migration(format!(
            "database version {current_version} is newer than supported {SCHEMA_VERSION}"
        )));
    }

    Ok(())
}

/// Fail unless the database is exactly at [`SCHEMA_VERSION`].
///
/// Used on read-only handles, which cannot migrate.
pub fn check_current(conn: &Connection) -> Result<()> {
    match user_version(conn)? {
        SCHEMA_VERSION => Ok(()),
        0 => Err(StoreError::Corrupt("not a token database".into())),
        other => Err(StoreError::Migration(format!(
            "database version {other} does not match supported {SCHEMA_VERSION}"
        ))),
    }
}

fn run_migration(_conn: &Connection, version: u32) -> Result<()> {
    Err(StoreError::Migration(format!(
        "unknown migration version: {version}"
    )))
}
