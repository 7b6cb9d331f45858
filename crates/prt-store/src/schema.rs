//! SQL schema definitions.

/// Token database schema, version 1.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS batches (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    public_key BLOB NOT NULL CHECK (length(public_key) = 32),
    p_reveal REAL NOT NULL CHECK (p_reveal >= 0.0 AND p_reveal <= 1.0),
    epoch_end INTEGER NOT NULL,
    issued_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS tokens (
    batch_id INTEGER NOT NULL REFERENCES batches(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    token BLOB NOT NULL CHECK (length(token) = 89),
    PRIMARY KEY (batch_id, position)
);

CREATE INDEX IF NOT EXISTS idx_batches_epoch ON batches(epoch_end);
"#;
