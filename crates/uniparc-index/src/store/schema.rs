//! SQLite schema for the index store

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

/// Format marker written to `meta` on creation
pub const FORMAT: &str = "uniparc-index/1";

/// Create the tables if they do not exist yet
pub fn create(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            hash TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        ) WITHOUT ROWID
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        )
        "#,
        [],
    )?;

    Ok(())
}

/// Drop and recreate all tables
pub fn reset(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute("DROP TABLE IF EXISTS entries", [])?;
    conn.execute("DROP TABLE IF EXISTS meta", [])?;
    create(conn)
}

/// Record format and sizing. Existing values win, so `num_buckets` only
/// takes effect for a newly created store.
pub fn record_creation(conn: &Connection, num_buckets: u64) -> rusqlite::Result<()> {
    let created_at = Utc::now().to_rfc3339();
    let rows: [(&str, String); 3] = [
        ("format", FORMAT.to_string()),
        ("num_buckets", num_buckets.to_string()),
        ("created_at", created_at),
    ];

    let mut stmt = conn.prepare("INSERT OR IGNORE INTO meta (key, value) VALUES (?1, ?2)")?;
    for (key, value) in rows.iter() {
        stmt.execute(params![key, value])?;
    }

    Ok(())
}

/// Read a `meta` value
pub fn read_meta(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| {
        row.get(0)
    })
    .optional()
}

/// Check that `conn` holds an index in a format this build understands.
/// Returns a human-readable reason on mismatch.
pub fn verify(conn: &Connection) -> Result<(), String> {
    match read_meta(conn, "format") {
        Ok(Some(format)) if format == FORMAT => Ok(()),
        Ok(Some(format)) => Err(format!("unsupported index format '{}'", format)),
        Ok(None) => Err("missing index format marker".to_string()),
        Err(e) => Err(format!("not a UniParc index ({})", e)),
    }
}
