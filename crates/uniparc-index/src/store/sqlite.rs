//! SQLite-backed [`KvStore`]
//!
//! One file per index. A writable store takes an exclusive lock on open, so
//! neither another writer nor a reader can open it until it is closed, and
//! keeps every write inside a single transaction that only [`KvStore::close`]
//! commits: a load that dies half way leaves the previous file contents (or an
//! empty file) behind, never a partial index. Dropping an unclosed store rolls
//! the transaction back.

use crate::error::{IndexError, Result};
use crate::store::{schema, KvStore, StoreOptions};
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Bound on `?` placeholders per lookup statement
const MAX_KEYS_PER_STATEMENT: usize = 900;

/// How long to wait for a lock when no-wait is off
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Index store in a single SQLite file
pub struct SqliteStore {
    conn: Connection,
    path: PathBuf,
    writable: bool,
    in_transaction: bool,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .field("writable", &self.writable)
            .field("in_transaction", &self.in_transaction)
            .finish()
    }
}

impl SqliteStore {
    /// Open a store. Every failure is reported as [`IndexError::StoreOpen`].
    pub fn open(options: &StoreOptions) -> Result<Self> {
        if options.writable {
            Self::open_writable(options)
        } else {
            Self::open_read_only(options)
        }
    }

    fn open_writable(options: &StoreOptions) -> Result<Self> {
        let path = options.path.as_path();
        let fail = |e: rusqlite::Error| IndexError::store_open(path, e);

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(fail)?;

        configure_busy_timeout(&conn, options.no_wait).map_err(fail)?;
        conn.pragma_update_and_check(None, "locking_mode", "EXCLUSIVE", |row| {
            row.get::<_, String>(0)
        })
        .map_err(fail)?;
        conn.pragma_update(None, "synchronous", if options.sync_hard { "FULL" } else { "OFF" })
            .map_err(fail)?;

        // EXCLUSIVE keeps readers out as well; with locking_mode=EXCLUSIVE the
        // lock is held until the connection closes.
        conn.execute_batch("BEGIN EXCLUSIVE").map_err(fail)?;

        if options.truncate {
            schema::reset(&conn).map_err(fail)?;
        } else {
            schema::create(&conn).map_err(fail)?;
        }
        schema::record_creation(&conn, options.num_buckets).map_err(fail)?;
        schema::verify(&conn).map_err(|reason| IndexError::store_open(path, reason))?;

        debug!(
            path = %path.display(),
            truncate = options.truncate,
            sync_hard = options.sync_hard,
            "Opened store for writing"
        );

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            writable: true,
            in_transaction: true,
        })
    }

    fn open_read_only(options: &StoreOptions) -> Result<Self> {
        let path = options.path.as_path();
        let fail = |e: rusqlite::Error| IndexError::store_open(path, e);

        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(fail)?;

        configure_busy_timeout(&conn, options.no_wait).map_err(fail)?;
        schema::verify(&conn).map_err(|reason| IndexError::store_open(path, reason))?;

        debug!(path = %path.display(), "Opened store read-only");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            writable: false,
            in_transaction: false,
        })
    }

    /// Create a writable in-memory store (for testing)
    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("BEGIN")?;
        schema::create(&conn)?;
        schema::record_creation(&conn, 0)?;

        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
            writable: true,
            in_transaction: true,
        })
    }

    /// Store file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Sizing hint recorded when the store was created
    pub fn num_buckets(&self) -> Result<Option<u64>> {
        let raw = schema::read_meta(&self.conn, "num_buckets")?;
        Ok(raw.and_then(|v| v.parse().ok()))
    }

    /// Number of distinct keys held
    pub fn len(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(IndexError::ReadOnly(self.path.display().to_string()))
        }
    }
}

fn configure_busy_timeout(conn: &Connection, no_wait: bool) -> rusqlite::Result<()> {
    conn.busy_timeout(if no_wait { Duration::ZERO } else { BUSY_TIMEOUT })
}

impl KvStore for SqliteStore {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_writable()?;

        let mut stmt = self.conn.prepare_cached(
            r#"
            INSERT INTO entries (hash, value) VALUES (?1, ?2)
            ON CONFLICT(hash) DO UPDATE SET value = excluded.value
            "#,
        )?;
        stmt.execute(params![key, value])?;
        Ok(())
    }

    fn set_and_get(&mut self, key: &str, value: &str) -> Result<Option<String>> {
        self.ensure_writable()?;

        let previous: Option<String> = {
            let mut stmt = self
                .conn
                .prepare_cached("SELECT value FROM entries WHERE hash = ?1")?;
            stmt.query_row(params![key], |row| row.get(0)).optional()?
        };

        self.set(key, value)?;
        Ok(previous)
    }

    fn get_multi(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        let mut found = HashMap::with_capacity(keys.len());

        for chunk in keys.chunks(MAX_KEYS_PER_STATEMENT) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT hash, value FROM entries WHERE hash IN ({})",
                placeholders
            );

            let mut stmt = self.conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            for row in rows {
                let (key, value) = row?;
                found.insert(key, value);
            }
        }

        Ok(found)
    }

    fn close(self) -> Result<()> {
        let SqliteStore {
            conn,
            path,
            in_transaction,
            ..
        } = self;

        if in_transaction {
            conn.execute_batch("COMMIT")
                .map_err(|e| IndexError::store_close(&path, e))?;
        }

        conn.close()
            .map_err(|(_, e)| IndexError::store_close(&path, e))?;

        debug!(path = %path.display(), "Closed store");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_and_get_returns_previous() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        assert_eq!(store.set_and_get("H1", "id1").unwrap(), None);
        assert_eq!(store.set_and_get("H1", "id2").unwrap().as_deref(), Some("id1"));

        let found = store.get_multi(&keys(&["H1"])).unwrap();
        assert_eq!(found.get("H1").map(String::as_str), Some("id2"));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.set("abc", "lower").unwrap();

        let found = store.get_multi(&keys(&["ABC", "abc"])).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["abc"], "lower");
    }

    #[test]
    fn test_get_multi_skips_missing_and_collapses_repeats() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.set("A", "1").unwrap();
        store.set("B", "2").unwrap();

        let found = store.get_multi(&keys(&["A", "MISSING", "A", "B"])).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found["A"], "1");
        assert_eq!(found["B"], "2");

        assert!(store.get_multi(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_get_multi_spans_statement_chunks() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let all: Vec<String> = (0..2_500).map(|i| format!("H{:05}", i)).collect();
        for (i, key) in all.iter().enumerate() {
            if i % 2 == 0 {
                store.set(key, &format!("id{}", i)).unwrap();
            }
        }

        let found = store.get_multi(&all).unwrap();
        assert_eq!(found.len(), 1_250);
        assert_eq!(found["H02498"], "id2498");
        assert!(!found.contains_key("H02499"));
    }

    #[test]
    fn test_values_survive_close_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uniparc.db");

        let mut store = SqliteStore::open(&StoreOptions::create_truncate(&path, 100)).unwrap();
        store.set("H", "id1\tid2").unwrap();
        store.close().unwrap();

        let store = SqliteStore::open(&StoreOptions::read_only(&path)).unwrap();
        assert!(!store.is_writable());
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.num_buckets().unwrap(), Some(100));
        let found = store.get_multi(&keys(&["H"])).unwrap();
        assert_eq!(found["H"], "id1\tid2");
        store.close().unwrap();
    }

    #[test]
    fn test_truncate_discards_previous_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uniparc.db");

        let mut store = SqliteStore::open(&StoreOptions::create_truncate(&path, 10)).unwrap();
        store.set("OLD", "id-old").unwrap();
        store.close().unwrap();

        let mut store = SqliteStore::open(&StoreOptions::create_truncate(&path, 20)).unwrap();
        store.set("NEW", "id-new").unwrap();
        store.close().unwrap();

        let store = SqliteStore::open(&StoreOptions::read_only(&path)).unwrap();
        let found = store.get_multi(&keys(&["OLD", "NEW"])).unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("NEW"));
        assert_eq!(store.num_buckets().unwrap(), Some(20));
    }

    #[test]
    fn test_drop_without_close_rolls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uniparc.db");

        let mut store = SqliteStore::open(&StoreOptions::create_truncate(&path, 10)).unwrap();
        store.set("H", "id").unwrap();
        store.close().unwrap();

        {
            let mut store =
                SqliteStore::open(&StoreOptions::create_truncate(&path, 10)).unwrap();
            store.set("OTHER", "id").unwrap();
        }

        let store = SqliteStore::open(&StoreOptions::read_only(&path)).unwrap();
        let found = store.get_multi(&keys(&["H", "OTHER"])).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["H"], "id");
    }

    #[test]
    fn test_read_only_open_of_missing_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.db");

        let err = SqliteStore::open(&StoreOptions::read_only(&path)).unwrap_err();
        assert!(err.is_store_open());
        assert!(!path.exists());
    }

    #[test]
    fn test_open_of_foreign_file_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "UPI0000000001 D41D8CD98F00B204E9800998ECF8427E\n".repeat(64)).unwrap();

        let err = SqliteStore::open(&StoreOptions::read_only(&path)).unwrap_err();
        assert!(err.is_store_open());

        let err = SqliteStore::open(&StoreOptions::create_truncate(&path, 10)).unwrap_err();
        assert!(err.is_store_open());
    }

    #[test]
    fn test_writable_open_in_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no").join("such").join("uniparc.db");

        let err = SqliteStore::open(&StoreOptions::create_truncate(&path, 10)).unwrap_err();
        assert!(err.is_store_open());
    }

    #[test]
    fn test_second_writer_fails_fast() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uniparc.db");

        let _holder = SqliteStore::open(&StoreOptions::create_truncate(&path, 10)).unwrap();
        let err = SqliteStore::open(&StoreOptions::create_truncate(&path, 10)).unwrap_err();
        assert!(err.is_store_open());
    }

    #[test]
    fn test_reader_fails_fast_during_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uniparc.db");

        let mut store = SqliteStore::open(&StoreOptions::create_truncate(&path, 10)).unwrap();
        store.set("OLD", "x").unwrap();
        store.close().unwrap();

        let mut loader = SqliteStore::open(&StoreOptions::create_truncate(&path, 10)).unwrap();
        loader.set("NEW", "y").unwrap();

        let err = SqliteStore::open(&StoreOptions::read_only(&path)).unwrap_err();
        assert!(err.is_store_open());

        loader.close().unwrap();

        let reader = SqliteStore::open(&StoreOptions::read_only(&path)).unwrap();
        let found = reader.get_multi(&keys(&["OLD", "NEW"])).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["NEW"], "y");
    }

    #[test]
    fn test_read_only_store_rejects_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("uniparc.db");
        SqliteStore::open(&StoreOptions::create_truncate(&path, 10))
            .unwrap()
            .close()
            .unwrap();

        let mut store = SqliteStore::open(&StoreOptions::read_only(&path)).unwrap();
        assert!(matches!(store.set("H", "id"), Err(IndexError::ReadOnly(_))));
        assert!(matches!(
            store.set_and_get("H", "id"),
            Err(IndexError::ReadOnly(_))
        ));
    }
}
