//! SQLite-backed record store.
//!
//! Records live in a single `file_records` table indexed by fingerprint.
//! Fingerprints are stored as lowercase hex; unreadable files have a NULL
//! fingerprint and are excluded from duplicate queries.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use super::{RecordStore, SinkError, SinkResult, StoredDuplicate};
use crate::scanner::{FileRecord, Fingerprint};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS file_records (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        path        TEXT NOT NULL,
        fingerprint TEXT,
        size        INTEGER NOT NULL,
        recorded_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_file_records_fingerprint
        ON file_records (fingerprint);
";

/// Persistent store in a SQLite database file.
pub struct SqliteStore {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteStore {
    /// Open (or create) a store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Open`] if the database cannot be opened, or
    /// [`SinkError::Database`] if the schema cannot be created.
    pub fn open(path: &Path) -> SinkResult<Self> {
        let conn = Connection::open(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::trace!("Record store journal mode: {}", mode);
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::with_connection(conn)
    }

    /// Open a throwaway in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if SQLite cannot allocate the database.
    pub fn open_in_memory() -> SinkResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> SinkResult<Self> {
        conn.execute_batch(SCHEMA)?;
        log::debug!("Record store ready at {:?}", conn.path());
        Ok(Self { conn })
    }

    /// Total rows stored.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the count query fails.
    pub fn record_count(&self) -> SinkResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn insert(conn: &Connection, record: &FileRecord, recorded_at: &str) -> SinkResult<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO file_records (path, fingerprint, size, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        stmt.execute(params![
            record.path().to_string_lossy(),
            record.fingerprint().map(|fp| fp.to_hex()),
            record.size() as i64,
            recorded_at,
        ])?;
        Ok(())
    }
}

impl RecordStore for SqliteStore {
    fn append(&mut self, record: &FileRecord) -> SinkResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        Self::insert(&self.conn, record, &now)
    }

    fn append_batch(&mut self, records: &[FileRecord]) -> SinkResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for record in records {
            Self::insert(&tx, record, &now)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn query_by_fingerprint(&self, fingerprint: &Fingerprint) -> SinkResult<Vec<PathBuf>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT path FROM file_records
             WHERE fingerprint = ?1
             GROUP BY path
             ORDER BY MIN(id)",
        )?;
        let rows = stmt.query_map(params![fingerprint.to_hex()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut paths = Vec::new();
        for row in rows {
            paths.push(PathBuf::from(row?));
        }
        Ok(paths)
    }

    fn query_duplicate_fingerprints(&self) -> SinkResult<Vec<StoredDuplicate>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT fingerprint FROM file_records
             WHERE fingerprint IS NOT NULL
             GROUP BY fingerprint
             HAVING COUNT(DISTINCT path) >= 2
             ORDER BY MIN(id)",
        )?;
        let hexes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut duplicates = Vec::with_capacity(hexes.len());
        for hex in hexes {
            let fingerprint = Fingerprint::from_hex(&hex)?;
            let paths = self.query_by_fingerprint(&fingerprint)?;
            duplicates.push(StoredDuplicate {
                fingerprint,
                count: paths.len(),
                paths,
            });
        }
        Ok(duplicates)
    }

    fn flush(&mut self) -> SinkResult<()> {
        self.conn
            .query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
        Ok(())
    }
}
