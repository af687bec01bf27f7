//! SQLite-backed download history store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::{HistoryError, HistoryRecord, HistoryStore};
use crate::classifier::MediaType;

/// SQLite-backed download history.
pub struct SqliteHistoryStore {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStore {
    /// Open (or create) the history database at `path`.
    pub fn new(path: &Path) -> Result<Self, HistoryError> {
        let conn = Connection::open(path).map_err(|e| HistoryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, HistoryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| HistoryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), HistoryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS download_history (
                info_hash TEXT PRIMARY KEY,
                site TEXT,
                title TEXT,
                media_type TEXT NOT NULL DEFAULT 'unknown',
                tmdb_id INTEGER,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, HistoryError> {
        self.conn
            .lock()
            .map_err(|_| HistoryError::Database("connection lock poisoned".to_string()))
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn get_by_hash(&self, hash: &str) -> Result<Option<HistoryRecord>, HistoryError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT info_hash, site, title, media_type, tmdb_id
             FROM download_history WHERE info_hash = ?",
            params![hash.to_lowercase()],
            |row| {
                let media_type: String = row.get(3)?;
                Ok(HistoryRecord {
                    hash: row.get(0)?,
                    site: row.get(1)?,
                    title: row.get(2)?,
                    media_type: MediaType::from(media_type.as_str()),
                    tmdb_id: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(|e| HistoryError::Database(e.to_string()))
    }

    fn insert(&self, record: &HistoryRecord) -> Result<(), HistoryError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO download_history (info_hash, site, title, media_type, tmdb_id)
             VALUES (?, ?, ?, ?, ?)",
            params![
                record.hash.to_lowercase(),
                record.site,
                record.title,
                record.media_type.as_str(),
                record.tmdb_id,
            ],
        )
        .map_err(|e| HistoryError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(hash: &str) -> HistoryRecord {
        HistoryRecord {
            hash: hash.to_string(),
            site: Some("HDSky".to_string()),
            title: Some("Some Show".to_string()),
            media_type: MediaType::Tv,
            tmdb_id: Some(1399),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        store.insert(&record("abc123")).unwrap();

        let found = store.get_by_hash("abc123").unwrap().unwrap();
        assert_eq!(found, record("abc123"));
    }

    #[test]
    fn test_get_is_case_insensitive() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        store.insert(&record("ABC123")).unwrap();

        let found = store.get_by_hash("AbC123").unwrap().unwrap();
        assert_eq!(found.hash, "abc123");
    }

    #[test]
    fn test_get_missing() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        assert!(store.get_by_hash("nope").unwrap().is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let store = SqliteHistoryStore::in_memory().unwrap();
        store.insert(&record("abc")).unwrap();

        let mut updated = record("abc");
        updated.site = None;
        updated.media_type = MediaType::Movie;
        store.insert(&updated).unwrap();

        let found = store.get_by_hash("abc").unwrap().unwrap();
        assert_eq!(found.site, None);
        assert_eq!(found.media_type, MediaType::Movie);
    }

    #[test]
    fn test_persists_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.db");

        {
            let store = SqliteHistoryStore::new(&path).unwrap();
            store.insert(&record("abc")).unwrap();
        }

        let store = SqliteHistoryStore::new(&path).unwrap();
        assert!(store.get_by_hash("abc").unwrap().is_some());
    }
}
