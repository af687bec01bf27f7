//! Download history - what the host knows about each downloaded torrent.
//!
//! The store is keyed by info hash and read-only during a scan. The matcher
//! layers cross-seed deduplication on top of it.

mod matcher;
mod sqlite;

pub use matcher::{sort_by_added, ClassificationRecord, DedupKey, HistoryMatcher};
pub use sqlite::SqliteHistoryStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::MediaType;

/// Errors from the history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(String),
}

/// A persisted download history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Site the torrent was downloaded from.
    pub site: Option<String>,
    /// Media title.
    pub title: Option<String>,
    pub media_type: MediaType,
    /// TMDB id of the media.
    pub tmdb_id: Option<u32>,
}

/// Trait for download history storage.
pub trait HistoryStore: Send + Sync {
    /// Look up a record by info hash (case-insensitive).
    fn get_by_hash(&self, hash: &str) -> Result<Option<HistoryRecord>, HistoryError>;

    /// Insert or replace a record.
    fn insert(&self, record: &HistoryRecord) -> Result<(), HistoryError>;
}
