//! Cross-seed deduplication over download history.

use std::collections::HashMap;

use serde::Serialize;

use super::HistoryRecord;
use crate::classifier::MediaType;
use crate::torrent_client::TorrentInfo;

/// Identity of a release independent of the site it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    size: u64,
    name: String,
}

impl DedupKey {
    pub fn new(size: u64, name: &str) -> Self {
        Self {
            size,
            name: name.trim().to_lowercase(),
        }
    }

    pub fn from_torrent(torrent: &TorrentInfo) -> Self {
        Self::new(torrent.size_bytes, &torrent.name)
    }
}

/// What is known about a torrent's origin and media.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationRecord {
    pub site: Option<String>,
    pub media_title: Option<String>,
    pub media_type: MediaType,
    pub external_media_id: Option<u32>,
}

impl ClassificationRecord {
    /// True if anything beyond the site is known.
    pub fn has_media_identity(&self) -> bool {
        self.media_title.is_some() || self.media_type.is_known() || self.external_media_id.is_some()
    }
}

impl From<HistoryRecord> for ClassificationRecord {
    fn from(record: HistoryRecord) -> Self {
        Self {
            site: record.site.filter(|s| !s.is_empty()),
            media_title: record.title.filter(|t| !t.is_empty()),
            media_type: record.media_type,
            external_media_id: record.tmdb_id,
        }
    }
}

/// Sort torrents by ascending add time. Stable; undated torrents first.
pub fn sort_by_added(torrents: &mut [TorrentInfo]) {
    torrents.sort_by_key(|t| t.added_at);
}

/// Per-scan matcher deciding primary vs. cross-seeded duplicate.
///
/// Feed torrents in ascending add order. Built fresh for every scan.
#[derive(Debug, Default)]
pub struct HistoryMatcher {
    seen: HashMap<DedupKey, ClassificationRecord>,
}

impl HistoryMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `torrent` given its persisted history entry, if any.
    ///
    /// A persisted entry is authoritative and registers its key. Without
    /// one, a torrent inherits the first-seen record for the same key with
    /// the site cleared, since a cross-seed came from a different site.
    pub fn match_history(
        &mut self,
        torrent: &TorrentInfo,
        persisted: Option<HistoryRecord>,
    ) -> ClassificationRecord {
        let key = DedupKey::from_torrent(torrent);

        match persisted {
            Some(history) => {
                let record = ClassificationRecord::from(history);
                self.seen.entry(key).or_insert_with(|| record.clone());
                record
            }
            None => self
                .seen
                .get(&key)
                .map(|seen| ClassificationRecord {
                    site: None,
                    ..seen.clone()
                })
                .unwrap_or_default(),
        }
    }
}
