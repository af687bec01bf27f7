//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the collaborator traits,
//! allowing full scans to be tested without real download clients or TMDB.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedsort_core::testing::{fixtures, MockDownloadClient, MockMediaMetadata};
//!
//! let client = MockDownloadClient::new("qb", ClientBackend::QBittorrent);
//! client.add_torrent(fixtures::torrent("abc", "Show", 100, 1)).await;
//!
//! let metadata = MockMediaMetadata::new();
//! metadata.set_facts(MediaType::Tv, 1, fixtures::media_facts(&[18], &["KR"], None)).await;
//! ```

mod mock_metadata;
mod mock_torrent_client;

pub use mock_metadata::MockMediaMetadata;
pub use mock_torrent_client::{MockDownloadClient, MockWrite};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};

    use crate::classifier::{MediaFacts, MediaType};
    use crate::config::{default_site_aliases, ClientConfig, SiteConfig};
    use crate::history::HistoryRecord;
    use crate::site::{SiteAliasTable, StaticSiteRegistry, TrackerResolver};
    use crate::torrent_client::{ClientBackend, TorrentInfo};

    /// Create a torrent with no tags or category, added at `added_ts`
    /// (Unix seconds).
    pub fn torrent(hash: &str, name: &str, size_bytes: u64, added_ts: i64) -> TorrentInfo {
        TorrentInfo {
            hash: hash.to_string(),
            name: name.to_string(),
            size_bytes,
            added_at: Utc.timestamp_opt(added_ts, 0).single(),
            tags: Default::default(),
            category: None,
        }
    }

    /// Client configuration pointing at localhost.
    pub fn client_config(name: &str, backend: ClientBackend) -> ClientConfig {
        ClientConfig {
            name: name.to_string(),
            backend,
            url: "http://localhost:8080".to_string(),
            username: "admin".to_string(),
            password: "adminadmin".to_string(),
            timeout_secs: 5,
        }
    }

    /// A few well-known sites.
    pub fn sites() -> Vec<SiteConfig> {
        [
            ("CHDBits", "ptchdbits.co"),
            ("HDSky", "hdsky.me"),
            ("Audiences", "audiences.me"),
        ]
        .into_iter()
        .map(|(name, domain)| SiteConfig {
            name: name.to_string(),
            domains: vec![domain.to_string()],
        })
        .collect()
    }

    /// Resolver over [`sites`] with the default aliases.
    pub fn resolver() -> TrackerResolver {
        TrackerResolver::new(
            SiteAliasTable::new(default_site_aliases()),
            Arc::new(StaticSiteRegistry::new(&sites())),
        )
    }

    /// Announce URL on a site's tracker.
    pub fn announce(domain: &str) -> String {
        format!("https://{}/announce.php?passkey=0123456789abcdef", domain)
    }

    pub fn history_record(
        hash: &str,
        site: Option<&str>,
        title: Option<&str>,
        media_type: MediaType,
        tmdb_id: Option<u32>,
    ) -> HistoryRecord {
        HistoryRecord {
            hash: hash.to_string(),
            site: site.map(str::to_string),
            title: title.map(str::to_string),
            media_type,
            tmdb_id,
        }
    }

    pub fn media_facts(genres: &[u32], countries: &[&str], language: Option<&str>) -> MediaFacts {
        MediaFacts {
            genre_ids: genres.iter().copied().collect(),
            origin_countries: countries.iter().map(|c| c.to_string()).collect(),
            original_language: language.map(str::to_string),
        }
    }
}
