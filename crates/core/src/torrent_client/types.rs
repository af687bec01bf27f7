//! Types for download client operations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during download client operations.
#[derive(Debug, Error)]
pub enum DownloadClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("Category does not exist: {0}")]
    CategoryNotFound(String),

    #[error("Operation not supported by {client}: {operation}")]
    Unsupported {
        client: String,
        operation: &'static str,
    },

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for DownloadClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DownloadClientError::Timeout
        } else if e.is_connect() {
            DownloadClientError::ConnectionFailed(e.to_string())
        } else {
            DownloadClientError::ApiError(e.to_string())
        }
    }
}

/// Supported download client backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientBackend {
    #[serde(rename = "qbittorrent")]
    QBittorrent,
    Transmission,
}

impl ClientBackend {
    /// Returns the string representation for logs and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientBackend::QBittorrent => "qbittorrent",
            ClientBackend::Transmission => "transmission",
        }
    }

    /// What the backend's update API can do.
    pub fn capabilities(&self) -> ClientCapabilities {
        match self {
            ClientBackend::QBittorrent => ClientCapabilities {
                independent_categories: true,
                tag_union: true,
            },
            ClientBackend::Transmission => ClientCapabilities {
                independent_categories: false,
                tag_union: false,
            },
        }
    }
}

/// Capabilities of a client's tag/category update API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    /// Categories exist independently of tags and can be created on demand.
    pub independent_categories: bool,
    /// `set_tags` merges with the tags already on the torrent.
    /// When false, `set_tags` replaces the whole tag set.
    pub tag_union: bool,
}

/// A torrent as reported by a download client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentInfo {
    /// Info hash (lowercase hex).
    pub hash: String,
    /// Torrent name.
    pub name: String,
    /// Total size in bytes.
    pub size_bytes: u64,
    /// When the torrent was added.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
    /// Current tags (labels on Transmission).
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Current category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Trait for download client backends.
///
/// Every tag/category call is keyed by info hash. Implementations report
/// their update semantics through [`DownloadClient::capabilities`].
#[async_trait]
pub trait DownloadClient: Send + Sync {
    /// Configured client name for logging and event routing.
    fn name(&self) -> &str;

    /// Backend kind.
    fn backend(&self) -> ClientBackend;

    /// Tag/category update capabilities.
    fn capabilities(&self) -> ClientCapabilities {
        self.backend().capabilities()
    }

    /// List all torrents.
    async fn list_torrents(&self) -> Result<Vec<TorrentInfo>, DownloadClientError>;

    /// Get a specific torrent by hash.
    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, DownloadClientError>;

    /// Announce URLs of a torrent, in the client's order.
    async fn get_trackers(&self, hash: &str) -> Result<Vec<String>, DownloadClientError>;

    /// Current tags of a torrent.
    async fn get_tags(&self, hash: &str) -> Result<BTreeSet<String>, DownloadClientError> {
        Ok(self.get_torrent(hash).await?.tags)
    }

    /// Current category of a torrent.
    async fn get_category(&self, hash: &str) -> Result<Option<String>, DownloadClientError> {
        Ok(self.get_torrent(hash).await?.category)
    }

    /// Write tags. Merges or replaces depending on `capabilities().tag_union`.
    async fn set_tags(&self, hash: &str, tags: &[String]) -> Result<(), DownloadClientError>;

    /// Set the category. Fails with `CategoryNotFound` if it does not exist.
    async fn set_category(&self, hash: &str, category: &str) -> Result<(), DownloadClientError>;

    /// Create a category.
    async fn create_category(&self, name: &str) -> Result<(), DownloadClientError>;
}
