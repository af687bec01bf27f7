//! Mock download client for testing.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::torrent_client::{
    ClientBackend, ClientCapabilities, DownloadClient, DownloadClientError, TorrentInfo,
};

/// A successful write recorded for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockWrite {
    SetTags { hash: String, tags: Vec<String> },
    SetCategory { hash: String, category: String },
    CreateCategory { name: String },
}

type WriteHook = Arc<dyn Fn() + Send + Sync>;

/// Mock implementation of the DownloadClient trait.
///
/// Provides controllable behavior for testing:
/// - Seed torrents, trackers and existing categories
/// - Record successful writes for assertions
/// - Simulate failures
///
/// Update semantics follow the backend: qBittorrent merges tags and has
/// categories; Transmission replaces tags and has no categories.
///
/// # Example
///
/// ```rust,ignore
/// let client = MockDownloadClient::new("qb", ClientBackend::QBittorrent);
/// client.add_torrent(fixtures::torrent("abc", "Show", 100, 1)).await;
/// client.set_trackers("abc", vec!["https://tracker.hdsky.me/announce".into()]).await;
///
/// // ... run a scan ...
///
/// assert_eq!(client.writes().await.len(), 1);
/// ```
pub struct MockDownloadClient {
    name: String,
    backend: ClientBackend,
    capabilities: ClientCapabilities,
    /// Torrents in insertion order.
    torrents: Arc<RwLock<Vec<TorrentInfo>>>,
    trackers: Arc<RwLock<HashMap<String, Vec<String>>>>,
    categories: Arc<RwLock<BTreeSet<String>>>,
    writes: Arc<RwLock<Vec<MockWrite>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<DownloadClientError>>>,
    category_creation_fails: Arc<RwLock<bool>>,
    list_calls: Arc<RwLock<usize>>,
    /// Called after every successful write.
    write_hook: Arc<RwLock<Option<WriteHook>>>,
}

impl MockDownloadClient {
    /// Create a new mock client with the backend's capabilities.
    pub fn new(name: impl Into<String>, backend: ClientBackend) -> Self {
        Self {
            name: name.into(),
            backend,
            capabilities: backend.capabilities(),
            torrents: Arc::new(RwLock::new(Vec::new())),
            trackers: Arc::new(RwLock::new(HashMap::new())),
            categories: Arc::new(RwLock::new(BTreeSet::new())),
            writes: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            category_creation_fails: Arc::new(RwLock::new(false)),
            list_calls: Arc::new(RwLock::new(0)),
            write_hook: Arc::new(RwLock::new(None)),
        }
    }

    /// Override the reported capabilities.
    pub fn with_capabilities(mut self, capabilities: ClientCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Add a torrent.
    pub async fn add_torrent(&self, torrent: TorrentInfo) {
        self.torrents.write().await.push(torrent);
    }

    /// Set the announce URLs of a torrent.
    pub async fn set_trackers(&self, hash: &str, trackers: Vec<String>) {
        self.trackers
            .write()
            .await
            .insert(hash.to_lowercase(), trackers);
    }

    /// Register an existing category.
    pub async fn add_category(&self, name: &str) {
        self.categories.write().await.insert(name.to_string());
    }

    /// Make the next operation fail with the given error.
    pub async fn set_next_error(&self, error: DownloadClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make `create_category` fail.
    pub async fn set_category_creation_fails(&self, fails: bool) {
        *self.category_creation_fails.write().await = fails;
    }

    /// Run `hook` after every successful write.
    pub async fn set_write_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.write_hook.write().await = Some(Arc::new(hook));
    }

    /// Successful writes so far.
    pub async fn writes(&self) -> Vec<MockWrite> {
        self.writes.read().await.clone()
    }

    /// Clear recorded writes.
    pub async fn clear_writes(&self) {
        self.writes.write().await.clear();
    }

    /// Number of `list_torrents` calls.
    pub async fn list_calls(&self) -> usize {
        *self.list_calls.read().await
    }

    /// Current state of a torrent.
    pub async fn torrent(&self, hash: &str) -> Option<TorrentInfo> {
        self.torrents
            .read()
            .await
            .iter()
            .find(|t| t.hash.eq_ignore_ascii_case(hash))
            .cloned()
    }

    async fn check_error(&self) -> Result<(), DownloadClientError> {
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn record(&self, write: MockWrite) {
        self.writes.write().await.push(write);
        let hook = self.write_hook.read().await.clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    async fn update_torrent<F>(&self, hash: &str, update: F) -> Result<(), DownloadClientError>
    where
        F: FnOnce(&mut TorrentInfo),
    {
        let mut torrents = self.torrents.write().await;
        let torrent = torrents
            .iter_mut()
            .find(|t| t.hash.eq_ignore_ascii_case(hash))
            .ok_or_else(|| DownloadClientError::TorrentNotFound(hash.to_string()))?;
        update(torrent);
        Ok(())
    }

    fn unsupported(&self, operation: &'static str) -> DownloadClientError {
        DownloadClientError::Unsupported {
            client: self.name.clone(),
            operation,
        }
    }
}

#[async_trait]
impl DownloadClient for MockDownloadClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> ClientBackend {
        self.backend
    }

    fn capabilities(&self) -> ClientCapabilities {
        self.capabilities
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentInfo>, DownloadClientError> {
        *self.list_calls.write().await += 1;
        self.check_error().await?;
        Ok(self.torrents.read().await.clone())
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, DownloadClientError> {
        self.check_error().await?;
        self.torrent(hash)
            .await
            .ok_or_else(|| DownloadClientError::TorrentNotFound(hash.to_string()))
    }

    async fn get_trackers(&self, hash: &str) -> Result<Vec<String>, DownloadClientError> {
        self.check_error().await?;
        if self.torrent(hash).await.is_none() {
            return Err(DownloadClientError::TorrentNotFound(hash.to_string()));
        }
        Ok(self
            .trackers
            .read()
            .await
            .get(&hash.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn set_tags(&self, hash: &str, tags: &[String]) -> Result<(), DownloadClientError> {
        self.check_error().await?;
        let union = self.capabilities.tag_union;
        self.update_torrent(hash, |t| {
            if union {
                // qBittorrent splits the joined list on commas
                t.tags.extend(
                    tags.iter()
                        .flat_map(|tag| tag.split(','))
                        .map(str::trim)
                        .filter(|tag| !tag.is_empty())
                        .map(str::to_string),
                );
            } else {
                t.tags.clear();
                t.tags.extend(tags.iter().cloned());
            }
        })
        .await?;
        self.record(MockWrite::SetTags {
            hash: hash.to_string(),
            tags: tags.to_vec(),
        })
        .await;
        Ok(())
    }

    async fn set_category(&self, hash: &str, category: &str) -> Result<(), DownloadClientError> {
        self.check_error().await?;
        if !self.capabilities.independent_categories {
            return Err(self.unsupported("set_category"));
        }
        if !self.categories.read().await.contains(category) {
            return Err(DownloadClientError::CategoryNotFound(category.to_string()));
        }
        self.update_torrent(hash, |t| t.category = Some(category.to_string()))
            .await?;
        self.record(MockWrite::SetCategory {
            hash: hash.to_string(),
            category: category.to_string(),
        })
        .await;
        Ok(())
    }

    async fn create_category(&self, name: &str) -> Result<(), DownloadClientError> {
        self.check_error().await?;
        if !self.capabilities.independent_categories {
            return Err(self.unsupported("create_category"));
        }
        if *self.category_creation_fails.read().await {
            return Err(DownloadClientError::ApiError(format!(
                "cannot create category {}",
                name
            )));
        }
        self.categories.write().await.insert(name.to_string());
        self.record(MockWrite::CreateCategory {
            name: name.to_string(),
        })
        .await;
        Ok(())
    }
}
