//! qBittorrent Web API client implementation.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ClientConfig;

use super::{ClientBackend, DownloadClient, DownloadClientError, TorrentInfo};

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    config: ClientConfig,
    /// Set once logged in; cleared when the session expires.
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    /// Create a new qBittorrent client.
    pub fn new(config: ClientConfig) -> Result<Self, DownloadClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| DownloadClientError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url(), endpoint)
    }

    /// Login and store session cookie.
    async fn login(&self) -> Result<(), DownloadClientError> {
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(self.url("/api/v2/auth/login"))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful for {}", self.config.name);
            // Session cookie is stored by the cookie jar
            *self.session.write().await = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status == StatusCode::FORBIDDEN {
            Err(DownloadClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(DownloadClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    /// Ensure we have a valid session, logging in if needed.
    async fn ensure_authenticated(&self) -> Result<(), DownloadClientError> {
        if self.session.read().await.is_some() {
            return Ok(());
        }
        self.login().await
    }

    /// Send an authenticated request, re-authenticating once on 403.
    ///
    /// Returns the status alongside the body so callers can interpret
    /// endpoint-specific codes (e.g. 409 from `setCategory`).
    async fn send<F>(&self, build: F) -> Result<(StatusCode, String), DownloadClientError>
    where
        F: Fn() -> RequestBuilder,
    {
        self.ensure_authenticated().await?;

        let mut response = build().send().await?;

        if response.status() == StatusCode::FORBIDDEN {
            warn!(
                "qBittorrent session expired for {}, re-authenticating",
                self.config.name
            );
            *self.session.write().await = None;
            self.login().await?;
            response = build().send().await?;
        }

        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn get(&self, endpoint: &str) -> Result<String, DownloadClientError> {
        let url = self.url(endpoint);
        let (status, body) = self.send(|| self.client.get(&url)).await?;
        if !status.is_success() {
            return Err(DownloadClientError::ApiError(format!("HTTP {}", status)));
        }
        Ok(body)
    }

    async fn post_form(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<(StatusCode, String), DownloadClientError> {
        let url = self.url(endpoint);
        self.send(|| self.client.post(&url).form(params)).await
    }

    async fn fetch_torrents(&self, endpoint: &str) -> Result<Vec<TorrentInfo>, DownloadClientError> {
        let response = self.get(endpoint).await?;
        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&response).map_err(|e| {
            DownloadClientError::ApiError(format!("Failed to parse response: {}", e))
        })?;
        Ok(torrents
            .into_iter()
            .map(QBTorrentInfo::into_torrent_info)
            .collect())
    }
}

/// qBittorrent torrent info response.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    #[serde(default)]
    size: i64,
    #[serde(default)]
    added_on: i64,
    #[serde(default)]
    category: String,
    /// Comma separated ("a, b").
    #[serde(default)]
    tags: String,
}

impl QBTorrentInfo {
    fn into_torrent_info(self) -> TorrentInfo {
        TorrentInfo {
            hash: self.hash.to_lowercase(),
            name: self.name,
            size_bytes: self.size.max(0) as u64,
            added_at: timestamp_to_datetime(self.added_on),
            tags: parse_tags(&self.tags),
            category: if self.category.is_empty() {
                None
            } else {
                Some(self.category)
            },
        }
    }
}

/// qBittorrent tracker entry.
#[derive(Debug, Deserialize)]
struct QBTracker {
    url: String,
}

/// Split qBittorrent's comma separated tag string.
fn parse_tags(tags: &str) -> BTreeSet<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// DHT/PeX/LSD show up as pseudo trackers like "** [DHT] **".
fn is_pseudo_tracker(url: &str) -> bool {
    url.starts_with("**")
}

/// Convert Unix timestamp to DateTime<Utc>.
fn timestamp_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 0 {
        Utc.timestamp_opt(ts, 0).single()
    } else {
        None
    }
}

#[async_trait]
impl DownloadClient for QBittorrentClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn backend(&self) -> ClientBackend {
        ClientBackend::QBittorrent
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentInfo>, DownloadClientError> {
        self.fetch_torrents("/api/v2/torrents/info").await
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, DownloadClientError> {
        let endpoint = format!(
            "/api/v2/torrents/info?hashes={}",
            urlencoding::encode(&hash.to_lowercase())
        );
        self.fetch_torrents(&endpoint)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DownloadClientError::TorrentNotFound(hash.to_string()))
    }

    async fn get_trackers(&self, hash: &str) -> Result<Vec<String>, DownloadClientError> {
        let endpoint = format!(
            "/api/v2/torrents/trackers?hash={}",
            urlencoding::encode(&hash.to_lowercase())
        );
        let url = self.url(&endpoint);
        let (status, body) = self.send(|| self.client.get(&url)).await?;
        if status == StatusCode::NOT_FOUND {
            return Err(DownloadClientError::TorrentNotFound(hash.to_string()));
        }
        if !status.is_success() {
            return Err(DownloadClientError::ApiError(format!("HTTP {}", status)));
        }

        let trackers: Vec<QBTracker> = serde_json::from_str(&body).map_err(|e| {
            DownloadClientError::ApiError(format!("Failed to parse trackers: {}", e))
        })?;
        Ok(trackers
            .into_iter()
            .map(|t| t.url)
            .filter(|u| !is_pseudo_tracker(u))
            .collect())
    }

    async fn set_tags(&self, hash: &str, tags: &[String]) -> Result<(), DownloadClientError> {
        let hash_lower = hash.to_lowercase();
        let joined = tags.join(",");
        let (status, _) = self
            .post_form(
                "/api/v2/torrents/addTags",
                &[("hashes", &hash_lower), ("tags", &joined)],
            )
            .await?;
        if !status.is_success() {
            return Err(DownloadClientError::ApiError(format!("HTTP {}", status)));
        }
        Ok(())
    }

    async fn set_category(&self, hash: &str, category: &str) -> Result<(), DownloadClientError> {
        let hash_lower = hash.to_lowercase();
        let (status, body) = self
            .post_form(
                "/api/v2/torrents/setCategory",
                &[("hashes", &hash_lower), ("category", category)],
            )
            .await?;
        match status {
            s if s.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(DownloadClientError::CategoryNotFound(category.to_string())),
            s => Err(DownloadClientError::ApiError(format!("HTTP {}: {}", s, body))),
        }
    }

    async fn create_category(&self, name: &str) -> Result<(), DownloadClientError> {
        let (status, body) = self
            .post_form(
                "/api/v2/torrents/createCategory",
                &[("category", name), ("savePath", "")],
            )
            .await?;
        if !status.is_success() {
            return Err(DownloadClientError::ApiError(format!(
                "HTTP {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}
