//! Transmission RPC client implementation.
//!
//! Transmission has no categories and `torrent-set` replaces the whole
//! label list, so callers must merge labels themselves.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::ClientConfig;

use super::{ClientBackend, DownloadClient, DownloadClientError, TorrentInfo};

const SESSION_HEADER: &str = "X-Transmission-Session-Id";

const TORRENT_FIELDS: &[&str] = &[
    "hashString",
    "name",
    "totalSize",
    "addedDate",
    "labels",
    "trackers",
];

/// Transmission client implementation.
pub struct TransmissionClient {
    client: Client,
    config: ClientConfig,
    session_id: RwLock<Option<String>>,
}

impl TransmissionClient {
    /// Create a new Transmission client.
    pub fn new(config: ClientConfig) -> Result<Self, DownloadClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| DownloadClientError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session_id: RwLock::new(None),
        })
    }

    fn rpc_url(&self) -> String {
        let base = self.config.url.trim_end_matches('/');
        if base.ends_with("/rpc") {
            base.to_string()
        } else {
            format!("{}/transmission/rpc", base)
        }
    }

    /// Issue one RPC call, refreshing the session id once on 409.
    async fn call(&self, method: &str, arguments: Value) -> Result<Value, DownloadClientError> {
        let request = RpcRequest { method, arguments };
        let url = self.rpc_url();

        let mut attempt = 0;
        loop {
            let mut builder = self.client.post(&url).json(&request);
            if let Some(id) = self.session_id.read().await.as_deref() {
                builder = builder.header(SESSION_HEADER, id);
            }
            if !self.config.username.is_empty() {
                builder = builder.basic_auth(&self.config.username, Some(&self.config.password));
            }

            let response = builder.send().await?;
            let status = response.status();

            if status == StatusCode::CONFLICT && attempt == 0 {
                let id = response
                    .headers()
                    .get(SESSION_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        DownloadClientError::ApiError(
                            "409 without session id header".to_string(),
                        )
                    })?;
                debug!("Transmission session id refreshed for {}", self.config.name);
                *self.session_id.write().await = Some(id);
                attempt += 1;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(DownloadClientError::AuthenticationFailed(
                    "Invalid credentials".to_string(),
                ));
            }
            if !status.is_success() {
                return Err(DownloadClientError::ApiError(format!("HTTP {}", status)));
            }

            let body: RpcResponse = response.json().await?;
            if body.result != "success" {
                return Err(DownloadClientError::ApiError(body.result));
            }
            return Ok(body.arguments);
        }
    }

    async fn fetch(&self, ids: Option<&[String]>) -> Result<Vec<TrTorrent>, DownloadClientError> {
        let mut arguments = json!({ "fields": TORRENT_FIELDS });
        if let Some(ids) = ids {
            arguments["ids"] = json!(ids);
        }
        let response = self.call("torrent-get", arguments).await?;
        let parsed: TorrentGetArguments = serde_json::from_value(response).map_err(|e| {
            DownloadClientError::ApiError(format!("Failed to parse response: {}", e))
        })?;
        Ok(parsed.torrents)
    }

    async fn fetch_one(&self, hash: &str) -> Result<TrTorrent, DownloadClientError> {
        let ids = [hash.to_lowercase()];
        self.fetch(Some(&ids))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DownloadClientError::TorrentNotFound(hash.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct TorrentGetArguments {
    #[serde(default)]
    torrents: Vec<TrTorrent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrTorrent {
    hash_string: String,
    name: String,
    #[serde(default)]
    total_size: i64,
    #[serde(default)]
    added_date: i64,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    trackers: Vec<TrTracker>,
}

#[derive(Debug, Deserialize)]
struct TrTracker {
    announce: String,
}

impl TrTorrent {
    fn into_torrent_info(self) -> TorrentInfo {
        TorrentInfo {
            hash: self.hash_string.to_lowercase(),
            name: self.name,
            size_bytes: self.total_size.max(0) as u64,
            added_at: added_date_to_datetime(self.added_date),
            tags: self
                .labels
                .into_iter()
                .filter(|l| !l.trim().is_empty())
                .collect(),
            category: None,
        }
    }
}

fn added_date_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    if ts > 0 {
        Utc.timestamp_opt(ts, 0).single()
    } else {
        None
    }
}

#[async_trait]
impl DownloadClient for TransmissionClient {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn backend(&self) -> ClientBackend {
        ClientBackend::Transmission
    }

    async fn list_torrents(&self) -> Result<Vec<TorrentInfo>, DownloadClientError> {
        Ok(self
            .fetch(None)
            .await?
            .into_iter()
            .map(TrTorrent::into_torrent_info)
            .collect())
    }

    async fn get_torrent(&self, hash: &str) -> Result<TorrentInfo, DownloadClientError> {
        Ok(self.fetch_one(hash).await?.into_torrent_info())
    }

    async fn get_trackers(&self, hash: &str) -> Result<Vec<String>, DownloadClientError> {
        Ok(self
            .fetch_one(hash)
            .await?
            .trackers
            .into_iter()
            .map(|t| t.announce)
            .collect())
    }

    async fn get_category(&self, _hash: &str) -> Result<Option<String>, DownloadClientError> {
        Ok(None)
    }

    async fn set_tags(&self, hash: &str, tags: &[String]) -> Result<(), DownloadClientError> {
        let arguments = json!({
            "ids": [hash.to_lowercase()],
            "labels": tags,
        });
        self.call("torrent-set", arguments).await?;
        Ok(())
    }

    async fn set_category(&self, _hash: &str, _category: &str) -> Result<(), DownloadClientError> {
        Err(DownloadClientError::Unsupported {
            client: self.config.name.clone(),
            operation: "set_category",
        })
    }

    async fn create_category(&self, _name: &str) -> Result<(), DownloadClientError> {
        Err(DownloadClientError::Unsupported {
            client: self.config.name.clone(),
            operation: "create_category",
        })
    }
}
