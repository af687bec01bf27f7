//! Types for the tagger.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::{MediaFacts, MediaType};
use crate::torrent_client::DownloadClient;

/// Errors that can occur while tagging.
#[derive(Debug, Error)]
pub enum TaggerError {
    /// No configured client is in scope.
    #[error("no download clients to scan")]
    NoClients,

    /// Every targeted client failed to list its torrents.
    #[error("none of the {0} targeted download clients could be reached")]
    NoReachableClients(usize),

    /// Tagging is disabled in configuration.
    #[error("tagger is disabled")]
    Disabled,

    /// A scan is already in progress.
    #[error("a scan is already running")]
    AlreadyRunning,

    /// Event names a client that is not configured.
    #[error("unknown download client: {0}")]
    UnknownClient(String),

    #[error("download client error: {0}")]
    Client(#[from] crate::torrent_client::DownloadClientError),

    #[error("metadata error: {0}")]
    Metadata(#[from] crate::metadata::MetadataError),

    #[error("history error: {0}")]
    History(#[from] crate::history::HistoryError),
}

/// What started a scan. Used for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanTrigger {
    Schedule,
    Manual,
    Startup,
}

impl ScanTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanTrigger::Schedule => "schedule",
            ScanTrigger::Manual => "manual",
            ScanTrigger::Startup => "startup",
        }
    }
}

/// Per-scan state: the clients in play and a cooperative cancel flag.
#[derive(Clone)]
pub struct RunContext {
    clients: Vec<Arc<dyn DownloadClient>>,
    cancelled: Arc<AtomicBool>,
}

impl RunContext {
    pub fn new(clients: Vec<Arc<dyn DownloadClient>>) -> Self {
        Self {
            clients,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn clients(&self) -> &[Arc<dyn DownloadClient>] {
        &self.clients
    }

    /// Client by configured name.
    pub fn client(&self, name: &str) -> Option<&Arc<dyn DownloadClient>> {
        self.clients.iter().find(|c| c.name() == name)
    }

    /// Request cancellation. Checked between torrents.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Shared flag, for cancelling from another task.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }
}

/// What the host knows about a freshly added torrent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaContext {
    /// Site the torrent was grabbed from.
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(flatten)]
    pub facts: MediaFacts,
}

/// Notification that a torrent was added to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentAddedEvent {
    /// Configured client name.
    pub client: String,
    pub info_hash: String,
    #[serde(default)]
    pub context: MediaContext,
}

/// Result of processing one torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TorrentOutcome {
    /// A write was issued.
    Tagged {
        tags: Vec<String>,
        category: Option<String>,
    },
    /// Nothing to change.
    Unchanged,
    /// Not processed.
    Skipped { reason: String },
}

impl TorrentOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        TorrentOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub(crate) fn metric_label(&self) -> &'static str {
        match self {
            TorrentOutcome::Tagged { .. } => "tagged",
            TorrentOutcome::Unchanged => "unchanged",
            TorrentOutcome::Skipped { .. } => "skipped",
        }
    }
}

/// Summary of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Clients whose torrents were listed.
    pub clients_scanned: usize,
    /// Clients skipped because listing failed.
    pub clients_failed: usize,
    pub processed: usize,
    pub tagged: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Scan stopped early on request.
    pub cancelled: bool,
}

impl ScanReport {
    pub(crate) fn record(&mut self, outcome: &TorrentOutcome) {
        self.processed += 1;
        match outcome {
            TorrentOutcome::Tagged { .. } => self.tagged += 1,
            TorrentOutcome::Unchanged => self.unchanged += 1,
            TorrentOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    pub(crate) fn record_failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }
}
