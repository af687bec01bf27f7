//! Tagger configuration.

use serde::{Deserialize, Serialize};

/// Configuration for site tagging and categorization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggerConfig {
    /// Master switch. When disabled, scans and events are ignored.
    #[serde(default)]
    pub enabled: bool,

    /// Tag torrents with the name of the site they came from.
    #[serde(default = "default_true")]
    pub enable_site_tag: bool,

    /// Tag torrents with the media title from download history.
    #[serde(default)]
    pub enable_media_title_tag: bool,

    /// Set a genre/country category on torrents that have none.
    /// Only applies to clients with independent categories.
    #[serde(default)]
    pub enable_category: bool,

    /// Run a single scan at startup.
    #[serde(default)]
    pub run_once: bool,

    /// Clients to scan by name. Empty means all configured clients.
    #[serde(default)]
    pub target_clients: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            enable_site_tag: true,
            enable_media_title_tag: false,
            enable_category: false,
            run_once: false,
            target_clients: Vec::new(),
        }
    }
}

impl TaggerConfig {
    /// Whether a client is in scope for scans and events.
    pub fn targets(&self, client: &str) -> bool {
        self.target_clients.is_empty() || self.target_clients.iter().any(|c| c == client)
    }
}
