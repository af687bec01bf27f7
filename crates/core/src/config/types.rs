use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::path::PathBuf;

use crate::metadata::TmdbConfig;
use crate::scheduler::ScheduleConfig;
use crate::tagger::TaggerConfig;
use crate::torrent_client::ClientBackend;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tagger: TaggerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub categories: CategoryLabels,
    /// Download clients that can be scanned.
    #[serde(default)]
    pub clients: Vec<ClientConfig>,
    /// Site registry entries.
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
    /// Tracker host fragment -> canonical site host.
    #[serde(default = "default_site_aliases")]
    pub site_aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub tmdb: Option<TmdbConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            tagger: TaggerConfig::default(),
            schedule: ScheduleConfig::default(),
            categories: CategoryLabels::default(),
            clients: Vec::new(),
            sites: Vec::new(),
            site_aliases: default_site_aliases(),
            tmdb: None,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Download history database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("seedsort.db")
}

/// A single download client the tagger may scan.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Unique name, referenced by `tagger.target_clients` and events.
    pub name: String,
    pub backend: ClientBackend,
    /// Web UI / RPC base URL (e.g., "http://localhost:8080")
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// A site known to the registry.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct SiteConfig {
    /// Display name written as the site tag.
    pub name: String,
    /// Tracker/site domains that belong to this site.
    pub domains: Vec<String>,
}

/// Category labels offered per media type.
///
/// Used for display and validation only; classification itself follows
/// the built-in rule cascade.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CategoryLabels {
    #[serde(default = "default_movie_labels")]
    pub movie: Vec<String>,
    #[serde(default = "default_tv_labels")]
    pub tv: Vec<String>,
    #[serde(default = "default_anime_labels")]
    pub anime: Vec<String>,
}

impl Default for CategoryLabels {
    fn default() -> Self {
        Self {
            movie: default_movie_labels(),
            tv: default_tv_labels(),
            anime: default_anime_labels(),
        }
    }
}

fn default_movie_labels() -> Vec<String> {
    crate::classifier::labels::MOVIE
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_tv_labels() -> Vec<String> {
    crate::classifier::labels::TV
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_anime_labels() -> Vec<String> {
    crate::classifier::labels::ANIME
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_site_aliases() -> BTreeMap<String, String> {
    [
        ("chdbits.xyz", "ptchdbits.co"),
        ("agsvpt.trackers.work", "agsvpt.com"),
        ("tracker.cinefiles.info", "audiences.me"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tagger: TaggerConfig,
    pub schedule: ScheduleConfig,
    pub categories: CategoryLabels,
    pub clients: Vec<SanitizedClientConfig>,
    pub sites: Vec<SiteConfig>,
    pub site_aliases: BTreeMap<String, String>,
    pub tmdb_configured: bool,
}

/// Sanitized client config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedClientConfig {
    pub name: String,
    pub backend: ClientBackend,
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            tagger: config.tagger.clone(),
            schedule: config.schedule.clone(),
            categories: config.categories.clone(),
            clients: config
                .clients
                .iter()
                .map(|c| SanitizedClientConfig {
                    name: c.name.clone(),
                    backend: c.backend,
                    url: c.url.clone(),
                    username: c.username.clone(),
                    password_configured: !c.password.is_empty(),
                    timeout_secs: c.timeout_secs,
                })
                .collect(),
            sites: config.sites.clone(),
            site_aliases: config.site_aliases.clone(),
            tmdb_configured: config
                .tmdb
                .as_ref()
                .is_some_and(|t| !t.api_key.is_empty()),
        }
    }
}
