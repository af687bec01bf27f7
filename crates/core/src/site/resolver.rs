//! Tracker URL → site name resolution.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::{SiteError, SiteRegistry};

/// Second-level labels that sit under a two-letter country TLD
/// (e.g. "example.co.uk").
const COMPOUND_SLDS: &[&str] = &["com", "net", "org", "edu", "gov", "co"];

/// Tracker host fragment → canonical site host.
#[derive(Debug, Clone, Default)]
pub struct SiteAliasTable {
    aliases: BTreeMap<String, String>,
}

impl SiteAliasTable {
    pub fn new(aliases: BTreeMap<String, String>) -> Self {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_lowercase()))
                .filter(|(k, v)| !k.is_empty() && !v.is_empty())
                .collect(),
        }
    }

    /// Canonical host for the first alias key contained in `host`.
    pub fn lookup(&self, host: &str) -> Option<&str> {
        let host = host.to_lowercase();
        self.aliases
            .iter()
            .find(|(alias, _)| host.contains(alias.as_str()))
            .map(|(_, canonical)| canonical.as_str())
    }
}

/// Extract the registrable domain from a tracker URL.
///
/// Accepts URLs without a scheme. IP hosts are returned as-is.
pub fn extract_domain(tracker: &str) -> Result<String, SiteError> {
    let host = parse_host(tracker)?;
    Ok(registrable_domain(&host))
}

fn parse_host(tracker: &str) -> Result<String, SiteError> {
    let trimmed = tracker.trim();
    if trimmed.is_empty() {
        return Err(SiteError::InvalidTrackerUrl(tracker.to_string()));
    }

    let parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{}", trimmed))
    }
    .map_err(|_| SiteError::InvalidTrackerUrl(tracker.to_string()))?;

    parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_lowercase())
        .ok_or_else(|| SiteError::InvalidTrackerUrl(tracker.to_string()))
}

fn registrable_domain(host: &str) -> String {
    if host.parse::<IpAddr>().is_ok() {
        return host.to_string();
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let tld = labels[labels.len() - 1];
    let sld = labels[labels.len() - 2];
    let keep = if tld.len() == 2 && COMPOUND_SLDS.contains(&sld) {
        3
    } else {
        2
    };
    labels[labels.len() - keep..].join(".")
}

/// Maps tracker URLs to site names.
pub struct TrackerResolver {
    aliases: SiteAliasTable,
    registry: Arc<dyn SiteRegistry>,
}

impl TrackerResolver {
    pub fn new(aliases: SiteAliasTable, registry: Arc<dyn SiteRegistry>) -> Self {
        Self { aliases, registry }
    }

    pub fn registry(&self) -> &Arc<dyn SiteRegistry> {
        &self.registry
    }

    /// Resolve a single tracker URL.
    pub fn resolve_tracker(&self, tracker: &str) -> Result<Option<String>, SiteError> {
        let host = parse_host(tracker)?;
        let domain = match self.aliases.lookup(&host) {
            Some(canonical) => canonical.to_string(),
            None => registrable_domain(&host),
        };
        Ok(self.registry.resolve_domain(&domain))
    }

    /// First site matched by any tracker, in client order.
    ///
    /// Malformed tracker URLs are skipped.
    pub fn resolve_site(&self, trackers: &[String]) -> Option<String> {
        trackers.iter().find_map(|tracker| match self.resolve_tracker(tracker) {
            Ok(site) => site,
            Err(e) => {
                debug!("Skipping tracker: {}", e);
                None
            }
        })
    }
}
