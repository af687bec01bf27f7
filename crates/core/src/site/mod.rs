//! Site registry and tracker-to-site resolution.

mod resolver;

pub use resolver::{extract_domain, SiteAliasTable, TrackerResolver};

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::config::SiteConfig;

/// Errors from site resolution.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("Invalid tracker URL: {0}")]
    InvalidTrackerUrl(String),
}

/// Lookup of known sites by tracker domain.
pub trait SiteRegistry: Send + Sync {
    /// Display names of all known sites.
    fn site_names(&self) -> BTreeSet<String>;

    /// Site owning a bare domain, if any.
    fn resolve_domain(&self, domain: &str) -> Option<String>;
}

/// Registry built from the `[[sites]]` configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticSiteRegistry {
    /// domain -> site name
    domains: BTreeMap<String, String>,
    names: BTreeSet<String>,
}

impl StaticSiteRegistry {
    pub fn new(sites: &[SiteConfig]) -> Self {
        let mut registry = Self::default();
        for site in sites {
            registry.names.insert(site.name.clone());
            for domain in &site.domains {
                let domain = domain.trim().trim_start_matches('.').to_lowercase();
                if !domain.is_empty() {
                    registry.domains.insert(domain, site.name.clone());
                }
            }
        }
        registry
    }
}

impl SiteRegistry for StaticSiteRegistry {
    fn site_names(&self) -> BTreeSet<String> {
        self.names.clone()
    }

    fn resolve_domain(&self, domain: &str) -> Option<String> {
        let domain = domain.to_lowercase();
        if let Some(name) = self.domains.get(&domain) {
            return Some(name.clone());
        }

        // Subdomain on either side: "tracker.site.org" vs "site.org"
        self.domains
            .iter()
            .find(|(known, _)| {
                domain.ends_with(&format!(".{}", known)) || known.ends_with(&format!(".{}", domain))
            })
            .map(|(_, name)| name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StaticSiteRegistry {
        StaticSiteRegistry::new(&[
            SiteConfig {
                name: "CHDBits".to_string(),
                domains: vec!["ptchdbits.co".to_string()],
            },
            SiteConfig {
                name: "HDSky".to_string(),
                domains: vec!["hdsky.me".to_string(), " .HDSKY.ORG ".to_string()],
            },
            SiteConfig {
                name: "Audiences".to_string(),
                domains: vec!["t.audiences.me".to_string()],
            },
        ])
    }

    #[test]
    fn test_site_names() {
        let names = registry().site_names();
        assert_eq!(names.len(), 3);
        assert!(names.contains("HDSky"));
    }

    #[test]
    fn test_resolve_exact() {
        let registry = registry();
        assert_eq!(registry.resolve_domain("ptchdbits.co").as_deref(), Some("CHDBits"));
        assert_eq!(registry.resolve_domain("hdsky.org").as_deref(), Some("HDSky"));
    }

    #[test]
    fn test_resolve_suffix() {
        let registry = registry();
        assert_eq!(
            registry.resolve_domain("tracker.hdsky.me").as_deref(),
            Some("HDSky")
        );
        assert_eq!(
            registry.resolve_domain("audiences.me").as_deref(),
            Some("Audiences")
        );
    }

    #[test]
    fn test_resolve_unknown() {
        assert!(registry().resolve_domain("example.com").is_none());
        // Suffix matching respects label boundaries
        assert!(registry().resolve_domain("notptchdbits.co").is_none());
    }
}
