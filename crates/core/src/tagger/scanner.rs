//! Scan orchestration.
//!
//! Drives one full scan per client:
//! - Clients are scanned sequentially
//! - Torrents are processed sequentially in ascending add order
//! - Cancellation is checked between torrents

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::classifier::{GenreClassifier, MediaType};
use crate::history::{sort_by_added, ClassificationRecord, HistoryMatcher, HistoryStore};
use crate::metadata::MediaMetadata;
use crate::metrics::TORRENTS_PROCESSED;
use crate::site::TrackerResolver;
use crate::torrent_client::{DownloadClient, TorrentInfo};

use super::config::TaggerConfig;
use super::delta::TagCategoryDelta;
use super::types::{RunContext, ScanReport, TaggerError, TorrentAddedEvent, TorrentOutcome};
use super::writer;

/// Classifies torrents and writes site tags, title tags and categories.
pub struct Tagger {
    config: TaggerConfig,
    resolver: TrackerResolver,
    classifier: GenreClassifier,
    history: Arc<dyn HistoryStore>,
    metadata: Option<Arc<dyn MediaMetadata>>,
}

impl Tagger {
    pub fn new(
        config: TaggerConfig,
        resolver: TrackerResolver,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            config,
            resolver,
            classifier: GenreClassifier::new(),
            history,
            metadata: None,
        }
    }

    /// Use a metadata source for category classification.
    pub fn with_metadata(mut self, metadata: Arc<dyn MediaMetadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    /// Scan every targeted client in the context.
    pub async fn scan(&self, ctx: &RunContext) -> Result<ScanReport, TaggerError> {
        if !self.config.enabled {
            debug!("Tagger disabled, ignoring scan");
            return Err(TaggerError::Disabled);
        }

        let clients: Vec<&Arc<dyn DownloadClient>> = ctx
            .clients()
            .iter()
            .filter(|c| self.config.targets(c.name()))
            .collect();
        if clients.is_empty() {
            error!("No download clients to scan");
            return Err(TaggerError::NoClients);
        }

        let started = Instant::now();
        let mut report = ScanReport::default();
        // Shared across clients so a cross-seed on another client inherits
        let mut matcher = HistoryMatcher::new();

        for client in clients {
            if ctx.is_cancelled() {
                report.cancelled = true;
                break;
            }
            self.scan_client(client.as_ref(), ctx, &mut matcher, &mut report)
                .await;
        }

        if report.clients_scanned == 0 && report.clients_failed > 0 {
            error!(
                "None of the {} targeted download clients could be listed",
                report.clients_failed
            );
            return Err(TaggerError::NoReachableClients(report.clients_failed));
        }

        info!(
            "Scan finished in {:.1}s: {} processed, {} tagged, {} unchanged, {} skipped, {} failed{}",
            started.elapsed().as_secs_f64(),
            report.processed,
            report.tagged,
            report.unchanged,
            report.skipped,
            report.failed,
            if report.cancelled { " (cancelled)" } else { "" }
        );

        Ok(report)
    }

    /// Scan one client. Listing failures skip the client.
    ///
    /// `matcher` carries the duplicates seen so far in this scan.
    pub async fn scan_client(
        &self,
        client: &dyn DownloadClient,
        ctx: &RunContext,
        matcher: &mut HistoryMatcher,
        report: &mut ScanReport,
    ) {
        let mut torrents = match client.list_torrents().await {
            Ok(torrents) => torrents,
            Err(e) => {
                warn!("Failed to list torrents on {}, skipping: {}", client.name(), e);
                report.clients_failed += 1;
                return;
            }
        };
        report.clients_scanned += 1;
        info!("Scanning {} torrents on {}", torrents.len(), client.name());

        sort_by_added(&mut torrents);
        let site_names = self.resolver.registry().site_names();

        for torrent in &torrents {
            if ctx.is_cancelled() {
                info!("Scan cancelled on {}", client.name());
                report.cancelled = true;
                return;
            }

            match self
                .process_torrent(client, torrent, matcher, &site_names)
                .await
            {
                Ok(outcome) => {
                    debug!(
                        client = %client.name(),
                        hash = %torrent.hash,
                        "Processed torrent: {:?}", outcome
                    );
                    TORRENTS_PROCESSED
                        .with_label_values(&[outcome.metric_label()])
                        .inc();
                    report.record(&outcome);
                }
                Err(e) => {
                    warn!(
                        client = %client.name(),
                        hash = %torrent.hash,
                        "Failed to process torrent {}: {}", torrent.name, e
                    );
                    TORRENTS_PROCESSED.with_label_values(&["failed"]).inc();
                    report.record_failure();
                }
            }
        }
    }

    async fn process_torrent(
        &self,
        client: &dyn DownloadClient,
        torrent: &TorrentInfo,
        matcher: &mut HistoryMatcher,
        site_names: &BTreeSet<String>,
    ) -> Result<TorrentOutcome, TaggerError> {
        let persisted = self.history.get_by_hash(&torrent.hash)?;
        let record = matcher.match_history(torrent, persisted);

        let site = if has_site_tag(&torrent.tags, site_names) {
            None
        } else if record.site.is_some() {
            record.site.clone()
        } else {
            let resolved = if self.config.enable_site_tag {
                let trackers = client.get_trackers(&torrent.hash).await?;
                self.resolver.resolve_site(&trackers)
            } else {
                None
            };
            if resolved.is_none() && !record.has_media_identity() {
                return Ok(TorrentOutcome::skipped("no site or media identity"));
            }
            resolved
        };

        let desired_tags = self.desired_tags(site, record.media_title.clone());

        let desired_category =
            if self.wants_category(client, torrent.category.as_deref(), record.media_type) {
                self.category_for(&record).await?
            } else {
                None
            };

        let delta = TagCategoryDelta::compute(
            desired_tags,
            desired_category,
            &torrent.tags,
            torrent.category.as_deref(),
        );
        self.write(client, &torrent.hash, delta).await
    }

    /// Classify and tag a single freshly added torrent from its event
    /// context, without the historical scan or a metadata lookup.
    pub async fn classify_added(
        &self,
        ctx: &RunContext,
        event: &TorrentAddedEvent,
    ) -> Result<TorrentOutcome, TaggerError> {
        if !self.config.enabled {
            debug!("Tagger disabled, ignoring torrent-added event");
            return Err(TaggerError::Disabled);
        }

        let client = ctx
            .client(&event.client)
            .ok_or_else(|| TaggerError::UnknownClient(event.client.clone()))?;
        if !self.config.targets(client.name()) {
            info!("Torrent added on {}, which is not targeted, skipping", client.name());
            return Ok(TorrentOutcome::skipped("client not targeted"));
        }

        let hash = event.info_hash.to_lowercase();
        let context = &event.context;

        // A torrent that was just added may not be visible yet
        let current = match client.get_torrent(&hash).await {
            Ok(torrent) => Some(torrent),
            Err(e) => {
                debug!("Could not read torrent {} on {}: {}", hash, client.name(), e);
                None
            }
        };
        let current_tags = current.as_ref().map(|t| t.tags.clone()).unwrap_or_default();
        let current_category = current.as_ref().and_then(|t| t.category.clone());

        let site_names = self.resolver.registry().site_names();
        let site = if !self.config.enable_site_tag || has_site_tag(&current_tags, &site_names) {
            None
        } else {
            match context.site.clone().filter(|s| !s.is_empty()) {
                Some(site) => Some(site),
                None => match client.get_trackers(&hash).await {
                    Ok(trackers) => self.resolver.resolve_site(&trackers),
                    Err(e) => {
                        debug!("Could not read trackers of {}: {}", hash, e);
                        None
                    }
                },
            }
        };

        let desired_tags = self.desired_tags(site, context.title.clone());
        let desired_category =
            if self.wants_category(client.as_ref(), current_category.as_deref(), context.media_type)
            {
                Some(self.classifier.classify(context.media_type, &context.facts))
            } else {
                None
            };

        let mut delta = TagCategoryDelta::compute(
            desired_tags,
            desired_category,
            &current_tags,
            current_category.as_deref(),
        );
        if current.is_none() {
            delta.original_tags = None;
        }

        let result = self.write(client.as_ref(), &hash, delta).await;
        let label = match &result {
            Ok(outcome) => outcome.metric_label(),
            Err(_) => "failed",
        };
        TORRENTS_PROCESSED.with_label_values(&[label]).inc();
        result
    }

    fn desired_tags(&self, site: Option<String>, title: Option<String>) -> Vec<String> {
        let mut tags = Vec::new();
        if self.config.enable_site_tag {
            tags.extend(site);
        }
        if self.config.enable_media_title_tag {
            tags.extend(
                title
                    .filter(|t| !t.trim().is_empty())
                    .map(|t| title_tag(&t)),
            );
        }
        tags
    }

    fn wants_category(
        &self,
        client: &dyn DownloadClient,
        current: Option<&str>,
        media_type: MediaType,
    ) -> bool {
        self.config.enable_category
            && client.capabilities().independent_categories
            && current.map_or(true, str::is_empty)
            && media_type.is_known()
    }

    async fn category_for(
        &self,
        record: &ClassificationRecord,
    ) -> Result<Option<String>, TaggerError> {
        let (Some(id), Some(metadata)) = (record.external_media_id, &self.metadata) else {
            debug!("No media id or metadata source, not categorizing");
            return Ok(None);
        };

        let facts = metadata.lookup(record.media_type, id).await?;
        Ok(facts.map(|facts| self.classifier.classify(record.media_type, &facts)))
    }

    async fn write(
        &self,
        client: &dyn DownloadClient,
        hash: &str,
        delta: TagCategoryDelta,
    ) -> Result<TorrentOutcome, TaggerError> {
        if delta.is_empty() {
            return Ok(TorrentOutcome::Unchanged);
        }
        writer::apply(client, hash, &delta).await?;
        Ok(TorrentOutcome::Tagged {
            tags: delta.tags,
            category: delta.category,
        })
    }
}

/// Clients split tag lists on commas, so a title like
/// "Love, Death & Robots" must not carry one.
pub fn title_tag(title: &str) -> String {
    title.trim().replace(',', "，")
}

/// An existing tag already names a known site.
fn has_site_tag(tags: &BTreeSet<String>, site_names: &BTreeSet<String>) -> bool {
    tags.iter().any(|t| site_names.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SqliteHistoryStore;
    use crate::testing::{fixtures, MockDownloadClient, MockMediaMetadata, MockWrite};
    use crate::torrent_client::ClientBackend;

    fn config() -> TaggerConfig {
        TaggerConfig {
            enabled: true,
            enable_site_tag: true,
            enable_media_title_tag: true,
            enable_category: true,
            ..Default::default()
        }
    }

    struct Setup {
        tagger: Tagger,
        history: Arc<SqliteHistoryStore>,
        metadata: Arc<MockMediaMetadata>,
    }

    fn setup(config: TaggerConfig) -> Setup {
        let history = Arc::new(SqliteHistoryStore::in_memory().unwrap());
        let metadata = Arc::new(MockMediaMetadata::new());
        let tagger = Tagger::new(config, fixtures::resolver(), history.clone())
            .with_metadata(metadata.clone());
        Setup {
            tagger,
            history,
            metadata,
        }
    }

    #[tokio::test]
    async fn test_disabled_scan() {
        let s = setup(TaggerConfig::default());
        let ctx = RunContext::new(vec![]);
        assert!(matches!(
            s.tagger.scan(&ctx).await,
            Err(TaggerError::Disabled)
        ));
    }

    #[tokio::test]
    async fn test_no_clients() {
        let s = setup(config());
        let ctx = RunContext::new(vec![]);
        assert!(matches!(
            s.tagger.scan(&ctx).await,
            Err(TaggerError::NoClients)
        ));
    }

    #[tokio::test]
    async fn test_target_clients_filter() {
        let mut cfg = config();
        cfg.target_clients = vec!["other".to_string()];
        let s = setup(cfg);
        let client = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        let ctx = RunContext::new(vec![client.clone()]);

        assert!(matches!(
            s.tagger.scan(&ctx).await,
            Err(TaggerError::NoClients)
        ));
        assert_eq!(client.list_calls().await, 0);
    }

    #[tokio::test]
    async fn test_site_resolved_from_trackers() {
        let s = setup(config());
        let client = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        client.add_torrent(fixtures::torrent("h1", "Show", 10, 1)).await;
        client
            .set_trackers("h1", vec![fixtures::announce("chdbits.xyz")])
            .await;
        let ctx = RunContext::new(vec![client.clone()]);

        let report = s.tagger.scan(&ctx).await.unwrap();

        assert_eq!(report.tagged, 1);
        assert_eq!(
            client.writes().await,
            vec![MockWrite::SetTags {
                hash: "h1".to_string(),
                tags: vec!["CHDBits".to_string()]
            }]
        );
    }

    #[tokio::test]
    async fn test_unattributed_torrent_is_skipped() {
        let s = setup(config());
        let client = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        client.add_torrent(fixtures::torrent("h1", "Show", 10, 1)).await;
        client
            .set_trackers("h1", vec![fixtures::announce("unknown.example.org")])
            .await;
        let ctx = RunContext::new(vec![client.clone()]);

        let report = s.tagger.scan(&ctx).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert!(client.writes().await.is_empty());
    }

    #[tokio::test]
    async fn test_existing_site_tag_skips_site_tagging() {
        let s = setup(config());
        s.history
            .insert(&fixtures::history_record(
                "h1",
                Some("HDSky"),
                Some("Some Show"),
                MediaType::Unknown,
                None,
            ))
            .unwrap();
        let client = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        let mut torrent = fixtures::torrent("h1", "Show", 10, 1);
        torrent.tags.insert("CHDBits".to_string());
        client.add_torrent(torrent).await;
        let ctx = RunContext::new(vec![client.clone()]);

        s.tagger.scan(&ctx).await.unwrap();

        assert_eq!(
            client.writes().await,
            vec![MockWrite::SetTags {
                hash: "h1".to_string(),
                tags: vec!["Some Show".to_string()]
            }]
        );
    }

    #[tokio::test]
    async fn test_category_from_metadata() {
        let s = setup(config());
        s.history
            .insert(&fixtures::history_record(
                "h1",
                Some("HDSky"),
                None,
                MediaType::Tv,
                Some(77),
            ))
            .unwrap();
        s.metadata
            .set_facts(MediaType::Tv, 77, fixtures::media_facts(&[18], &["KR"], None))
            .await;
        let client = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        client.add_category("TV/EastAsian").await;
        client.add_torrent(fixtures::torrent("h1", "Show", 10, 1)).await;
        let ctx = RunContext::new(vec![client.clone()]);

        s.tagger.scan(&ctx).await.unwrap();

        let torrent = client.torrent("h1").await.unwrap();
        assert_eq!(torrent.category.as_deref(), Some("TV/EastAsian"));
        assert!(torrent.tags.contains("HDSky"));
    }

    #[tokio::test]
    async fn test_existing_category_is_kept() {
        let s = setup(config());
        s.history
            .insert(&fixtures::history_record(
                "h1",
                Some("HDSky"),
                None,
                MediaType::Tv,
                Some(77),
            ))
            .unwrap();
        let client = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        let mut torrent = fixtures::torrent("h1", "Show", 10, 1);
        torrent.category = Some("Mine".to_string());
        client.add_torrent(torrent).await;
        let ctx = RunContext::new(vec![client.clone()]);

        s.tagger.scan(&ctx).await.unwrap();

        assert!(s.metadata.lookups().await.is_empty());
        assert_eq!(
            client.torrent("h1").await.unwrap().category.as_deref(),
            Some("Mine")
        );
    }

    #[tokio::test]
    async fn test_metadata_failure_fails_only_that_torrent() {
        let s = setup(config());
        for hash in ["h1", "h2"] {
            s.history
                .insert(&fixtures::history_record(
                    hash,
                    Some("HDSky"),
                    None,
                    MediaType::Movie,
                    Some(5),
                ))
                .unwrap();
        }
        s.metadata
            .set_next_error(crate::metadata::MetadataError::RateLimitExceeded)
            .await;
        let client = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        client.add_torrent(fixtures::torrent("h1", "A", 10, 1)).await;
        client.add_torrent(fixtures::torrent("h2", "B", 20, 2)).await;
        let ctx = RunContext::new(vec![client.clone()]);

        let report = s.tagger.scan(&ctx).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.tagged, 1);
    }

    #[tokio::test]
    async fn test_list_failure_skips_client() {
        let s = setup(config());
        let broken = Arc::new(MockDownloadClient::new("broken", ClientBackend::QBittorrent));
        broken
            .set_next_error(crate::torrent_client::DownloadClientError::Timeout)
            .await;
        let healthy = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        healthy.add_torrent(fixtures::torrent("h1", "Show", 10, 1)).await;
        healthy
            .set_trackers("h1", vec![fixtures::announce("hdsky.me")])
            .await;
        let ctx = RunContext::new(vec![broken.clone(), healthy.clone()]);

        let report = s.tagger.scan(&ctx).await.unwrap();

        assert_eq!(report.clients_failed, 1);
        assert_eq!(report.clients_scanned, 1);
        assert_eq!(report.tagged, 1);
    }

    #[tokio::test]
    async fn test_all_clients_unreachable() {
        let s = setup(config());
        let broken = Arc::new(MockDownloadClient::new("broken", ClientBackend::QBittorrent));
        broken
            .set_next_error(crate::torrent_client::DownloadClientError::Timeout)
            .await;
        let ctx = RunContext::new(vec![broken.clone()]);

        assert!(matches!(
            s.tagger.scan(&ctx).await,
            Err(TaggerError::NoReachableClients(1))
        ));
    }

    #[test]
    fn test_title_tag_replaces_commas() {
        assert_eq!(title_tag("Love, Death & Robots"), "Love， Death & Robots");
        assert_eq!(title_tag(" Some Show "), "Some Show");
    }

    #[tokio::test]
    async fn test_comma_title_is_idempotent() {
        let s = setup(config());
        s.history
            .insert(&fixtures::history_record(
                "h1",
                Some("HDSky"),
                Some("Love, Death & Robots"),
                MediaType::Unknown,
                None,
            ))
            .unwrap();
        let client = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        client.add_torrent(fixtures::torrent("h1", "Show", 10, 1)).await;
        let ctx = RunContext::new(vec![client.clone()]);

        let first = s.tagger.scan(&ctx).await.unwrap();
        let second = s.tagger.scan(&ctx).await.unwrap();

        assert_eq!(first.tagged, 1);
        assert_eq!(second.tagged, 0);
        assert_eq!(second.unchanged, 1);
        assert!(client
            .torrent("h1")
            .await
            .unwrap()
            .tags
            .contains("Love， Death & Robots"));
    }

    #[tokio::test]
    async fn test_classify_added_uses_context() {
        let s = setup(config());
        let client = Arc::new(MockDownloadClient::new("qb", ClientBackend::QBittorrent));
        client.add_category("Movie/Animation").await;
        client.add_torrent(fixtures::torrent("h1", "Film", 10, 1)).await;
        let ctx = RunContext::new(vec![client.clone()]);

        let event = TorrentAddedEvent {
            client: "qb".to_string(),
            info_hash: "H1".to_string(),
            context: crate::tagger::MediaContext {
                site: Some("Audiences".to_string()),
                title: Some("A Film".to_string()),
                media_type: MediaType::Movie,
                facts: fixtures::media_facts(&[16], &["JP"], Some("ja")),
            },
        };

        let outcome = s.tagger.classify_added(&ctx, &event).await.unwrap();

        assert_eq!(
            outcome,
            TorrentOutcome::Tagged {
                tags: vec!["Audiences".to_string(), "A Film".to_string()],
                category: Some("Movie/Animation".to_string()),
            }
        );
        assert!(s.metadata.lookups().await.is_empty());
    }

    #[tokio::test]
    async fn test_classify_added_unknown_client() {
        let s = setup(config());
        let ctx = RunContext::new(vec![]);
        let event = TorrentAddedEvent {
            client: "ghost".to_string(),
            info_hash: "h1".to_string(),
            context: Default::default(),
        };
        assert!(matches!(
            s.tagger.classify_added(&ctx, &event).await,
            Err(TaggerError::UnknownClient(_))
        ));
    }
}
