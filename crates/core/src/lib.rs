pub mod classifier;
pub mod config;
pub mod history;
pub mod metadata;
pub mod metrics;
pub mod scheduler;
pub mod site;
pub mod tagger;
pub mod testing;
pub mod torrent_client;

pub use classifier::{GenreClassifier, MediaFacts, MediaType};
pub use config::{
    load_config, load_config_from_str, validate_config, ClientConfig, Config, ConfigError,
    DatabaseConfig, SanitizedConfig, ServerConfig, SiteConfig,
};
pub use history::{
    ClassificationRecord, DedupKey, HistoryError, HistoryMatcher, HistoryRecord, HistoryStore,
    SqliteHistoryStore,
};
pub use metadata::{MediaMetadata, MetadataError, TmdbClient, TmdbConfig};
pub use scheduler::{ScheduleConfig, ScheduleMode, Scheduler, SchedulerError, Trigger};
pub use site::{SiteAliasTable, SiteError, SiteRegistry, StaticSiteRegistry, TrackerResolver};
pub use tagger::{
    MediaContext, RunContext, ScanReport, ScanService, ScanTrigger, TagCategoryDelta, Tagger,
    TaggerConfig, TaggerError, TorrentAddedEvent, TorrentOutcome,
};
pub use torrent_client::{
    create_client, ClientBackend, ClientCapabilities, DownloadClient, DownloadClientError,
    TorrentInfo,
};
