//! Site tagging and categorization of torrents held by download clients.
//!
//! A scan walks every targeted client, works out each torrent's source site
//! and content category, and writes only what is missing. The event path
//! does the same for one freshly added torrent.

mod config;
mod delta;
mod scanner;
mod service;
mod types;
mod writer;

pub use config::TaggerConfig;
pub use delta::TagCategoryDelta;
pub use scanner::{title_tag, Tagger};
pub use service::ScanService;
pub use types::{
    MediaContext, RunContext, ScanReport, ScanTrigger, TaggerError, TorrentAddedEvent,
    TorrentOutcome,
};
pub use writer::apply as apply_delta;
