//! Media metadata lookup.
//!
//! Resolves an external media id to the facts the classifier needs
//! (genre ids, origin countries, original language).

mod tmdb;

pub use tmdb::{TmdbClient, TmdbConfig};

use async_trait::async_trait;
use thiserror::Error;

use crate::classifier::{MediaFacts, MediaType};

/// Errors that can occur when looking up media metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded, please wait before retrying")]
    RateLimitExceeded,

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing API key, etc.).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

/// Source of media facts keyed by external id.
#[async_trait]
pub trait MediaMetadata: Send + Sync {
    /// Facts for a media item, or `None` if the id is unknown.
    async fn lookup(
        &self,
        media_type: MediaType,
        external_id: u32,
    ) -> Result<Option<MediaFacts>, MetadataError>;
}
