//! TMDB (The Movie Database) API client.
//!
//! TMDB requires an API key for access.
//! Rate limits are generous (around 40 requests per second).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{MediaMetadata, MetadataError};
use crate::classifier::{MediaFacts, MediaType};

const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// TMDB API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// TMDB API key (required).
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// TMDB API client.
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    /// Create a new TMDB client.
    pub fn new(config: TmdbConfig) -> Result<Self, MetadataError> {
        if config.api_key.is_empty() {
            return Err(MetadataError::NotConfigured(
                "TMDB API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        let base_url = config
            .base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key,
        })
    }

    /// Details endpoint for a media type. Anime is catalogued as TV.
    fn details_url(&self, media_type: MediaType, tmdb_id: u32) -> Option<String> {
        let kind = match media_type {
            MediaType::Movie => "movie",
            MediaType::Tv | MediaType::Anime => "tv",
            MediaType::Unknown => return None,
        };
        Some(format!("{}/{}/{}", self.base_url, kind, tmdb_id))
    }
}

#[async_trait]
impl MediaMetadata for TmdbClient {
    async fn lookup(
        &self,
        media_type: MediaType,
        external_id: u32,
    ) -> Result<Option<MediaFacts>, MetadataError> {
        let Some(url) = self.details_url(media_type, external_id) else {
            return Ok(None);
        };

        debug!("TMDB lookup: type={}, id={}", media_type, external_id);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", &self.api_key)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(MetadataError::NotConfigured(
                "Invalid TMDB API key".to_string(),
            ));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MetadataError::RateLimitExceeded);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MetadataError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let details: TmdbDetails = response.json().await.map_err(|e| {
            MetadataError::ParseError(format!("Failed to parse details response: {}", e))
        })?;

        Ok(Some(details.into_facts()))
    }
}

// TMDB API response types (internal). Movies and TV share the fields we need.

#[derive(Debug, Deserialize)]
struct TmdbDetails {
    #[serde(default)]
    genres: Vec<TmdbGenre>,
    /// Always present on TV; newer API versions also send it for movies.
    #[serde(default)]
    origin_country: Vec<String>,
    #[serde(default)]
    production_countries: Vec<TmdbCountry>,
    #[serde(default)]
    original_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct TmdbCountry {
    iso_3166_1: String,
}

impl TmdbDetails {
    fn into_facts(self) -> MediaFacts {
        let origin_countries = if self.origin_country.is_empty() {
            self.production_countries
                .into_iter()
                .map(|c| c.iso_3166_1.to_uppercase())
                .collect()
        } else {
            self.origin_country
                .into_iter()
                .map(|c| c.to_uppercase())
                .collect()
        };

        MediaFacts {
            genre_ids: self.genres.into_iter().map(|g| g.id).collect(),
            origin_countries,
            original_language: self.original_language.filter(|l| !l.is_empty()),
        }
    }
}
