//! Genre/country based secondary category classification.
//!
//! A pure, total function from media facts to a category label such as
//! "TV/Chinese". Rules are evaluated in order per media type and the
//! first satisfied rule wins.

mod rules;

pub use rules::{Condition, Rule, RuleSet};

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Category labels produced by the classifier.
pub mod labels {
    pub const MOVIE_ANIMATION: &str = "Movie/Animation";
    pub const MOVIE_CHINESE: &str = "Movie/Chinese";
    pub const MOVIE_FOREIGN: &str = "Movie/Foreign";

    pub const TV_CHINESE_ANIMATION: &str = "TV/ChineseAnimation";
    pub const TV_JAPANESE_ANIMATION: &str = "TV/JapaneseAnimation";
    pub const TV_DOCUMENTARY: &str = "TV/Documentary";
    pub const TV_KIDS: &str = "TV/Kids";
    pub const TV_VARIETY: &str = "TV/Variety";
    pub const TV_CHINESE: &str = "TV/Chinese";
    pub const TV_WESTERN: &str = "TV/Western";
    pub const TV_EAST_ASIAN: &str = "TV/EastAsian";
    pub const TV_UNCATEGORIZED: &str = "TV/Uncategorized";

    pub const ANIME_CHINESE_ANIMATION: &str = "Anime/ChineseAnimation";
    pub const ANIME_JAPANESE_ANIMATION: &str = "Anime/JapaneseAnimation";
    pub const ANIME_UNCATEGORIZED: &str = "Anime/Uncategorized";

    /// Label for an unknown media type.
    pub const UNCATEGORIZED: &str = "Uncategorized";

    pub const MOVIE: &[&str] = &[MOVIE_ANIMATION, MOVIE_CHINESE, MOVIE_FOREIGN];

    pub const TV: &[&str] = &[
        TV_CHINESE_ANIMATION,
        TV_JAPANESE_ANIMATION,
        TV_DOCUMENTARY,
        TV_KIDS,
        TV_VARIETY,
        TV_CHINESE,
        TV_WESTERN,
        TV_EAST_ASIAN,
        TV_UNCATEGORIZED,
    ];

    pub const ANIME: &[&str] = &[
        ANIME_CHINESE_ANIMATION,
        ANIME_JAPANESE_ANIMATION,
        ANIME_UNCATEGORIZED,
    ];
}

/// TMDB genre ids referenced by the rules.
pub mod genres {
    pub const ANIMATION: u32 = 16;
    pub const DOCUMENTARY: u32 = 99;
    pub const KIDS: u32 = 10762;
    pub const REALITY: u32 = 10764;
    pub const TALK: u32 = 10767;
}

/// Kind of media a torrent was downloaded as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
    Anime,
    #[default]
    #[serde(other)]
    Unknown,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
            MediaType::Anime => "anime",
            MediaType::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, MediaType::Unknown)
    }
}

impl From<&str> for MediaType {
    /// Lenient parse; anything unrecognized is `Unknown`.
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "movie" | "movies" => MediaType::Movie,
            "tv" | "show" | "series" => MediaType::Tv,
            "anime" => MediaType::Anime,
            _ => MediaType::Unknown,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media metadata the rules are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFacts {
    #[serde(default)]
    pub genre_ids: BTreeSet<u32>,
    /// ISO 3166-1 country codes.
    #[serde(default)]
    pub origin_countries: BTreeSet<String>,
    /// ISO 639-1 language code.
    #[serde(default)]
    pub original_language: Option<String>,
}

/// Rule-cascade classifier.
#[derive(Debug, Clone)]
pub struct GenreClassifier {
    movie: RuleSet,
    tv: RuleSet,
    anime: RuleSet,
}

impl Default for GenreClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl GenreClassifier {
    pub fn new() -> Self {
        Self {
            movie: rules::movie_rules(),
            tv: rules::tv_rules(),
            anime: rules::anime_rules(),
        }
    }

    /// Classify media into a secondary category label. Never fails.
    pub fn classify(&self, media_type: MediaType, facts: &MediaFacts) -> String {
        let label = match media_type {
            MediaType::Movie => self.movie.evaluate(facts),
            MediaType::Tv => self.tv.evaluate(facts),
            MediaType::Anime => self.anime.evaluate(facts),
            MediaType::Unknown => labels::UNCATEGORIZED,
        };
        label.to_string()
    }
}
