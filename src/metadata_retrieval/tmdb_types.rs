/// TMDB API response types for deserialization.
use serde::Deserialize;

/// Response of `/search/tv`. Results stay raw for archival.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

/// A TV show as listed in search results.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbShow {
    pub id: u64,
    pub name: String,
    /// "YYYY-MM-DD", or empty when unknown
    pub first_air_date: Option<String>,
}

/// Response of `/tv/{id}`; only the season list is of interest.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbShowDetails {
    #[serde(default)]
    pub seasons: Vec<TmdbSeasonSummary>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbSeasonSummary {
    pub season_number: Option<u32>,
}

/// Response of `/tv/{id}/season/{n}`.
#[derive(Debug, Deserialize)]
pub(super) struct TmdbSeason {
    #[serde(default)]
    pub episodes: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TmdbEpisode {
    pub season_number: u32,
    pub episode_number: u32,
    pub name: Option<String>,
    pub air_date: Option<String>,
    pub overview: Option<String>,
}
