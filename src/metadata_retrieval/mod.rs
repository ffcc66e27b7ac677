/// Data structures and traits for TV series metadata retrieval.
///
/// This module provides the canonical show and episode records shared by all
/// providers, the trait every provider implements, and the HTTP plumbing the
/// provider adapters have in common.
mod cached;
mod tmdb;
mod tmdb_types;
mod tvmaze;
mod tvmaze_types;

#[cfg(test)]
pub(crate) mod test_support;

pub use cached::CachedMetadataProvider;
pub use tmdb::TmdbProvider;
pub use tvmaze::TvMazeProvider;

use crate::cache::CacheError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during metadata retrieval operations.
#[derive(Debug, Error)]
pub enum MetadataRetrievalError {
    /// Request to the metadata provider failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// The provider answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Failed to parse the provider's JSON response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The provider needs a credential that is not configured
    #[error("No credential configured for {0}")]
    MissingCredential(Provider),

    /// No provider is registered for the requested source
    #[error("Provider {0} is not available")]
    ProviderUnavailable(Provider),

    /// Cache maintenance failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// The upstream metadata sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// TVMaze, an episode-index style API
    TvMaze,
    /// The Movie Database, a movie-database style API
    Tmdb,
}

impl Provider {
    /// Stable lowercase name used in cache keys and output
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::TvMaze => "tvmaze",
            Provider::Tmdb => "tmdb",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tvmaze" => Ok(Provider::TvMaze),
            "tmdb" => Ok(Provider::Tmdb),
            other => Err(format!("unknown provider '{}' (expected tvmaze or tmdb)", other)),
        }
    }
}

/// Identity of a show: the provider together with its native id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShowId {
    pub provider: Provider,
    pub id: u64,
}

impl ShowId {
    pub fn new(provider: Provider, id: u64) -> Self {
        Self { provider, id }
    }

    /// Key under which this show and its episodes are cached
    pub fn cache_key(&self) -> String {
        format!("{}-{}", self.provider, self.id)
    }
}

impl fmt::Display for ShowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

/// An alternate title of a show, optionally tied to a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternateName {
    pub name: String,
    /// ISO 3166-1 alpha-2 country code, e.g. "ES"
    pub country_code: Option<String>,
}

/// A TV show as returned by one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    /// The provider's default title
    pub name: String,
    /// Title shown to the user; localized when an alternate name matches
    pub display_name: String,
    /// Year of the first air date
    pub year: Option<u16>,
    /// Alternate titles, in provider order
    pub alternate_names: Vec<AlternateName>,
    /// Provider payload kept for archival purposes only
    pub raw: serde_json::Value,
}

impl Show {
    /// Sets `display_name` to the localized name for `locale`.
    ///
    /// Applying this repeatedly yields the same name.
    pub fn localize(&mut self, locale: &str) {
        self.display_name = localized_name(&self.name, &self.alternate_names, locale);
    }

    /// Case-insensitive substring match against the canonical and display name
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.display_name.to_lowercase().contains(&query)
    }
}

/// Represents a single episode of a TV series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// The season number this episode belongs to
    pub season_number: u32,
    /// The episode number within the season
    pub episode_number: u32,
    /// The episode title, empty when the provider has none
    pub name: String,
    /// ISO air date (YYYY-MM-DD)
    pub air_date: Option<String>,
    /// A brief plain-text summary of the episode
    pub summary: String,
    /// Provider payload kept for archival purposes only
    pub raw: serde_json::Value,
}

/// Trait for metadata providers that can search shows and list episodes.
///
/// Implementors normalize their provider-specific JSON into [`Show`] and
/// [`Episode`] records before returning.
pub trait MetadataProvider {
    /// The source this provider talks to
    fn provider(&self) -> Provider;

    /// Searches shows by free text, in the provider's native order
    fn search_shows(&self, query: &str) -> Result<Vec<Show>, MetadataRetrievalError>;

    /// Lists every episode of a show, ascending by season then episode
    fn fetch_episodes(&self, show_id: u64) -> Result<Vec<Episode>, MetadataRetrievalError>;
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for Box<P> {
    fn provider(&self) -> Provider {
        (**self).provider()
    }

    fn search_shows(&self, query: &str) -> Result<Vec<Show>, MetadataRetrievalError> {
        (**self).search_shows(query)
    }

    fn fetch_episodes(&self, show_id: u64) -> Result<Vec<Episode>, MetadataRetrievalError> {
        (**self).fetch_episodes(show_id)
    }
}

/// Picks the first alternate name whose country matches `locale`,
/// falling back to the canonical name.
pub fn localized_name(canonical: &str, alternates: &[AlternateName], locale: &str) -> String {
    alternates
        .iter()
        .find(|alt| {
            alt.country_code
                .as_deref()
                .is_some_and(|code| code.eq_ignore_ascii_case(locale))
        })
        .map(|alt| alt.name.clone())
        .unwrap_or_else(|| canonical.to_string())
}

/// Extracts the year from an ISO date such as "1994-09-22".
pub(crate) fn year_from_date(date: Option<&str>) -> Option<u16> {
    let prefix = date?.get(..4)?;
    if prefix.chars().all(|c| c.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}

/// Providers send missing dates as either null or "".
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Builds a blocking HTTP client with an explicit timeout.
pub(crate) fn build_client(
    timeout: Duration,
) -> Result<reqwest::blocking::Client, MetadataRetrievalError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("renamizer/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| MetadataRetrievalError::RequestError(e.to_string()))
}

/// Sends a request and decodes the JSON body.
pub(crate) fn get_json<T: DeserializeOwned>(
    request: reqwest::blocking::RequestBuilder,
) -> Result<T, MetadataRetrievalError> {
    let response = request
        .send()
        .map_err(|e| MetadataRetrievalError::RequestError(e.without_url().to_string()))?;

    let status = response.status();
    let url = redacted_url(response.url());
    debug!("GET {} -> {}", url, status);

    if !status.is_success() {
        return Err(MetadataRetrievalError::HttpStatus {
            status: status.as_u16(),
            url,
        });
    }

    response
        .json()
        .map_err(|e| MetadataRetrievalError::ParseError(e.without_url().to_string()))
}

/// Query parameters whose values never appear in logs or errors
const SECRET_PARAMS: &[&str] = &["api_key"];

/// Renders `url` with the values of credential parameters masked.
pub(crate) fn redacted_url(url: &reqwest::Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if SECRET_PARAMS.contains(&key.as_ref()) {
                "REDACTED".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    if pairs.is_empty() {
        redacted.set_query(None);
    } else {
        redacted.query_pairs_mut().clear().extend_pairs(&pairs);
    }
    redacted.to_string()
}

/// Decodes a provider-shaped struct while keeping the raw JSON for archival.
pub(crate) fn typed_with_raw<T: DeserializeOwned>(
    raw: serde_json::Value,
) -> Result<(T, serde_json::Value), MetadataRetrievalError> {
    let typed = T::deserialize(&raw).map_err(|e| MetadataRetrievalError::ParseError(e.to_string()))?;
    Ok((typed, raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alt(name: &str, code: Option<&str>) -> AlternateName {
        AlternateName {
            name: name.to_string(),
            country_code: code.map(str::to_string),
        }
    }

    fn show(name: &str, alternates: Vec<AlternateName>) -> Show {
        Show {
            id: ShowId::new(Provider::TvMaze, 1),
            name: name.to_string(),
            display_name: name.to_string(),
            year: None,
            alternate_names: alternates,
            raw: json!({}),
        }
    }

    #[test]
    fn test_localized_name_picks_first_matching_country() {
        let alternates = vec![
            alt("Freunde", Some("DE")),
            alt("Amigos", Some("ES")),
            alt("Amigos (2)", Some("ES")),
        ];
        assert_eq!(localized_name("Friends", &alternates, "ES"), "Amigos");
    }

    #[test]
    fn test_localized_name_falls_back_to_canonical() {
        let alternates = vec![alt("Freunde", Some("DE")), alt("Untitled", None)];
        assert_eq!(localized_name("Friends", &alternates, "ES"), "Friends");
        assert_eq!(localized_name("Friends", &[], "ES"), "Friends");
    }

    #[test]
    fn test_localize_is_idempotent() {
        let mut s = show("Friends", vec![alt("Amigos", Some("ES"))]);
        s.localize("ES");
        assert_eq!(s.display_name, "Amigos");
        s.localize("ES");
        assert_eq!(s.display_name, "Amigos");
        s.localize("FR");
        assert_eq!(s.display_name, "Friends");
    }

    #[test]
    fn test_matches_query_is_case_insensitive_substring() {
        let mut s = show("Friends", vec![alt("Amigos", Some("ES"))]);
        s.localize("ES");
        assert!(s.matches_query("friend"));
        assert!(s.matches_query("AMIG"));
        assert!(!s.matches_query("Seinfeld"));
    }

    #[test]
    fn test_year_from_date() {
        assert_eq!(year_from_date(Some("1994-09-22")), Some(1994));
        assert_eq!(year_from_date(Some("")), None);
        assert_eq!(year_from_date(Some("n/a")), None);
        assert_eq!(year_from_date(None), None);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("TVMaze".parse::<Provider>(), Ok(Provider::TvMaze));
        assert_eq!("tmdb".parse::<Provider>(), Ok(Provider::Tmdb));
        assert!("imdb".parse::<Provider>().is_err());
    }

    #[test]
    fn test_redacted_url_masks_api_key() {
        let url = reqwest::Url::parse(
            "https://api.themoviedb.org/3/search/tv?api_key=SECRET123&query=Friends",
        )
        .unwrap();
        let redacted = redacted_url(&url);

        assert!(!redacted.contains("SECRET123"));
        assert_eq!(
            redacted,
            "https://api.themoviedb.org/3/search/tv?api_key=REDACTED&query=Friends"
        );

        let plain = reqwest::Url::parse("https://api.tvmaze.com/shows/431/episodes").unwrap();
        assert_eq!(redacted_url(&plain), "https://api.tvmaze.com/shows/431/episodes");
    }

    #[test]
    fn test_show_id_cache_key() {
        assert_eq!(ShowId::new(Provider::Tmdb, 1668).cache_key(), "tmdb-1668");
        assert_eq!(ShowId::new(Provider::TvMaze, 431).to_string(), "tvmaze:431");
    }
}
