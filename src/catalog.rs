//! Show search across all providers
//!
//! The catalog owns one cached provider per metadata source and merges their
//! answers. Results are concatenated in registration order (TVMaze first,
//! then TMDB); they are never interleaved or re-ranked.

use crate::config::Config;
use crate::metadata_retrieval::{
    CachedMetadataProvider, Episode, MetadataProvider, MetadataRetrievalError, Provider, Show,
    ShowId, TmdbProvider, TvMazeProvider,
};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// A provider wrapped with its cache, as held by the catalog
pub type Source = CachedMetadataProvider<Box<dyn MetadataProvider>>;

/// A provider that failed while answering a search
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: Provider,
    pub error: MetadataRetrievalError,
}

/// Merged result of a search over all providers
///
/// A failing provider does not hide the results of the others.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Matches of every provider, in provider order
    pub shows: Vec<Show>,
    /// Providers that could not answer
    pub failures: Vec<ProviderFailure>,
}

/// How episodes should be ordered when listed
///
/// Only the providers' air order is implemented. The other modes are
/// accepted so callers can pass them through, and fall back to air order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpisodeOrder {
    /// Ascending season, then episode, as aired
    #[default]
    Aired,
    /// DVD release order
    Dvd,
    /// One continuous numbering across seasons
    Absolute,
}

impl fmt::Display for EpisodeOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EpisodeOrder::Aired => "aired",
            EpisodeOrder::Dvd => "dvd",
            EpisodeOrder::Absolute => "absolute",
        })
    }
}

impl FromStr for EpisodeOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aired" => Ok(EpisodeOrder::Aired),
            "dvd" => Ok(EpisodeOrder::Dvd),
            "absolute" | "continuous" => Ok(EpisodeOrder::Absolute),
            other => Err(format!(
                "unknown episode order '{}' (expected aired, dvd or absolute)",
                other
            )),
        }
    }
}

/// Entry point for show lookups
pub struct Catalog {
    sources: Vec<Source>,
    locale: String,
}

impl Catalog {
    /// Creates a catalog over `sources`, queried in the given order
    pub fn new(sources: Vec<Source>, locale: impl Into<String>) -> Self {
        Self {
            sources,
            locale: locale.into(),
        }
    }

    /// Opens the TVMaze and TMDB providers with the cache described by `config`
    pub fn open(config: &Config) -> Result<Self, crate::RenamizerError> {
        let root = config.cache_root()?;
        debug!("Using cache directory {}", root.display());

        let tvmaze: Box<dyn MetadataProvider> = Box::new(TvMazeProvider::new(config)?);
        let tmdb: Box<dyn MetadataProvider> = Box::new(TmdbProvider::new(config)?);

        if config.tmdb_token.is_none() && config.tmdb_api_key.is_none() {
            warn!("No TMDB credential configured; TMDB lookups will fail");
        }

        Ok(Self::new(
            vec![
                CachedMetadataProvider::open(tvmaze, &root, config.cache_ttl)?,
                CachedMetadataProvider::open(tmdb, &root, config.cache_ttl)?,
            ],
            config.locale.clone(),
        ))
    }

    /// Searches every provider for `query`
    ///
    /// Display names are localized before returning, so shows served from a
    /// cache written under another locale come back consistent.
    pub fn search(&self, query: &str) -> SearchOutcome {
        let mut outcome = SearchOutcome::default();

        for source in &self.sources {
            match source.search_shows(query) {
                Ok(shows) => {
                    debug!("{} returned {} show(s)", source.provider(), shows.len());
                    outcome.shows.extend(shows);
                }
                Err(error) => {
                    warn!("Search on {} failed: {}", source.provider(), error);
                    outcome.failures.push(ProviderFailure {
                        provider: source.provider(),
                        error,
                    });
                }
            }
        }

        self.localize(&mut outcome.shows);
        outcome
    }

    /// Re-applies the localized display name to every show
    pub fn localize(&self, shows: &mut [Show]) {
        for show in shows {
            show.localize(&self.locale);
        }
    }

    /// Lists the episodes of a show in provider order
    pub fn episodes(&self, show: &ShowId) -> Result<Vec<Episode>, MetadataRetrievalError> {
        self.source(show.provider)?.fetch_episodes(show.id)
    }

    /// Lists the episodes of a show in the requested order
    pub fn episodes_in_order(
        &self,
        show: &ShowId,
        order: EpisodeOrder,
    ) -> Result<Vec<Episode>, MetadataRetrievalError> {
        if order != EpisodeOrder::Aired {
            warn!("Episode order '{}' is not supported yet, using aired order", order);
        }
        self.episodes(show)
    }

    /// Drops everything cached for one show
    pub fn refresh(&self, show: &ShowId) -> Result<(), MetadataRetrievalError> {
        Ok(self.source(show.provider)?.invalidate(show.id)?)
    }

    fn source(&self, provider: Provider) -> Result<&Source, MetadataRetrievalError> {
        self.sources
            .iter()
            .find(|s| s.provider() == provider)
            .ok_or(MetadataRetrievalError::ProviderUnavailable(provider))
    }
}
