//! Cached metadata provider implementation
//!
//! This module provides a caching wrapper for metadata providers that
//! serves fresh results from the local cache and refreshes stale ones.

use super::{Episode, MetadataProvider, MetadataRetrievalError, Provider, Show, ShowId};
use crate::cache::{CacheError, CacheStorage};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// A show as stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RankedShow {
    /// Position of the show in the live search that last returned it
    pub rank: usize,
    pub show: Show,
}

/// A caching wrapper for metadata providers
///
/// Shows are cached one entry per identity, episode lists one entry per
/// show. Entries older than the TTL are ignored (not deleted) and replaced
/// by the next successful fetch. A failed fetch leaves the cache untouched.
/// Cached search hits come back in the order the provider returned them.
pub struct CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// The underlying metadata provider
    provider: P,
    /// Cached shows, keyed by `<provider>-<id>`
    shows: CacheStorage<RankedShow>,
    /// Cached episode lists, keyed by `<provider>-<id>`
    episodes: CacheStorage<Vec<Episode>>,
    /// Age at which entries are considered stale
    ttl: Duration,
}

impl<P> CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    /// Creates a new cached metadata provider wrapping the given provider
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let tvmaze = TvMazeProvider::new(&config)?;
    /// let cached = CachedMetadataProvider::new(
    ///     tvmaze,
    ///     CacheStorage::open(&root, "shows")?,
    ///     CacheStorage::open(&root, "episodes")?,
    ///     DEFAULT_TTL,
    /// );
    /// ```
    pub(crate) fn new(
        provider: P,
        shows: CacheStorage<RankedShow>,
        episodes: CacheStorage<Vec<Episode>>,
        ttl: Duration,
    ) -> Self {
        Self {
            provider,
            shows,
            episodes,
            ttl,
        }
    }

    /// Wraps `provider` with the `shows` and `episodes` storages below `root`
    pub fn open(provider: P, root: &Path, ttl: Duration) -> Result<Self, CacheError> {
        Ok(Self::new(
            provider,
            CacheStorage::open(root, "shows")?,
            CacheStorage::open(root, "episodes")?,
            ttl,
        ))
    }

    /// Deletes the cached show and episode list for `show_id`
    pub fn invalidate(&self, show_id: u64) -> Result<(), CacheError> {
        let key = self.key(show_id);
        self.shows.remove(&key)?;
        self.episodes.remove(&key)?;
        debug!("Invalidated cache for {}", key);
        Ok(())
    }

    fn key(&self, show_id: u64) -> String {
        ShowId::new(self.provider.provider(), show_id).cache_key()
    }

    /// Fresh cached shows of this provider matching `query`
    fn cached_matches(&self, query: &str) -> Vec<Show> {
        let entries = match self.shows.load_all() {
            Ok(entries) => entries,
            Err(e) => {
                // We don't want cache failures to prevent metadata retrieval
                warn!("Could not read show cache: {}", e);
                return Vec::new();
            }
        };

        let now = Utc::now();
        let provider = self.provider.provider();
        let mut matches: Vec<RankedShow> = entries
            .into_iter()
            .filter(|entry| !entry.is_stale_at(now, self.ttl))
            .map(|entry| entry.payload)
            .filter(|ranked| {
                ranked.show.id.provider == provider && ranked.show.matches_query(query)
            })
            .collect();

        matches.sort_by_key(|ranked| (ranked.rank, ranked.show.id.id));
        matches.into_iter().map(|ranked| ranked.show).collect()
    }
}

impl<P> MetadataProvider for CachedMetadataProvider<P>
where
    P: MetadataProvider,
{
    fn provider(&self) -> Provider {
        self.provider.provider()
    }

    fn search_shows(&self, query: &str) -> Result<Vec<Show>, MetadataRetrievalError> {
        let cached = self.cached_matches(query);
        if !cached.is_empty() {
            debug!(
                "Serving {} cached {} show(s) for '{}'",
                cached.len(),
                self.provider(),
                query
            );
            return Ok(cached);
        }

        let shows = self.provider.search_shows(query)?;

        for (rank, show) in shows.iter().enumerate() {
            let ranked = RankedShow {
                rank,
                show: show.clone(),
            };
            if let Err(e) = self.shows.store(&show.id.cache_key(), &ranked) {
                warn!("Could not cache show {}: {}", show.id, e);
            }
        }

        Ok(shows)
    }

    fn fetch_episodes(&self, show_id: u64) -> Result<Vec<Episode>, MetadataRetrievalError> {
        let key = self.key(show_id);

        match self.episodes.load(&key) {
            Ok(Some(entry)) if !entry.is_stale_at(Utc::now(), self.ttl) => {
                debug!("Serving cached episodes for {}", key);
                return Ok(entry.payload);
            }
            Ok(Some(_)) => debug!("Cached episodes for {} are stale", key),
            Ok(None) => debug!("No cached episodes for {}", key),
            Err(e) => warn!("Could not read cached episodes for {}: {}", key, e),
        }

        let episodes = self.provider.fetch_episodes(show_id)?;

        // Replace the whole list at once
        if let Err(e) = self.episodes.store(&key, &episodes) {
            warn!("Could not cache episodes for {}: {}", key, e);
        }

        Ok(episodes)
    }
}
