/// TVMaze metadata provider implementation.
use super::tvmaze_types::{TvMazeEpisode, TvMazeSearchHit, TvMazeShow};
use super::{
    AlternateName, Episode, MetadataProvider, MetadataRetrievalError, Provider, Show, ShowId,
    build_client, get_json, localized_name, non_empty, typed_with_raw, year_from_date,
};
use crate::config::Config;
use serde_json::Value;
use tracing::{debug, warn};

/// Metadata provider for the TVMaze API.
///
/// This provider fetches TV series information from https://api.tvmaze.com.
/// Search hits do not carry alternate names, so each hit is completed with a
/// `/shows/{id}?embed=akas` lookup before normalization.
pub struct TvMazeProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    locale: String,
}

impl TvMazeProvider {
    /// Creates a new TVMaze provider instance.
    pub fn new(config: &Config) -> Result<Self, MetadataRetrievalError> {
        Ok(Self {
            client: build_client(config.http_timeout)?,
            base_url: config.tvmaze_url.trim_end_matches('/').to_string(),
            locale: config.locale.clone(),
        })
    }

    /// Fetches the alternate names of a show, merging them into `raw`.
    ///
    /// A failed lookup is not fatal; the show keeps its canonical name.
    fn attach_alternate_names(&self, show_id: u64, raw: &mut Value) {
        let url = format!("{}/shows/{}", self.base_url, show_id);
        let detail: Result<Value, _> =
            get_json(self.client.get(&url).query(&[("embed", "akas")]));

        match detail {
            Ok(detail) => {
                let akas = detail
                    .get("akas")
                    .or_else(|| detail.pointer("/_embedded/akas"))
                    .cloned();
                if let (Some(akas), Some(object)) = (akas, raw.as_object_mut()) {
                    object.insert("akas".to_string(), akas);
                }
            }
            Err(e) => warn!("Could not fetch alternate names for TVMaze show {}: {}", show_id, e),
        }
    }

    /// Converts TVMaze show data to our canonical Show record.
    fn convert_show(tvmaze_show: TvMazeShow, raw: Value, locale: &str) -> Show {
        let alternate_names: Vec<AlternateName> = tvmaze_show
            .alternate_names()
            .unwrap_or_default()
            .iter()
            .map(|aka| AlternateName {
                name: aka.name.clone(),
                country_code: aka.country.as_ref().map(|c| c.code.clone()),
            })
            .collect();

        Show {
            id: ShowId::new(Provider::TvMaze, tvmaze_show.id),
            display_name: localized_name(&tvmaze_show.name, &alternate_names, locale),
            year: year_from_date(tvmaze_show.premiered.as_deref()),
            name: tvmaze_show.name,
            alternate_names,
            raw,
        }
    }

    /// Converts a TVMaze episode to our internal Episode structure.
    ///
    /// Specials without an episode number cannot be placed in the library
    /// layout and are skipped.
    fn convert_episode(tvmaze_episode: TvMazeEpisode, raw: Value) -> Option<Episode> {
        let Some(episode_number) = tvmaze_episode.number else {
            debug!(
                "Skipping unnumbered TVMaze special in season {}",
                tvmaze_episode.season
            );
            return None;
        };

        Some(Episode {
            season_number: tvmaze_episode.season,
            episode_number,
            name: tvmaze_episode.name.unwrap_or_default(),
            air_date: non_empty(tvmaze_episode.airdate),
            summary: tvmaze_episode
                .summary
                .map(|s| nanohtml2text::html2text(&s).trim().to_string())
                .unwrap_or_default(),
            raw,
        })
    }
}

impl MetadataProvider for TvMazeProvider {
    fn provider(&self) -> Provider {
        Provider::TvMaze
    }

    fn search_shows(&self, query: &str) -> Result<Vec<Show>, MetadataRetrievalError> {
        let url = format!("{}/search/shows", self.base_url);
        let hits: Vec<TvMazeSearchHit> = get_json(self.client.get(&url).query(&[("q", query)]))?;

        let mut shows = Vec::with_capacity(hits.len());
        for hit in hits {
            let mut raw = hit.show;
            let (tvmaze_show, _) = typed_with_raw::<TvMazeShow>(raw.clone())?;

            if tvmaze_show.alternate_names().is_none() {
                self.attach_alternate_names(tvmaze_show.id, &mut raw);
            }

            let (tvmaze_show, raw) = typed_with_raw::<TvMazeShow>(raw)?;
            shows.push(Self::convert_show(tvmaze_show, raw, &self.locale));
        }

        Ok(shows)
    }

    fn fetch_episodes(&self, show_id: u64) -> Result<Vec<Episode>, MetadataRetrievalError> {
        let url = format!("{}/shows/{}/episodes", self.base_url, show_id);
        let items: Vec<Value> = get_json(self.client.get(&url))?;

        let mut episodes = Vec::with_capacity(items.len());
        for item in items {
            let (tvmaze_episode, raw) = typed_with_raw::<TvMazeEpisode>(item)?;
            episodes.extend(Self::convert_episode(tvmaze_episode, raw));
        }

        Ok(episodes)
    }
}
