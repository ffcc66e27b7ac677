/// TMDB metadata provider implementation.
use super::tmdb_types::{TmdbEpisode, TmdbSeason, TmdbSearchResponse, TmdbShow, TmdbShowDetails};
use super::{
    Episode, MetadataProvider, MetadataRetrievalError, Provider, Show, ShowId, build_client,
    get_json, non_empty, typed_with_raw, year_from_date,
};
use crate::config::Config;
use reqwest::blocking::RequestBuilder;
use serde_json::Value;
use tracing::debug;

/// Metadata provider for The Movie Database (TMDB) v3 API.
///
/// Requests are authenticated with a bearer token and, when configured, the
/// legacy `api_key` query parameter. Episode lists are assembled from one
/// request per season.
pub struct TmdbProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    token: Option<String>,
    api_key: Option<String>,
    language: String,
}

impl TmdbProvider {
    /// Creates a new TMDB provider instance.
    ///
    /// A missing credential is not an error here; every request will fail
    /// with [`MetadataRetrievalError::MissingCredential`] instead, so the
    /// other provider keeps working.
    pub fn new(config: &Config) -> Result<Self, MetadataRetrievalError> {
        Ok(Self {
            client: build_client(config.http_timeout)?,
            base_url: config.tmdb_url.trim_end_matches('/').to_string(),
            token: config.tmdb_token.clone(),
            api_key: config.tmdb_api_key.clone(),
            language: config.language.clone(),
        })
    }

    /// Builds an authenticated GET request for `path`.
    fn request(&self, path: &str) -> Result<RequestBuilder, MetadataRetrievalError> {
        if self.token.is_none() && self.api_key.is_none() {
            return Err(MetadataRetrievalError::MissingCredential(Provider::Tmdb));
        }

        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if let Some(api_key) = &self.api_key {
            request = request.query(&[("api_key", api_key)]);
        }
        Ok(request)
    }

    fn convert_show(tmdb_show: TmdbShow, raw: Value) -> Show {
        Show {
            id: ShowId::new(Provider::Tmdb, tmdb_show.id),
            display_name: tmdb_show.name.clone(),
            year: year_from_date(tmdb_show.first_air_date.as_deref()),
            name: tmdb_show.name,
            alternate_names: Vec::new(),
            raw,
        }
    }

    fn convert_episode(tmdb_episode: TmdbEpisode, raw: Value) -> Episode {
        Episode {
            season_number: tmdb_episode.season_number,
            episode_number: tmdb_episode.episode_number,
            name: tmdb_episode.name.unwrap_or_default(),
            air_date: non_empty(tmdb_episode.air_date),
            summary: tmdb_episode.overview.unwrap_or_default().trim().to_string(),
            raw,
        }
    }

    /// Season numbers to fetch, ascending and without duplicates.
    fn season_numbers(details: &TmdbShowDetails) -> Vec<u32> {
        let mut numbers: Vec<u32> = details
            .seasons
            .iter()
            .filter_map(|s| s.season_number)
            .collect();
        numbers.sort_unstable();
        numbers.dedup();
        numbers
    }
}

impl MetadataProvider for TmdbProvider {
    fn provider(&self) -> Provider {
        Provider::Tmdb
    }

    fn search_shows(&self, query: &str) -> Result<Vec<Show>, MetadataRetrievalError> {
        let response: TmdbSearchResponse =
            get_json(self.request("/search/tv")?.query(&[("query", query)]))?;

        response
            .results
            .into_iter()
            .map(|item| {
                let (tmdb_show, raw) = typed_with_raw::<TmdbShow>(item)?;
                Ok(Self::convert_show(tmdb_show, raw))
            })
            .collect()
    }

    fn fetch_episodes(&self, show_id: u64) -> Result<Vec<Episode>, MetadataRetrievalError> {
        let language = [("language", self.language.as_str())];

        let details: TmdbShowDetails =
            get_json(self.request(&format!("/tv/{}", show_id))?.query(&language))?;

        let mut episodes = Vec::new();
        for season_number in Self::season_numbers(&details) {
            debug!("Fetching TMDB show {} season {}", show_id, season_number);

            // One failing season aborts the whole list
            let season: TmdbSeason = get_json(
                self.request(&format!("/tv/{}/season/{}", show_id, season_number))?
                    .query(&language),
            )?;

            for item in season.episodes {
                let (tmdb_episode, raw) = typed_with_raw::<TmdbEpisode>(item)?;
                episodes.push(Self::convert_episode(tmdb_episode, raw));
            }
        }

        Ok(episodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStorage, DEFAULT_TTL};
    use crate::metadata_retrieval::CachedMetadataProvider;
    use crate::metadata_retrieval::test_support::stub_server;
    use serde_json::json;

    fn config_without_credentials() -> Config {
        Config {
            tmdb_token: None,
            tmdb_api_key: None,
            ..Config::default()
        }
    }

    fn stub_config(base_url: &str) -> Config {
        Config {
            tmdb_url: base_url.to_string(),
            tmdb_token: Some("token".to_string()),
            tmdb_api_key: None,
            language: "es-ES".to_string(),
            ..Config::default()
        }
    }

    fn season_body(season: u32, episodes: &[(u32, &str)]) -> String {
        let episodes: Vec<Value> = episodes
            .iter()
            .map(|(number, name)| {
                json!({
                    "season_number": season,
                    "episode_number": number,
                    "name": name,
                    "air_date": "1994-09-22",
                    "overview": ""
                })
            })
            .collect();
        json!({ "episodes": episodes }).to_string()
    }

    fn details_body() -> String {
        json!({ "seasons": [{ "season_number": 2 }, { "season_number": 1 }] }).to_string()
    }

    #[test]
    fn test_convert_show() {
        let payload = json!({
            "id": 1668,
            "name": "Friends",
            "original_name": "Friends",
            "first_air_date": "1994-09-22"
        });
        let (typed, raw) = typed_with_raw::<TmdbShow>(payload).unwrap();
        let show = TmdbProvider::convert_show(typed, raw);

        assert_eq!(show.id, ShowId::new(Provider::Tmdb, 1668));
        assert_eq!(show.display_name, "Friends");
        assert_eq!(show.year, Some(1994));
        assert!(show.alternate_names.is_empty());
    }

    #[test]
    fn test_convert_show_with_empty_air_date() {
        let payload = json!({ "id": 5, "name": "Upcoming", "first_air_date": "" });
        let (typed, raw) = typed_with_raw::<TmdbShow>(payload).unwrap();
        assert_eq!(TmdbProvider::convert_show(typed, raw).year, None);
    }

    #[test]
    fn test_convert_episode() {
        let payload = json!({
            "season_number": 1,
            "episode_number": 2,
            "name": "El de la ecografía al final",
            "air_date": "1994-09-29",
            "overview": " Ross descubre que su ex esposa está embarazada. "
        });
        let (typed, raw) = typed_with_raw::<TmdbEpisode>(payload).unwrap();
        let episode = TmdbProvider::convert_episode(typed, raw);

        assert_eq!(episode.season_number, 1);
        assert_eq!(episode.episode_number, 2);
        assert_eq!(episode.name, "El de la ecografía al final");
        assert_eq!(episode.air_date.as_deref(), Some("1994-09-29"));
        assert_eq!(episode.summary, "Ross descubre que su ex esposa está embarazada.");
    }

    #[test]
    fn test_season_numbers_sorted_and_deduplicated() {
        let details: TmdbShowDetails = serde_json::from_value(json!({
            "seasons": [
                { "season_number": 2 },
                { "season_number": 0 },
                { "season_number": 1 },
                { "season_number": null },
                { "season_number": 2 }
            ]
        }))
        .unwrap();

        assert_eq!(TmdbProvider::season_numbers(&details), vec![0, 1, 2]);
    }

    #[test]
    fn test_missing_credential_fails_without_network() {
        let provider = TmdbProvider::new(&config_without_credentials()).unwrap();

        assert!(matches!(
            provider.search_shows("Friends"),
            Err(MetadataRetrievalError::MissingCredential(Provider::Tmdb))
        ));
        assert!(matches!(
            provider.fetch_episodes(1668),
            Err(MetadataRetrievalError::MissingCredential(Provider::Tmdb))
        ));
    }

    #[test]
    fn test_fetch_episodes_requests_each_season_in_order() {
        let (base_url, server) = stub_server(vec![
            (200, details_body()),
            (200, season_body(1, &[(1, "Pilot"), (2, "Second")])),
            (200, season_body(2, &[(1, "Return")])),
        ]);
        let provider = TmdbProvider::new(&stub_config(&base_url)).unwrap();

        let episodes = provider.fetch_episodes(1668).unwrap();
        let requests = server.join().unwrap();

        let keys: Vec<(u32, u32)> = episodes
            .iter()
            .map(|e| (e.season_number, e.episode_number))
            .collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (2, 1)]);

        assert_eq!(requests.len(), 3);
        assert!(requests[0].starts_with("GET /tv/1668?language=es-ES "));
        assert!(requests[1].starts_with("GET /tv/1668/season/1?language=es-ES "));
        assert!(requests[2].starts_with("GET /tv/1668/season/2?language=es-ES "));
    }

    #[test]
    fn test_failing_season_aborts_and_caches_nothing() {
        let (base_url, server) = stub_server(vec![
            (200, details_body()),
            (200, season_body(1, &[(1, "Pilot")])),
            (500, "{}".to_string()),
        ]);
        let root = tempfile::tempdir().unwrap();
        let provider = CachedMetadataProvider::open(
            TmdbProvider::new(&stub_config(&base_url)).unwrap(),
            root.path(),
            DEFAULT_TTL,
        )
        .unwrap();

        let result = provider.fetch_episodes(1668);
        server.join().unwrap();

        assert!(matches!(
            result,
            Err(MetadataRetrievalError::HttpStatus { status: 500, .. })
        ));
        let episodes: CacheStorage<Vec<Episode>> =
            CacheStorage::open(root.path(), "episodes").unwrap();
        assert!(episodes.load("tmdb-1668").unwrap().is_none());
    }

    #[test]
    fn test_http_errors_do_not_reveal_api_key() {
        let (base_url, server) = stub_server(vec![(401, "{}".to_string())]);
        let config = Config {
            tmdb_token: None,
            tmdb_api_key: Some("SECRET123".to_string()),
            ..stub_config(&base_url)
        };
        let provider = TmdbProvider::new(&config).unwrap();

        let error = provider.search_shows("Friends").unwrap_err();
        let requests = server.join().unwrap();

        assert!(requests[0].contains("api_key=SECRET123"));
        assert!(matches!(
            error,
            MetadataRetrievalError::HttpStatus { status: 401, .. }
        ));
        assert!(!error.to_string().contains("SECRET123"));
        assert!(error.to_string().contains("/search/tv"));
    }
}
