/// TVMaze API response types for deserialization.
///
/// These structures mirror the JSON response format from the TVMaze API.
use serde::Deserialize;

/// One hit of the `/search/shows` endpoint. The show itself is kept as raw
/// JSON so the full payload can be archived.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeSearchHit {
    pub show: serde_json::Value,
}

/// A show from `/search/shows` or `/shows/{id}`.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeShow {
    pub id: u64,
    /// The name of the TV show
    pub name: String,
    /// Premiere date, "YYYY-MM-DD"
    pub premiered: Option<String>,
    /// Alternate names, present when a previous lookup merged them in
    pub akas: Option<Vec<TvMazeAka>>,
    /// Embedded resources when requested with ?embed=
    #[serde(rename = "_embedded")]
    pub embedded: Option<TvMazeEmbedded>,
}

impl TvMazeShow {
    /// Alternate names from either the top level or the embedded block
    pub fn alternate_names(&self) -> Option<&[TvMazeAka]> {
        self.akas
            .as_deref()
            .or_else(|| self.embedded.as_ref().and_then(|e| e.akas.as_deref()))
    }
}

/// Embedded resources in a TVMaze show response.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeEmbedded {
    pub akas: Option<Vec<TvMazeAka>>,
}

/// An alternate name ("also known as") of a show.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct TvMazeAka {
    pub name: String,
    /// Null for names without a country (e.g. working titles)
    pub country: Option<TvMazeCountry>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct TvMazeCountry {
    pub code: String,
}

/// A single episode from the TVMaze API.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeEpisode {
    /// Season number
    pub season: u32,
    /// Episode number within the season (null for specials)
    pub number: Option<u32>,
    /// Episode title (may be null for episodes without a title)
    pub name: Option<String>,
    /// Air date, "YYYY-MM-DD" or empty
    pub airdate: Option<String>,
    /// Episode summary in HTML format (may be null)
    pub summary: Option<String>,
}
