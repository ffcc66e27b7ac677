//! Renamizer - Look up TV series metadata and file episodes into a Plex library
//!
//! This library searches TVMaze and TMDB for shows, caches what it learns on
//! disk for a week, and moves video files to names Plex recognizes:
//!
//! ```text
//! <output>/Series de TV/<Show> (<Year>)/Temporada <SS>/<Show> - s<SS>e<EE> - <Title>.<ext>
//! ```
//!
//! The usual flow is [`Catalog::search`], [`Catalog::episodes`], then a
//! [`RenameSession`] pairing the chosen episodes with files by position.

mod cache;
mod catalog;
mod config;
mod file_operations;
mod file_resolver;
mod media_info;
mod metadata_retrieval;
mod renamer;

// Re-export error types
pub use cache::CacheError;
pub use config::ConfigError;
pub use file_operations::FileOperationError;
pub use file_resolver::FileResolverError;
pub use metadata_retrieval::MetadataRetrievalError;

pub use cache::{CacheEntry, CacheStorage, DEFAULT_TTL, default_cache_dir, is_stale};
pub use catalog::{Catalog, EpisodeOrder, ProviderFailure, SearchOutcome, Source};
pub use config::Config;
pub use file_operations::{
    DEFAULT_EXTENSION, EpisodeName, FailedOperation, LIBRARY_FOLDER, PlannedOperation,
    RenameEvent, RenameReport, build_destination, episode_file_stem, execute_moves,
    plan_operations, sanitize_filename, season_folder_name, show_folder_name,
};
pub use file_resolver::{VIDEO_EXTENSIONS, is_video_file, scan_for_videos};
pub use media_info::{MediaInfo, inspect as inspect_media};
pub use metadata_retrieval::{
    AlternateName, CachedMetadataProvider, Episode, MetadataProvider, Provider, Show, ShowId,
    TmdbProvider, TvMazeProvider, localized_name,
};
pub use renamer::{EpisodeKey, RenameSession};

use std::io;
use thiserror::Error;

/// Top-level error type for Renamizer operations
#[derive(Debug, Error)]
pub enum RenamizerError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error during cache operations
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Error during metadata retrieval
    #[error("Metadata retrieval error: {0}")]
    MetadataRetrieval(#[from] MetadataRetrievalError),

    /// Error while planning file moves
    #[error("File operation error: {0}")]
    FileOperation(#[from] FileOperationError),

    /// Error during file resolution
    #[error("File resolution error: {0}")]
    FileResolver(#[from] FileResolverError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
