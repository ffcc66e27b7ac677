//! Runtime configuration
//!
//! Settings are read from environment variables. The binary loads a `.env`
//! file first, so credentials can live next to the executable.

use crate::cache::{CacheError, DEFAULT_TTL, default_cache_dir};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const TMDB_TOKEN: &str = "TMDB_TOKEN";
pub const TMDB_API_KEY: &str = "TMDB_API_KEY";
pub const TVMAZE_API_URL: &str = "TVMAZE_API_URL";
pub const TMDB_API_URL: &str = "TMDB_API_URL";
pub const LOCALE: &str = "RENAMIZER_LOCALE";
pub const LANGUAGE: &str = "RENAMIZER_LANGUAGE";
pub const HTTP_TIMEOUT_SECS: &str = "RENAMIZER_HTTP_TIMEOUT_SECS";
pub const CACHE_DIR: &str = "RENAMIZER_CACHE_DIR";

/// Errors that can occur while reading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Application settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the TVMaze API
    pub tvmaze_url: String,
    /// Base URL of the TMDB v3 API
    pub tmdb_url: String,
    /// TMDB read access token, sent as a bearer credential
    pub tmdb_token: Option<String>,
    /// TMDB v3 API key, sent as the `api_key` query parameter
    pub tmdb_api_key: Option<String>,
    /// Country code used to pick localized show names
    pub locale: String,
    /// Language requested from TMDB for season and episode data
    pub language: String,
    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,
    /// Cache location; the platform cache directory when unset
    pub cache_dir: Option<PathBuf>,
    /// Age at which cached metadata is fetched again
    pub cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tvmaze_url: "https://api.tvmaze.com".to_string(),
            tmdb_url: "https://api.themoviedb.org/3".to_string(),
            tmdb_token: None,
            tmdb_api_key: None,
            locale: "ES".to_string(),
            language: "es-ES".to_string(),
            http_timeout: Duration::from_secs(10),
            cache_dir: None,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let http_timeout = match get(HTTP_TIMEOUT_SECS) {
            Some(value) => Duration::from_secs(parse_seconds(HTTP_TIMEOUT_SECS, &value)?),
            None => defaults.http_timeout,
        };

        Ok(Self {
            tvmaze_url: get(TVMAZE_API_URL).unwrap_or(defaults.tvmaze_url),
            tmdb_url: get(TMDB_API_URL).unwrap_or(defaults.tmdb_url),
            tmdb_token: get(TMDB_TOKEN),
            tmdb_api_key: get(TMDB_API_KEY),
            locale: get(LOCALE).unwrap_or(defaults.locale),
            language: get(LANGUAGE).unwrap_or(defaults.language),
            http_timeout,
            cache_dir: get(CACHE_DIR).map(PathBuf::from),
            cache_ttl: defaults.cache_ttl,
        })
    }

    /// Resolves the cache root directory
    pub fn cache_root(&self) -> Result<PathBuf, CacheError> {
        match &self.cache_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_cache_dir(),
        }
    }
}

fn parse_seconds(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        Ok(secs) => Ok(secs),
        Err(e) => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}
