//! Cache storage module
//!
//! This module provides persistent caching functionality using the system's
//! standard cache directory. Every entry is stored as a JSON file together
//! with the instant it was last written, so callers can decide whether an
//! entry is still fresh.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// How long cached metadata is trusted before it is fetched again (7 days)
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to determine cache directory location
    #[error("Failed to determine cache directory location")]
    CacheDirectoryNotFound,

    /// Failed to create or access cache directory
    #[error("Failed to create cache directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read cached data
    #[error("Failed to read cache file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write cached data
    #[error("Failed to write cache file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to remove cached data
    #[error("Failed to remove cache file {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize cached data
    #[error("Failed to deserialize cache file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize data for caching
    #[error("Failed to serialize data: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A cached value together with the instant it was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// When the payload was last fetched from its source
    pub last_updated: DateTime<Utc>,
    /// The cached data
    pub payload: T,
}

impl<T> CacheEntry<T> {
    /// Wraps a payload, stamping it with the current time
    pub fn now(payload: T) -> Self {
        Self {
            last_updated: Utc::now(),
            payload,
        }
    }

    /// Whether this entry has outlived the given TTL at instant `now`
    pub fn is_stale_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        is_stale(self.last_updated, now, ttl)
    }
}

/// Borrowed twin of [`CacheEntry`] so storing does not require cloning
#[derive(Serialize)]
struct CacheEntryRef<'a, T> {
    last_updated: DateTime<Utc>,
    payload: &'a T,
}

/// Returns true once `now - last_updated` reaches `ttl`.
///
/// The boundary is inclusive: an entry exactly `ttl` old is stale. Entries
/// stamped in the future (clock skew) count as fresh.
pub fn is_stale(last_updated: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    match now.signed_duration_since(last_updated).to_std() {
        Ok(age) => age >= ttl,
        Err(_) => false,
    }
}

/// Returns the platform cache directory for this application
///
/// - Linux: ~/.cache/renamizer/
/// - macOS: ~/Library/Caches/com.fralopala2.renamizer/
/// - Windows: %LOCALAPPDATA%\fralopala2\renamizer\cache\
pub fn default_cache_dir() -> Result<PathBuf, CacheError> {
    let proj_dirs = directories::ProjectDirs::from("com", "fralopala2", "renamizer")
        .ok_or(CacheError::CacheDirectoryNotFound)?;
    Ok(proj_dirs.cache_dir().to_path_buf())
}

/// A generic cache storage for serializable data
///
/// Data is stored as one JSON file per identifier below `<root>/<name>/`.
/// Writes go to a temporary sibling file which is then renamed into place,
/// so a reader never observes a half-written entry.
#[derive(Debug)]
pub struct CacheStorage<T> {
    /// The directory where cached data is stored
    cache_dir: PathBuf,
    /// Phantom data for the generic type
    _phantom: PhantomData<T>,
}

impl<T> CacheStorage<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    /// Opens or creates a cache storage named `name` below `root`
    ///
    /// The name will be sanitized (lowercased, non-alphanumeric characters
    /// replaced with underscores).
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let cache: CacheStorage<Show> = CacheStorage::open(&default_cache_dir()?, "shows")?;
    /// ```
    pub fn open(root: &Path, name: &str) -> Result<Self, CacheError> {
        let cache_dir = root.join(sanitize_name(name));

        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::DirectoryCreationFailed {
            path: cache_dir.clone(),
            source: e,
        })?;

        Ok(Self {
            cache_dir,
            _phantom: PhantomData,
        })
    }

    /// Loads the cached entry for the given identifier
    ///
    /// Returns `None` if nothing is stored under this identifier. Returns an
    /// error if the file exists but cannot be read or deserialized.
    pub fn load(&self, identifier: &str) -> Result<Option<CacheEntry<T>>, CacheError> {
        let file_path = self.entry_path(identifier);

        if !file_path.exists() {
            return Ok(None);
        }

        read_entry(&file_path).map(Some)
    }

    /// Loads every entry in this storage
    ///
    /// Files that cannot be read or parsed are skipped with a warning; one
    /// corrupt entry must not hide the rest of the cache.
    pub fn load_all(&self) -> Result<Vec<CacheEntry<T>>, CacheError> {
        let dir = fs::read_dir(&self.cache_dir).map_err(|e| CacheError::ReadFailed {
            path: self.cache_dir.clone(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for dir_entry in dir.flatten() {
            let path = dir_entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_entry(&path) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping unreadable cache entry: {}", e),
            }
        }

        Ok(entries)
    }

    /// Stores data under the given identifier, stamped with the current time
    pub fn store(&self, identifier: &str, data: &T) -> Result<(), CacheError> {
        self.write(identifier, Utc::now(), data)
    }

    /// Stores a complete entry, keeping its timestamp
    pub fn store_entry(&self, identifier: &str, entry: &CacheEntry<T>) -> Result<(), CacheError> {
        self.write(identifier, entry.last_updated, &entry.payload)
    }

    /// Removes the entry for the given identifier
    ///
    /// Returns whether an entry existed.
    pub fn remove(&self, identifier: &str) -> Result<bool, CacheError> {
        let file_path = self.entry_path(identifier);

        match fs::remove_file(&file_path) {
            Ok(()) => {
                debug!("Removed cache entry {}", file_path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CacheError::RemoveFailed {
                path: file_path,
                source: e,
            }),
        }
    }

    /// Returns the path to the cache directory
    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    fn entry_path(&self, identifier: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", sanitize_name(identifier)))
    }

    fn write(
        &self,
        identifier: &str,
        last_updated: DateTime<Utc>,
        payload: &T,
    ) -> Result<(), CacheError> {
        let file_path = self.entry_path(identifier);
        let temp_path = file_path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(&CacheEntryRef {
            last_updated,
            payload,
        })?;

        fs::write(&temp_path, content).map_err(|e| CacheError::WriteFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        // Rename into place so readers see either the old or the new entry
        fs::rename(&temp_path, &file_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            CacheError::WriteFailed {
                path: file_path.clone(),
                source: e,
            }
        })?;

        debug!("Stored cache entry {}", file_path.display());
        Ok(())
    }
}

fn read_entry<T>(path: &Path) -> Result<CacheEntry<T>, CacheError>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path).map_err(|e| CacheError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| CacheError::DeserializationFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Sanitizes a name for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Simple"), "simple");
        assert_eq!(sanitize_name("With Spaces"), "with_spaces");
        assert_eq!(sanitize_name("tvmaze-431"), "tvmaze-431");
        assert_eq!(sanitize_name("Special!@#$%"), "special_____");
    }

    #[test]
    fn test_ttl_boundaries() {
        let now = Utc::now();

        assert!(!is_stale(now, now, DEFAULT_TTL));
        assert!(!is_stale(now - TimeDelta::days(6), now, DEFAULT_TTL));
        assert!(is_stale(now - TimeDelta::days(7), now, DEFAULT_TTL));
        assert!(is_stale(now - TimeDelta::days(8), now, DEFAULT_TTL));
        assert!(!is_stale(
            now - TimeDelta::days(7) + TimeDelta::seconds(1),
            now,
            DEFAULT_TTL
        ));
    }

    #[test]
    fn test_future_timestamp_is_fresh() {
        let now = Utc::now();
        assert!(!is_stale(now + TimeDelta::hours(1), now, DEFAULT_TTL));
    }

    #[test]
    fn test_store_and_load() {
        let root = tempfile::tempdir().unwrap();
        let cache: CacheStorage<Vec<String>> = CacheStorage::open(root.path(), "items").unwrap();

        assert!(cache.load("tvmaze-1").unwrap().is_none());

        let data = vec!["a".to_string(), "b".to_string()];
        cache.store("tvmaze-1", &data).unwrap();

        let entry = cache.load("tvmaze-1").unwrap().unwrap();
        assert_eq!(entry.payload, data);
        assert!(!entry.is_stale_at(Utc::now(), DEFAULT_TTL));
    }

    #[test]
    fn test_store_entry_keeps_timestamp() {
        let root = tempfile::tempdir().unwrap();
        let cache: CacheStorage<u32> = CacheStorage::open(root.path(), "numbers").unwrap();

        let old = CacheEntry {
            last_updated: Utc::now() - TimeDelta::days(10),
            payload: 42,
        };
        cache.store_entry("old", &old).unwrap();

        let loaded = cache.load("old").unwrap().unwrap();
        assert_eq!(loaded, old);
        assert!(loaded.is_stale_at(Utc::now(), DEFAULT_TTL));
    }

    #[test]
    fn test_store_overwrites() {
        let root = tempfile::tempdir().unwrap();
        let cache: CacheStorage<u32> = CacheStorage::open(root.path(), "numbers").unwrap();

        cache.store("key", &1).unwrap();
        cache.store("key", &2).unwrap();

        assert_eq!(cache.load("key").unwrap().unwrap().payload, 2);
        assert_eq!(cache.load_all().unwrap().len(), 1);
    }

    #[test]
    fn test_load_all_skips_corrupt_files() {
        let root = tempfile::tempdir().unwrap();
        let cache: CacheStorage<u32> = CacheStorage::open(root.path(), "numbers").unwrap();

        cache.store("one", &1).unwrap();
        cache.store("two", &2).unwrap();
        fs::write(cache.cache_dir().join("broken.json"), "{not json").unwrap();
        fs::write(cache.cache_dir().join("notes.txt"), "ignored").unwrap();

        let mut payloads: Vec<u32> = cache
            .load_all()
            .unwrap()
            .into_iter()
            .map(|e| e.payload)
            .collect();
        payloads.sort_unstable();
        assert_eq!(payloads, vec![1, 2]);
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let root = tempfile::tempdir().unwrap();
        let cache: CacheStorage<u32> = CacheStorage::open(root.path(), "numbers").unwrap();

        fs::write(cache.cache_dir().join("broken.json"), "{not json").unwrap();
        assert!(matches!(
            cache.load("broken"),
            Err(CacheError::DeserializationFailed { .. })
        ));
    }

    #[test]
    fn test_remove() {
        let root = tempfile::tempdir().unwrap();
        let cache: CacheStorage<u32> = CacheStorage::open(root.path(), "numbers").unwrap();

        cache.store("key", &7).unwrap();
        assert!(cache.remove("key").unwrap());
        assert!(!cache.remove("key").unwrap());
        assert!(cache.load("key").unwrap().is_none());
    }
}
