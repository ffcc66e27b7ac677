//! Destination naming and file moves
//!
//! Destinations follow the Plex TV layout:
//!
//! ```text
//! <output>/Series de TV/<Show> (<Year>)/Temporada <SS>/<Show> - s<SS>e<EE> - <Title>.<ext>
//! ```

use crate::media_info::MediaInfo;
use crate::metadata_retrieval::{Episode, Show};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Top-level folder below the output directory
pub const LIBRARY_FOLDER: &str = "Series de TV";

/// Prefix of the per-season folder
pub const SEASON_FOLDER_PREFIX: &str = "Temporada";

/// Extension used when the source file has none
pub const DEFAULT_EXTENSION: &str = ".mp4";

/// Characters that are removed from folder and file names
pub const FORBIDDEN_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Errors that can occur during file operations
///
/// Every variant is raised before any file is touched.
#[derive(Debug, Error)]
pub enum FileOperationError {
    #[error("No output directory selected")]
    MissingOutputDirectory,

    #[error("No show selected")]
    NoShowSelected,

    #[error("Selected {episodes} episode(s) but {files} file(s); the counts must match")]
    SelectionMismatch { episodes: usize, files: usize },
}

/// The parts of an episode that make up its file name
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeName<'a> {
    pub show_name: &'a str,
    pub year: Option<u16>,
    pub season: u32,
    pub episode: u32,
    pub title: Option<&'a str>,
}

impl<'a> EpisodeName<'a> {
    /// Names `episode` of `show`, using the show's display name
    pub fn new(show: &'a Show, episode: &'a Episode) -> Self {
        Self {
            show_name: &show.display_name,
            year: show.year,
            season: episode.season_number,
            episode: episode.episode_number,
            title: Some(episode.name.as_str()),
        }
    }
}

/// Represents a planned move of one source file
#[derive(Debug, Clone)]
pub struct PlannedOperation {
    /// Source file path
    pub source: PathBuf,
    /// Destination file path
    pub destination: PathBuf,
    /// Episode the file was paired with
    pub episode: Episode,
    /// Stream details of the source; not used for naming
    pub media_info: MediaInfo,
}

/// Progress of a batch move
#[derive(Debug, Clone)]
pub enum RenameEvent {
    /// A file was moved to its destination
    Moved {
        index: usize,
        total: usize,
        source: PathBuf,
        destination: PathBuf,
    },

    /// A file could not be moved; the batch continues
    Failed {
        index: usize,
        total: usize,
        source: PathBuf,
        error: String,
    },
}

/// A move that did not happen
#[derive(Debug)]
pub struct FailedOperation {
    pub operation: PlannedOperation,
    pub error: io::Error,
}

/// Outcome of a batch move
#[derive(Debug, Default)]
pub struct RenameReport {
    pub moved: Vec<PlannedOperation>,
    pub failed: Vec<FailedOperation>,
}

impl RenameReport {
    /// True when every planned move succeeded
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Removes every character that is forbidden in Windows file names
///
/// `< > : " / \ | ? *` are dropped; nothing is substituted for them.
pub fn sanitize_filename(name: &str) -> String {
    name.chars().filter(|c| !FORBIDDEN_CHARS.contains(c)).collect()
}

/// `"<Show> (<Year>)"`, or just the show name when the year is unknown
pub fn show_folder_name(show_name: &str, year: Option<u16>) -> String {
    let folder = match year {
        Some(year) => format!("{} ({})", show_name, year),
        None => show_name.to_string(),
    };
    sanitize_filename(&folder)
}

/// `"Temporada <SS>"`
pub fn season_folder_name(season: u32) -> String {
    format!("{} {:02}", SEASON_FOLDER_PREFIX, season)
}

/// `"<Show> - s<SS>e<EE>[ - <Title>]"`, sanitized
pub fn episode_file_stem(name: &EpisodeName<'_>, include_title: bool) -> String {
    let mut stem = format!(
        "{} - s{:02}e{:02}",
        name.show_name, name.season, name.episode
    );

    if let Some(title) = name.title.filter(|t| include_title && !t.is_empty()) {
        stem.push_str(" - ");
        stem.push_str(title);
    }

    sanitize_filename(&stem)
}

/// Extension of `source` including the dot, [`DEFAULT_EXTENSION`] if none
pub fn file_extension(source: &Path) -> String {
    match source.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!(".{}", ext),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Builds the library path for one episode file
///
/// This is a pure function; creating the directories is left to the caller.
///
/// # Examples
///
/// ```
/// use renamizer::{EpisodeName, build_destination};
/// use std::path::Path;
///
/// let name = EpisodeName {
///     show_name: "Friends",
///     year: Some(1994),
///     season: 1,
///     episode: 1,
///     title: Some("The Pilot"),
/// };
/// let destination = build_destination(Path::new("/media"), &name, Path::new("pilot.mkv"), true);
/// assert_eq!(
///     destination,
///     Path::new("/media/Series de TV/Friends (1994)/Temporada 01/Friends - s01e01 - The Pilot.mkv")
/// );
/// ```
pub fn build_destination(
    output_root: &Path,
    name: &EpisodeName<'_>,
    source: &Path,
    include_title: bool,
) -> PathBuf {
    let file_name = format!(
        "{}{}",
        episode_file_stem(name, include_title),
        file_extension(source)
    );

    output_root
        .join(LIBRARY_FOLDER)
        .join(show_folder_name(name.show_name, name.year))
        .join(season_folder_name(name.season))
        .join(file_name)
}

/// Pairs episodes with files by position and computes every destination
///
/// Validation happens up front: an empty output directory or lists of
/// different length fail before anything is inspected or moved.
pub fn plan_operations<F>(
    show: &Show,
    episodes: &[Episode],
    files: &[PathBuf],
    output_root: Option<&Path>,
    include_title: bool,
    mut inspect: F,
) -> Result<Vec<PlannedOperation>, FileOperationError>
where
    F: FnMut(&Path) -> MediaInfo,
{
    let output_root = output_root
        .filter(|root| !root.as_os_str().is_empty())
        .ok_or(FileOperationError::MissingOutputDirectory)?;

    if episodes.len() != files.len() {
        return Err(FileOperationError::SelectionMismatch {
            episodes: episodes.len(),
            files: files.len(),
        });
    }

    let operations = episodes
        .iter()
        .zip(files)
        .map(|(episode, source)| PlannedOperation {
            source: source.clone(),
            destination: build_destination(
                output_root,
                &EpisodeName::new(show, episode),
                source,
                include_title,
            ),
            episode: episode.clone(),
            media_info: inspect(source),
        })
        .collect();

    Ok(operations)
}

/// Moves every planned file, continuing past failures
pub fn execute_moves<F>(operations: Vec<PlannedOperation>, mut on_event: F) -> RenameReport
where
    F: FnMut(RenameEvent),
{
    let total = operations.len();
    let mut report = RenameReport::default();

    for (index, operation) in operations.into_iter().enumerate() {
        match move_file(&operation.source, &operation.destination) {
            Ok(()) => {
                info!(
                    "Moved {} -> {}",
                    operation.source.display(),
                    operation.destination.display()
                );
                on_event(RenameEvent::Moved {
                    index,
                    total,
                    source: operation.source.clone(),
                    destination: operation.destination.clone(),
                });
                report.moved.push(operation);
            }
            Err(error) => {
                warn!("Could not move {}: {}", operation.source.display(), error);
                on_event(RenameEvent::Failed {
                    index,
                    total,
                    source: operation.source.clone(),
                    error: error.to_string(),
                });
                report.failed.push(FailedOperation { operation, error });
            }
        }
    }

    report
}

/// Moves one file, creating the destination folders first
///
/// Existing destinations are never overwritten. Moves across file systems
/// fall back to copy and delete.
fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if source == destination {
        return Ok(());
    }

    if !source.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a file", source.display()),
        ));
    }

    if destination.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", destination.display()),
        ));
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
        Err(e) => Err(e),
    }
}
