//! Rename session
//!
//! Collects the chosen show, the chosen episodes and the chosen files, then
//! moves each file to the library path of the episode at the same position.

use crate::file_operations::{
    FileOperationError, PlannedOperation, RenameEvent, RenameReport, execute_moves,
    plan_operations,
};
use crate::file_resolver::{FileResolverError, scan_for_videos};
use crate::media_info::{self, MediaInfo};
use crate::metadata_retrieval::{Episode, Show};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// A season/episode pair such as `S01E02` or `1x02`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpisodeKey {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeKey {
    pub fn of(episode: &Episode) -> Self {
        Self {
            season: episode.season_number,
            episode: episode.episode_number,
        }
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

impl FromStr for EpisodeKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let invalid = || format!("invalid episode '{}' (expected S01E02 or 1x02)", s);

        let (season, episode) = match lower.strip_prefix('s') {
            Some(rest) => rest.split_once('e').ok_or_else(invalid)?,
            None => lower.split_once('x').ok_or_else(invalid)?,
        };

        Ok(Self {
            season: season.parse().map_err(|_| invalid())?,
            episode: episode.parse().map_err(|_| invalid())?,
        })
    }
}

/// The selections of one rename run
///
/// Episodes and files are paired by position, so their order matters.
/// Adding something that is already selected is a no-op.
#[derive(Debug, Default)]
pub struct RenameSession {
    show: Option<Show>,
    episodes: Vec<Episode>,
    files: Vec<PathBuf>,
}

impl RenameSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooses the show whose name and year are used for the destinations
    pub fn select_show(&mut self, show: Show) {
        self.show = Some(show);
    }

    pub fn show(&self) -> Option<&Show> {
        self.show.as_ref()
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Appends an episode unless the same season/episode is already selected
    pub fn add_episode(&mut self, episode: Episode) -> bool {
        let key = EpisodeKey::of(&episode);
        if self.episodes.iter().any(|e| EpisodeKey::of(e) == key) {
            return false;
        }
        self.episodes.push(episode);
        true
    }

    /// Appends a file unless it is already selected
    pub fn add_file(&mut self, path: PathBuf) -> bool {
        if self.files.contains(&path) {
            return false;
        }
        self.files.push(path);
        true
    }

    /// Appends every video file below `dir`, returning how many were new
    pub fn add_directory(&mut self, dir: &Path) -> Result<usize, FileResolverError> {
        let added = scan_for_videos(dir)?
            .into_iter()
            .filter(|path| self.add_file(path.clone()))
            .count();
        debug!("Added {} file(s) from {}", added, dir.display());
        Ok(added)
    }

    /// Orders the selected episodes by season, then episode
    pub fn sort_episodes(&mut self) {
        self.episodes.sort_by_key(EpisodeKey::of);
    }

    /// Orders the selected files by path
    pub fn sort_files(&mut self) {
        self.files.sort();
    }

    /// Drops the selected episodes and files, keeping the show
    pub fn clear_lists(&mut self) {
        self.episodes.clear();
        self.files.clear();
    }

    /// Drops every selection including the show
    pub fn clear_all(&mut self) {
        self.clear_lists();
        self.show = None;
    }

    /// Computes the moves without touching any file
    pub fn plan(
        &self,
        output_root: Option<&Path>,
        include_title: bool,
    ) -> Result<Vec<PlannedOperation>, FileOperationError> {
        self.plan_with(output_root, include_title, media_info::inspect)
    }

    fn plan_with<F>(
        &self,
        output_root: Option<&Path>,
        include_title: bool,
        inspect: F,
    ) -> Result<Vec<PlannedOperation>, FileOperationError>
    where
        F: FnMut(&Path) -> MediaInfo,
    {
        if output_root.is_none_or(|root| root.as_os_str().is_empty()) {
            return Err(FileOperationError::MissingOutputDirectory);
        }
        let show = self.show.as_ref().ok_or(FileOperationError::NoShowSelected)?;

        plan_operations(
            show,
            &self.episodes,
            &self.files,
            output_root,
            include_title,
            inspect,
        )
    }

    /// Moves every selected file to its library path
    ///
    /// Validation errors leave the selections untouched. Once moving has
    /// started, failures are collected in the report and the lists are
    /// cleared regardless of the outcome.
    pub fn rename_all<F>(
        &mut self,
        output_root: Option<&Path>,
        include_title: bool,
        on_event: F,
    ) -> Result<RenameReport, FileOperationError>
    where
        F: FnMut(RenameEvent),
    {
        let plan = self.plan(output_root, include_title)?;
        Ok(self.execute(plan, on_event))
    }

    /// Moves a previously computed plan and clears the lists
    pub fn execute<F>(&mut self, plan: Vec<PlannedOperation>, on_event: F) -> RenameReport
    where
        F: FnMut(RenameEvent),
    {
        let report = execute_moves(plan, on_event);
        self.clear_lists();
        report
    }
}
