//! File resolver module
//!
//! This module scans directories for video files. A file counts as a video
//! when its extension is one of the common container formats or, failing
//! that, when its content is recognized as video by MIME sniffing.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions accepted without looking at the file content
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi"];

/// Errors that can occur during file resolution
#[derive(Debug, Error)]
pub enum FileResolverError {
    /// Path is not a directory
    #[error("Path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Failed to read directory
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed { path: PathBuf, source: io::Error },

    /// Failed to read directory entry
    #[error("Failed to read directory entry: {0}")]
    ReadEntryFailed(#[from] io::Error),
}

/// Scans a directory recursively for video files
///
/// # Returns
///
/// All discovered video files sorted by path, or an error if the directory
/// cannot be read.
pub fn scan_for_videos(dir_path: &Path) -> Result<Vec<PathBuf>, FileResolverError> {
    let mut video_files = Vec::new();
    scan_directory_recursive(dir_path, &mut video_files)?;
    video_files.sort();
    Ok(video_files)
}

/// Recursively scans a directory and collects video files
fn scan_directory_recursive(
    dir_path: &Path,
    video_files: &mut Vec<PathBuf>,
) -> Result<(), FileResolverError> {
    if !dir_path.is_dir() {
        return Err(FileResolverError::NotADirectory(dir_path.to_path_buf()));
    }

    for entry in fs::read_dir(dir_path).map_err(|e| FileResolverError::ReadDirectoryFailed {
        path: dir_path.to_path_buf(),
        source: e,
    })? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            scan_directory_recursive(&path, video_files)?;
        } else if path.is_file() && is_video_file(&path) {
            video_files.push(path);
        }
    }

    Ok(())
}

/// Returns true if the file is a recognized video format
pub fn is_video_file(file_path: &Path) -> bool {
    let known_extension = file_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            VIDEO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        });

    known_extension || has_video_content(file_path)
}

/// Sniffs the first 8KB of a file for a video signature
fn has_video_content(file_path: &Path) -> bool {
    const BUFFER_SIZE: usize = 8192;

    let mut file = match File::open(file_path) {
        Ok(f) => f,
        Err(_) => return false,
    };

    let mut buffer = vec![0u8; BUFFER_SIZE];
    let bytes_read = match file.read(&mut buffer) {
        Ok(n) => n,
        Err(_) => return false,
    };

    buffer.truncate(bytes_read);

    infer::is_video(&buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_nonexistent_directory() {
        let result = scan_for_videos(Path::new("/nonexistent/path/that/does/not/exist"));
        assert!(matches!(result, Err(FileResolverError::NotADirectory(_))));
    }

    #[test]
    fn test_scan_file_instead_of_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test_file.txt");
        File::create(&file).unwrap();

        assert!(scan_for_videos(&file).is_err());
    }

    #[test]
    fn test_scan_finds_videos_recursively_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Season 1");
        fs::create_dir(&nested).unwrap();

        fs::write(dir.path().join("b.mkv"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"plain text").unwrap();
        fs::write(nested.join("a.MP4"), b"").unwrap();
        fs::write(dir.path().join("c.avi"), b"").unwrap();

        let found = scan_for_videos(dir.path()).unwrap();
        assert_eq!(
            found,
            vec![
                nested.join("a.MP4"),
                dir.path().join("b.mkv"),
                dir.path().join("c.avi"),
            ]
        );
    }

    #[test]
    fn test_content_sniffing_without_extension() {
        let dir = tempfile::tempdir().unwrap();

        // FLV header
        let flv = dir.path().join("episode");
        fs::write(&flv, [0x46, 0x4C, 0x56, 0x01, 0x05, 0x00, 0x00, 0x00, 0x09]).unwrap();
        let text = dir.path().join("readme");
        fs::write(&text, b"hello").unwrap();

        assert!(is_video_file(&flv));
        assert!(!is_video_file(&text));
    }
}
