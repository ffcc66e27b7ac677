//! Media inspection module
//!
//! Reads stream details (resolution, codecs, audio channels) from a video
//! file with ffprobe. Inspection never fails: any problem yields an empty
//! [`MediaInfo`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while running ffprobe; only logged, never returned
#[derive(Debug, Error)]
enum MediaInspectionError {
    #[error("Failed to spawn ffprobe: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ffprobe failed with exit code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("Failed to parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Stream details of a video file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaInfo {
    /// `<width>x<height>` of the first video stream
    pub resolution: Option<String>,
    /// Uppercased codec name of the first video stream, e.g. "H264"
    pub video_codec: Option<String>,
    /// Uppercased codec name of the first audio stream, e.g. "AAC"
    pub audio_codec: Option<String>,
    /// Channel count of the first audio stream
    pub audio_channels: Option<u32>,
}

impl MediaInfo {
    pub fn is_empty(&self) -> bool {
        self == &MediaInfo::default()
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    channels: Option<u32>,
}

/// Inspects a video file, returning empty details on any failure
pub fn inspect(path: &Path) -> MediaInfo {
    match run_ffprobe(path) {
        Ok(info) => {
            debug!("Media info for {}: {:?}", path.display(), info);
            info
        }
        Err(e) => {
            warn!("Could not inspect {}: {}", path.display(), e);
            MediaInfo::default()
        }
    }
}

fn run_ffprobe(path: &Path) -> Result<MediaInfo, MediaInspectionError> {
    let output = Command::new(ffmpeg_sidecar::ffprobe::ffprobe_path())
        .args(["-v", "error", "-show_streams", "-print_format", "json"])
        .arg(path)
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        return Err(MediaInspectionError::Failed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(parse_ffprobe_output(&output.stdout)?)
}

/// Extracts the first video and first audio stream from ffprobe's JSON
fn parse_ffprobe_output(json: &[u8]) -> Result<MediaInfo, serde_json::Error> {
    let output: FfprobeOutput = serde_json::from_slice(json)?;

    let first_of = |kind: &str| {
        output
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(kind))
    };
    let video = first_of("video");
    let audio = first_of("audio");

    Ok(MediaInfo {
        resolution: video.and_then(|v| match (v.width, v.height) {
            (Some(w), Some(h)) => Some(format!("{}x{}", w, h)),
            _ => None,
        }),
        video_codec: video
            .and_then(|v| v.codec_name.as_ref())
            .map(|c| c.to_uppercase()),
        audio_codec: audio
            .and_then(|a| a.codec_name.as_ref())
            .map(|c| c.to_uppercase()),
        audio_channels: audio.and_then(|a| a.channels),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ffprobe_output() {
        let json = br#"{
            "streams": [
                { "index": 0, "codec_name": "h264", "codec_type": "video", "width": 1920, "height": 1080 },
                { "index": 1, "codec_name": "aac", "codec_type": "audio", "channels": 6 },
                { "index": 2, "codec_name": "ac3", "codec_type": "audio", "channels": 2 },
                { "index": 3, "codec_name": "subrip", "codec_type": "subtitle" }
            ]
        }"#;

        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!(info.resolution.as_deref(), Some("1920x1080"));
        assert_eq!(info.video_codec.as_deref(), Some("H264"));
        assert_eq!(info.audio_codec.as_deref(), Some("AAC"));
        assert_eq!(info.audio_channels, Some(6));
        assert!(!info.is_empty());
    }

    #[test]
    fn test_parse_audio_only() {
        let json = br#"{ "streams": [ { "codec_name": "mp3", "codec_type": "audio" } ] }"#;

        let info = parse_ffprobe_output(json).unwrap();
        assert_eq!(info.resolution, None);
        assert_eq!(info.video_codec, None);
        assert_eq!(info.audio_codec.as_deref(), Some("MP3"));
        assert_eq!(info.audio_channels, None);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_ffprobe_output(b"{}").unwrap().is_empty());
        assert!(parse_ffprobe_output(b"").is_err());
    }

    #[test]
    fn test_inspect_missing_file_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let info = inspect(&dir.path().join("does-not-exist.mkv"));
        assert!(info.is_empty());
    }
}
