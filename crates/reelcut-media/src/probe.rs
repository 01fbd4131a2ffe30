//! FFprobe media information.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use reelcut_models::SourceMedia;

use crate::error::{MediaError, ProbeError};

/// Extracts intrinsic properties of a media file without decoding it.
///
/// Implementations must not modify the file, and probing the same file twice
/// must yield identical metadata.
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Result<SourceMedia, ProbeError>;
}

/// [`MediaProbe`] backed by the `ffprobe` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeProbe;

impl FfprobeProbe {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    async fn probe(&self, path: &Path) -> Result<SourceMedia, ProbeError> {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProbeError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(MediaError::Io(e).into()),
        };
        if !metadata.is_file() {
            return Err(ProbeError::unreadable(path, "not a regular file"));
        }

        // Check FFprobe exists
        which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

        // The child is reaped by `output()`; `kill_on_drop` covers the caller
        // dropping this future mid-probe.
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(MediaError::Io)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("ffprobe could not open the file")
                .trim()
                .to_string();
            return Err(ProbeError::unreadable(path, detail));
        }

        let media = parse_probe_output(path, metadata.len(), &output.stdout)?;
        debug!(
            path = %path.display(),
            duration = media.duration,
            width = media.width,
            height = media.height,
            has_audio = media.has_audio,
            "Probed media"
        );
        Ok(media)
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Turn ffprobe JSON into a [`SourceMedia`].
///
/// A file without a video stream is not usable media (`Unreadable`); a video
/// stream whose duration or dimensions cannot be read is `Corrupt`.
fn parse_probe_output(path: &Path, size: u64, stdout: &[u8]) -> Result<SourceMedia, ProbeError> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)
        .map_err(|e| ProbeError::corrupt(path, format!("invalid ffprobe output: {}", e)))?;

    let video = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ProbeError::unreadable(path, "no video stream found"))?;
    let has_audio = probe
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    // Container duration first, then the video stream's own
    let duration = probe
        .format
        .as_ref()
        .and_then(|f| parse_seconds(f.duration.as_deref()))
        .or_else(|| parse_seconds(video.duration.as_deref()))
        .ok_or_else(|| ProbeError::corrupt(path, "duration is missing or not positive"))?;

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(ProbeError::corrupt(path, "video dimensions are missing")),
    };

    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(30.0);

    Ok(SourceMedia {
        path: path.to_path_buf(),
        size,
        duration,
        width,
        height,
        fps,
        has_audio,
    })
}

fn parse_seconds(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|f: &f64| *f > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"codec_type": "video", "width": 1280, "height": 720,
             "avg_frame_rate": "30000/1001", "r_frame_rate": "30000/1001"},
            {"codec_type": "audio"}
        ],
        "format": {"duration": "5.005000"}
    }"#;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_probe_output() {
        let media = parse_probe_output(Path::new("a.mp4"), 1234, SAMPLE.as_bytes()).unwrap();
        assert_eq!(media.size, 1234);
        assert_eq!((media.width, media.height), (1280, 720));
        assert!((media.duration - 5.005).abs() < 1e-9);
        assert!(media.has_audio);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse_probe_output(Path::new("a.mp4"), 10, SAMPLE.as_bytes()).unwrap();
        let b = parse_probe_output(Path::new("a.mp4"), 10, SAMPLE.as_bytes()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = r#"{"streams": [{"codec_type": "video", "width": 640, "height": 360,
                       "r_frame_rate": "25/1", "duration": "3.0"}], "format": {}}"#;
        let media = parse_probe_output(Path::new("a.mkv"), 1, json.as_bytes()).unwrap();
        assert!((media.duration - 3.0).abs() < 1e-9);
        assert!((media.fps - 25.0).abs() < 1e-9);
        assert!(!media.has_audio);
    }

    #[test]
    fn test_audio_only_is_unreadable() {
        let json = r#"{"streams": [{"codec_type": "audio"}], "format": {"duration": "3.0"}}"#;
        assert!(matches!(
            parse_probe_output(Path::new("a.m4a"), 1, json.as_bytes()),
            Err(ProbeError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_missing_metadata_is_corrupt() {
        let no_duration = r#"{"streams": [{"codec_type": "video", "width": 640, "height": 360}],
                              "format": {"duration": "N/A"}}"#;
        assert!(matches!(
            parse_probe_output(Path::new("a.mp4"), 1, no_duration.as_bytes()),
            Err(ProbeError::Corrupt { .. })
        ));

        let no_dims = r#"{"streams": [{"codec_type": "video"}], "format": {"duration": "2.0"}}"#;
        assert!(matches!(
            parse_probe_output(Path::new("a.mp4"), 1, no_dims.as_bytes()),
            Err(ProbeError::Corrupt { .. })
        ));

        assert!(matches!(
            parse_probe_output(Path::new("a.mp4"), 1, b"{not json"),
            Err(ProbeError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = FfprobeProbe::new().probe(&dir.path().join("missing.mp4")).await;
        assert!(matches!(result, Err(ProbeError::NotFound { .. })));
    }
}
