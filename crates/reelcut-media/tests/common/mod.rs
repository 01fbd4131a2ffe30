//! Synthetic clip generation for FFmpeg integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use reelcut_media::{FfprobeProbe, MediaProbe};
use reelcut_models::SourceMedia;

/// Describe a clip with the real ffprobe.
pub async fn describe(path: &Path) -> SourceMedia {
    FfprobeProbe::new().probe(path).await.unwrap()
}

/// Copy `source` to `dir/name` keeping only the first `keep` bytes.
pub fn truncated_copy(source: &Path, dir: &Path, name: &str, keep: usize) -> PathBuf {
    let bytes = std::fs::read(source).unwrap();
    let output = dir.join(name);
    std::fs::write(&output, &bytes[..keep.min(bytes.len())]).unwrap();
    output
}

/// Render a `testsrc` clip (with a `sine` tone when `with_audio`) to `dir/name`.
pub async fn synth_clip(
    dir: &Path,
    name: &str,
    width: u32,
    height: u32,
    duration: f64,
    with_audio: bool,
) -> PathBuf {
    let output = dir.join(name);
    let mut cmd = Command::new("ffmpeg");
    cmd.args(["-y", "-v", "error", "-f", "lavfi", "-i"])
        .arg(format!(
            "testsrc=size={}x{}:rate=30:duration={}",
            width, height, duration
        ));
    if with_audio {
        cmd.args(["-f", "lavfi", "-i"])
            .arg(format!("sine=frequency=440:sample_rate=48000:duration={}", duration))
            .args(["-c:a", "aac"]);
    }
    let status = cmd
        .args(["-c:v", "libx264", "-pix_fmt", "yuv420p", "-shortest"])
        .arg(&output)
        .stdin(Stdio::null())
        .status()
        .await
        .expect("failed to spawn ffmpeg");
    assert!(status.success(), "ffmpeg could not synthesize {}", name);
    output
}
