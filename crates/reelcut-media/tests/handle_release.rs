//! Handle release on failed encodes.
//!
//! Kept in its own test binary so no other test opens descriptors while the
//! counts are taken.

mod common;

use common::synth_clip;
use reelcut_media::{FfprobeProbe, MediaPipeline, MediaProbe, PipelineConfig, RunOptions};
use reelcut_models::EncodingConfig;

fn open_fds() -> usize {
    std::fs::read_dir("/proc/self/fd").map(|rd| rd.count()).unwrap_or(0)
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_failed_encode_releases_handles() {
    let dir = tempfile::tempdir().unwrap();
    let source = synth_clip(dir.path(), "src.mp4", 320, 240, 3.0, true).await;

    // Warm up process spawning so runtime-owned descriptors already exist
    FfprobeProbe::new().probe(&source).await.unwrap();

    let encoding = EncodingConfig {
        codec: "libnothing".to_string(),
        ..EncodingConfig::default()
    };
    let pipeline = MediaPipeline::new(PipelineConfig::new(dir.path().join("media")).with_encoding(encoding));

    let before = open_fds();
    for _ in 0..3 {
        let err = pipeline
            .trim_raw(&source, Some("0"), Some("2"), &RunOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "encode_failed");
        assert_eq!(err.status_code(), 500);
    }
    let after = open_fds();

    assert!(after <= before, "descriptors leaked: {} -> {}", before, after);
    assert!(source.exists());
}
