//! End-to-end pipeline tests against real FFmpeg.

mod common;

use std::collections::HashSet;
use std::path::PathBuf;

use common::{describe, synth_clip, truncated_copy};
use reelcut_media::{
    FfprobeProbe, MediaPipeline, MediaProbe, PipelineConfig, PipelineStage, ProbeError,
    ProcessingError, RunOptions, PipelineError, PARTIAL_SUFFIX,
};
use reelcut_models::{ArtifactCategory, TimeRange, TrimRequest};

fn pipeline(root: &std::path::Path) -> MediaPipeline {
    MediaPipeline::new(PipelineConfig::new(root.join("media")))
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_trim_duration_matches_range() {
    let dir = tempfile::tempdir().unwrap();
    let source = synth_clip(dir.path(), "src.mp4", 640, 360, 6.0, true).await;
    let media = describe(&source).await;
    let frame = media.frame_duration();

    let request = TrimRequest::new(media, TimeRange::new(1.0, 4.0).unwrap());
    let artifact = pipeline(dir.path())
        .trim(&request, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(artifact.category, ArtifactCategory::Trimmed);
    assert!(
        (artifact.duration - 3.0).abs() <= frame,
        "duration {}",
        artifact.duration
    );
    assert!(artifact.has_audio);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_full_range_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source = synth_clip(dir.path(), "src.mp4", 480, 270, 4.0, true).await;
    let media = describe(&source).await;

    let artifact = pipeline(dir.path())
        .trim_raw(&source, None, None, &RunOptions::default())
        .await
        .unwrap();

    assert!((artifact.duration - media.duration).abs() <= media.frame_duration());
    assert_eq!((artifact.width, artifact.height), (media.width, media.height));
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_probe_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let source = synth_clip(dir.path(), "src.mp4", 320, 240, 2.5, true).await;
    let before = std::fs::metadata(&source).unwrap().modified().unwrap();

    let probe = FfprobeProbe::new();
    let first = probe.probe(&source).await.unwrap();
    let second = probe.probe(&source).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::metadata(&source).unwrap().modified().unwrap(), before);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_merge_sums_durations_across_geometries() {
    let dir = tempfile::tempdir().unwrap();
    let a = synth_clip(dir.path(), "a.mp4", 640, 360, 5.0, true).await;
    // Different size and no audio track
    let b = synth_clip(dir.path(), "b.mp4", 320, 240, 3.0, false).await;
    // One frame of drift per concatenated segment
    let allowance = describe(&a).await.frame_duration() + describe(&b).await.frame_duration();

    let artifact = pipeline(dir.path())
        .merge_paths(&[a, b], &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(artifact.category, ArtifactCategory::Merged);
    assert!(
        (artifact.duration - 8.0).abs() <= allowance,
        "duration {}",
        artifact.duration
    );
    assert_eq!((artifact.width, artifact.height), (640, 360));
    assert!(artifact.has_audio);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_merge_of_trims() {
    let dir = tempfile::tempdir().unwrap();
    let source = synth_clip(dir.path(), "src.mp4", 640, 360, 6.0, true).await;
    let pipeline = pipeline(dir.path());
    let options = RunOptions::default();

    let first = pipeline.trim_raw(&source, Some("0"), Some("2"), &options).await.unwrap();
    let second = pipeline.trim_raw(&source, Some("3"), Some("6"), &options).await.unwrap();
    let merged = pipeline
        .merge_paths(&[first.path.clone(), second.path.clone()], &options)
        .await
        .unwrap();

    let allowance = first.fps.recip() + second.fps.recip();
    assert!((merged.duration - 5.0).abs() <= allowance, "duration {}", merged.duration);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_merge_single_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    let a = synth_clip(dir.path(), "a.mp4", 320, 240, 2.0, true).await;

    let err = pipeline(dir.path())
        .merge_paths(&[a], &RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Processing {
            source: ProcessingError::InsufficientInputs { given: 1 },
            ..
        }
    ));
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_concurrent_trims_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let source = synth_clip(dir.path(), "src.mp4", 320, 240, 5.0, true).await;
    let frame = describe(&source).await.frame_duration();
    let pipeline = pipeline(dir.path());

    let mut handles = Vec::new();
    for i in 0..4 {
        let pipeline = pipeline.clone();
        let source = source.clone();
        let end = format!("{}", 1 + i);
        handles.push(tokio::spawn(async move {
            pipeline
                .trim_raw(&source, Some("0"), Some(&end), &RunOptions::default())
                .await
        }));
    }

    let mut paths: HashSet<PathBuf> = HashSet::new();
    for (i, handle) in handles.into_iter().enumerate() {
        let artifact = handle.await.unwrap().unwrap();
        // Each output holds its own range, not a neighbour's
        assert!((artifact.duration - (1 + i) as f64).abs() <= frame);
        assert!(paths.insert(artifact.path));
    }
    assert_eq!(paths.len(), 4);
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_cancelled_trim_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let source = synth_clip(dir.path(), "src.mp4", 1280, 720, 20.0, true).await;
    let (tx, rx) = tokio::sync::watch::channel(false);

    let pipeline = pipeline(dir.path());
    let options = RunOptions::new().with_cancel(rx);
    let run = pipeline.trim_raw(&source, None, None, &options);
    let cancel = async {
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        tx.send(true).unwrap();
    };
    let (result, _) = tokio::join!(run, cancel);

    match result {
        Err(err) => assert_eq!(err.kind(), "cancelled"),
        // Encoding finished before the signal landed
        Ok(artifact) => assert!(artifact.path.exists()),
    }
    let trimmed = dir.path().join("media").join("trimmed");
    let leftovers: Vec<_> = std::fs::read_dir(&trimmed)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    assert!(leftovers
        .iter()
        .all(|p| !p.to_string_lossy().ends_with(PARTIAL_SUFFIX)));
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_garbage_bytes_are_unreadable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.mp4");
    std::fs::write(&path, b"these bytes are not a video container").unwrap();

    match FfprobeProbe::new().probe(&path).await {
        Err(ProbeError::Unreadable { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
#[ignore = "requires ffmpeg"]
async fn test_merge_blames_corrupt_second_input() {
    let dir = tempfile::tempdir().unwrap();
    let a = synth_clip(dir.path(), "a.mp4", 320, 240, 2.0, true).await;
    let b = synth_clip(dir.path(), "b.mp4", 320, 240, 2.0, true).await;
    // Cut before the index at the tail of the file
    let broken = truncated_copy(&b, dir.path(), "broken.mp4", 4096);

    let err = pipeline(dir.path())
        .merge_paths(&[a, broken], &RunOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.input_index(), Some(1));
    match &err {
        PipelineError::Probe { index: 1, .. } => assert_eq!(err.stage(), PipelineStage::Probing),
        PipelineError::Processing {
            source: ProcessingError::DecodeFailed { .. },
            ..
        } => assert_eq!(err.kind(), "decode_failed"),
        other => panic!("unexpected {other:?}"),
    }
    let merged: Vec<_> = std::fs::read_dir(dir.path().join("media").join("merged"))
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    assert!(merged.iter().all(|p| p.to_string_lossy().ends_with(PARTIAL_SUFFIX)));
}
