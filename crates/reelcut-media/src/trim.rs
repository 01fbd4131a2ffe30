//! Time-range extraction.

use std::path::Path;
use tracing::{debug, info};

use reelcut_models::{EncodingConfig, TrimRequest};

use crate::command::FfmpegCommand;
use crate::engine::RunOptions;
use crate::error::ProcessingError;
use crate::filters::{filter_trim, trim_geometry};

/// Cuts `[start, end)` out of one source and re-encodes it canonically.
#[derive(Debug, Clone, Default)]
pub struct TrimEngine {
    encoding: EncodingConfig,
}

impl TrimEngine {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    /// Build the FFmpeg invocation for a trim.
    ///
    /// The seek and duration are input options, so the video and audio
    /// streams are cut from the same demuxed timestamps.
    pub fn build_command(&self, request: &TrimRequest, output: &Path) -> FfmpegCommand {
        let source = &request.source;
        let geometry = trim_geometry(source.width, source.height);

        let cmd = FfmpegCommand::new(&source.path, output)
            .seek(request.range.start())
            .duration(request.range.duration())
            .video_filter(filter_trim(geometry))
            .map("0:v:0");

        let cmd = if source.has_audio {
            cmd.map("0:a:0")
        } else {
            cmd
        };

        cmd.output_args(["-sn", "-dn", "-map_metadata", "-1"])
            .encoding(&self.encoding)
    }

    /// Encode the trimmed clip to `output`.
    pub async fn trim(
        &self,
        request: &TrimRequest,
        output: &Path,
        options: &RunOptions,
    ) -> Result<(), ProcessingError> {
        let source = request.source.path.as_path();
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(ProcessingError::SourceNotFound {
                input_index: 0,
                path: source.to_path_buf(),
            });
        }

        info!(
            source = %source.display(),
            output = %output.display(),
            start = request.range.start(),
            end = request.range.end(),
            "Trimming clip"
        );

        let cmd = self.build_command(request, output);
        debug!("Trim command: {:?}", cmd.build_args());

        options
            .runner()
            .run_with_progress(&cmd, options.progress_sink())
            .await
            .map_err(|e| ProcessingError::from_media(e, &[source], output))?;

        info!(output = %output.display(), "Trim encoded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelcut_models::{SourceMedia, TimeRange};
    use std::path::PathBuf;

    fn request(width: u32, height: u32, has_audio: bool) -> TrimRequest {
        TrimRequest::new(
            SourceMedia {
                path: PathBuf::from("/in/a.mp4"),
                size: 1,
                duration: 20.0,
                width,
                height,
                fps: 30.0,
                has_audio,
            },
            TimeRange::new(2.5, 7.5).unwrap(),
        )
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
        let idx = args.iter().position(|a| a == flag).unwrap();
        &args[idx + 1]
    }

    #[test]
    fn test_trim_command_cuts_both_streams_identically() {
        let args = TrimEngine::default()
            .build_command(&request(1280, 720, true), Path::new("/out/t.mp4.partial"))
            .build_args();

        assert_eq!(value_after(&args, "-ss"), "2.500");
        assert_eq!(value_after(&args, "-t"), "5.000");
        // Input options apply to every stream of the input
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert!(args.iter().position(|a| a == "-ss").unwrap() < i);
        assert!(args.contains(&"0:a:0".to_string()));
        assert!(args.contains(&"libx264".to_string()));
        // Same channel count as merge outputs, whatever the source has
        assert_eq!(value_after(&args, "-ac"), "2");
        assert_eq!(value_after(&args, "-f"), "mp4");
    }

    #[test]
    fn test_trim_without_audio_maps_video_only() {
        let args = TrimEngine::default()
            .build_command(&request(640, 360, false), Path::new("out.mp4"))
            .build_args();
        assert!(!args.contains(&"0:a:0".to_string()));
        assert!(args.contains(&"0:v:0".to_string()));
    }

    #[test]
    fn test_trim_keeps_source_geometry() {
        let args = TrimEngine::default()
            .build_command(&request(853, 480, true), Path::new("out.mp4"))
            .build_args();
        let vf = value_after(&args, "-vf");
        assert!(vf.starts_with("scale=853:480"));
        assert!(vf.contains("pad=854:480"));
    }

    #[tokio::test]
    async fn test_missing_source_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(640, 360, true);
        req.source.path = dir.path().join("gone.mp4");

        let err = TrimEngine::default()
            .trim(&req, &dir.path().join("out.mp4"), &RunOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::SourceNotFound { input_index: 0, .. }
        ));
    }
}
