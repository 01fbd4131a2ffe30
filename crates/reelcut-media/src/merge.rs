//! Ordered concatenation of clips with differing geometry.
//!
//! Every input is letterboxed onto a shared canvas (the largest width and
//! height among the inputs) at a shared frame rate, its audio normalized to
//! one sample format, and the segments are joined by a single `concat` filter
//! so the output is encoded exactly once.

use std::path::Path;
use tracing::{debug, info};

use reelcut_models::{EncodingConfig, MergeRequest};

use crate::command::{FfmpegCommand, FfmpegInput};
use crate::engine::RunOptions;
use crate::error::ProcessingError;
use crate::filters::{
    filter_audio_segment, filter_concat, filter_letterbox, lavfi_silence, merge_canvas, Geometry,
};

/// Frame rate used when no input reports one.
const FALLBACK_FPS: f64 = 30.0;

#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    encoding: EncodingConfig,
}

impl MergeEngine {
    pub fn new(encoding: EncodingConfig) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> &EncodingConfig {
        &self.encoding
    }

    /// Canvas and frame rate the inputs are normalized to.
    pub fn output_format(request: &MergeRequest) -> (Geometry, f64) {
        let canvas = merge_canvas(request.sources.iter().map(|s| (s.width, s.height)));
        let fps = request
            .sources
            .iter()
            .map(|s| s.fps)
            .filter(|f| f.is_finite() && *f > 0.0)
            .fold(0.0, f64::max);
        (canvas, if fps > 0.0 { fps } else { FALLBACK_FPS })
    }

    /// Build the FFmpeg invocation for a merge.
    ///
    /// Sources without an audio stream get a silent lavfi input of the same
    /// duration, appended after the file inputs, so each segment of the
    /// concat graph has exactly one audio stream.
    pub fn build_command(
        &self,
        request: &MergeRequest,
        output: &Path,
    ) -> Result<FfmpegCommand, ProcessingError> {
        let count = request.sources.len();
        if count < MergeRequest::MIN_SOURCES {
            return Err(ProcessingError::InsufficientInputs { given: count });
        }

        let (canvas, fps) = Self::output_format(request);
        let sample_rate = self.encoding.audio_sample_rate;
        let layout = self.encoding.channel_layout();

        let mut cmd = FfmpegCommand::with_output(output);
        for source in &request.sources {
            cmd = cmd.input(&source.path);
        }

        let mut graph = Vec::with_capacity(count * 2 + 1);
        let mut next_silent = count;
        for (index, source) in request.sources.iter().enumerate() {
            graph.push(filter_letterbox(index, canvas, fps));

            let audio = if source.has_audio {
                format!("{}:a:0", index)
            } else {
                cmd = cmd.add_input(FfmpegInput::lavfi(lavfi_silence(sample_rate, &layout), source.duration));
                next_silent += 1;
                format!("{}:a", next_silent - 1)
            };
            graph.push(filter_audio_segment(&audio, index, source.duration, sample_rate, &layout));
        }
        graph.push(filter_concat(count));

        Ok(cmd
            .filter_complex(graph.join(";"))
            .map("[outv]")
            .map("[outa]")
            .output_args(["-map_metadata", "-1"])
            .encoding(&self.encoding))
    }

    /// Encode the concatenation of `request.sources` to `output`.
    ///
    /// Every source is opened before FFmpeg starts; the first one that cannot
    /// be opened aborts the merge and is reported by index.
    pub async fn merge(
        &self,
        request: &MergeRequest,
        output: &Path,
        options: &RunOptions,
    ) -> Result<(), ProcessingError> {
        let count = request.sources.len();
        if count < MergeRequest::MIN_SOURCES {
            return Err(ProcessingError::InsufficientInputs { given: count });
        }

        for (index, source) in request.sources.iter().enumerate() {
            // Handle is closed at the end of this scope
            match tokio::fs::File::open(&source.path).await {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(ProcessingError::SourceNotFound {
                        input_index: index,
                        path: source.path.clone(),
                    });
                }
                Err(e) => {
                    return Err(ProcessingError::decode_failed(
                        Some(index),
                        format!("cannot open {}: {}", source.path.display(), e),
                    ));
                }
            }
        }

        let cmd = self.build_command(request, output)?;
        info!(
            inputs = count,
            output = %output.display(),
            total_duration = request.total_duration(),
            "Merging clips"
        );
        debug!("Merge command: {:?}", cmd.build_args());

        let inputs: Vec<&Path> = request.sources.iter().map(|s| s.path.as_path()).collect();
        options
            .runner()
            .run_with_progress(&cmd, options.progress_sink())
            .await
            .map_err(|e| ProcessingError::from_media(e, &inputs, output))?;

        info!(output = %output.display(), "Merge encoded");
        Ok(())
    }
}
