//! Canonical output encoding.
//!
//! Every artifact produced by the trim and merge engines is encoded with the
//! same codec pair and container so chained operations never need a
//! compatibility re-encode.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Canonical video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Canonical audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Canonical container extension
pub const DEFAULT_CONTAINER: &str = "mp4";
/// Default encoding preset
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF (Constant Rate Factor)
pub const DEFAULT_CRF: u8 = 18;
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "128k";
/// Output audio sample rate
pub const DEFAULT_AUDIO_SAMPLE_RATE: u32 = 48_000;
/// Output audio channel count (stereo)
pub const DEFAULT_AUDIO_CHANNELS: u8 = 2;
/// Output pixel format
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv420p";

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "fast", "medium", "slow")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Audio sample rate in Hz
    #[serde(default = "default_audio_sample_rate")]
    pub audio_sample_rate: u32,

    /// Audio channel count
    #[serde(default = "default_audio_channels")]
    pub audio_channels: u8,

    /// Pixel format
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,

    /// Container extension (without dot)
    #[serde(default = "default_container")]
    pub container: String,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> String {
    DEFAULT_AUDIO_BITRATE.to_string()
}
fn default_audio_sample_rate() -> u32 {
    DEFAULT_AUDIO_SAMPLE_RATE
}
fn default_audio_channels() -> u8 {
    DEFAULT_AUDIO_CHANNELS
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}
fn default_container() -> String {
    DEFAULT_CONTAINER.to_string()
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: default_video_codec(),
            preset: default_preset(),
            crf: DEFAULT_CRF,
            audio_codec: default_audio_codec(),
            audio_bitrate: default_audio_bitrate(),
            audio_sample_rate: DEFAULT_AUDIO_SAMPLE_RATE,
            audio_channels: DEFAULT_AUDIO_CHANNELS,
            pixel_format: default_pixel_format(),
            container: default_container(),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    /// Create the canonical encoding configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical format with `ENCODING_CRF` and `ENCODING_PRESET` overrides.
    ///
    /// A CRF outside 0-51 or a blank preset is ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(crf) = get("ENCODING_CRF")
            .and_then(|s| s.trim().parse::<u8>().ok())
            .filter(|crf| *crf <= 51)
        {
            config = config.with_crf(crf);
        }
        if let Some(preset) = get("ENCODING_PRESET").filter(|s| !s.trim().is_empty()) {
            config = config.with_preset(preset.trim());
        }
        config
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Returns a new config with updated preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = preset.into();
        self
    }

    /// FFmpeg channel layout name for the configured channel count.
    pub fn channel_layout(&self) -> String {
        match self.audio_channels {
            1 => "mono".to_string(),
            2 => "stereo".to_string(),
            n => format!("{}c", n),
        }
    }

    /// FFmpeg muxer name for the configured container.
    pub fn muxer(&self) -> &str {
        match self.container.as_str() {
            "mkv" => "matroska",
            other => other,
        }
    }

    /// Convert to FFmpeg output arguments.
    ///
    /// Filters and stream mapping are the caller's concern; these arguments
    /// only pin the codecs, quality and container flags.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-b:a".to_string(),
            self.audio_bitrate.clone(),
            "-ar".to_string(),
            self.audio_sample_rate.to_string(),
            "-ac".to_string(),
            self.audio_channels.to_string(),
        ];

        if self.container == "mp4" || self.container == "mov" {
            args.extend_from_slice(&["-movflags".to_string(), "+faststart".to_string()]);
        }

        // Outputs are written under a temporary name, so the muxer cannot be
        // inferred from the extension.
        args.extend_from_slice(&["-f".to_string(), self.muxer().to_string()]);

        args.extend(self.extra_args.clone());

        args
    }
}
