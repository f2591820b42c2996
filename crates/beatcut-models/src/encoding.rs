//! Encoding parameters for segment cuts and the delivery encode.

use serde::{Deserialize, Serialize};

/// Default bitrate for segment cuts, in bits per second.
pub const DEFAULT_SEGMENT_BITRATE: u64 = 5_000_000;
/// Default delivery video codec.
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default delivery encode preset.
pub const DEFAULT_PRESET: &str = "ultrafast";
/// Normalized audio codec.
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Delivery frame size.
pub const DELIVERY_WIDTH: u32 = 1280;
pub const DELIVERY_HEIGHT: u32 = 720;

/// Encoding configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Video bitrate for segment cuts.
    #[serde(default = "default_segment_bitrate")]
    pub segment_bitrate: u64,

    /// Delivery video codec.
    #[serde(default = "default_video_codec")]
    pub video_codec: String,

    /// Delivery encode preset.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Codec the audio track is normalized to.
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Delivery width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Delivery height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_segment_bitrate() -> u64 {
    DEFAULT_SEGMENT_BITRATE
}
fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_width() -> u32 {
    DELIVERY_WIDTH
}
fn default_height() -> u32 {
    DELIVERY_HEIGHT
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            segment_bitrate: DEFAULT_SEGMENT_BITRATE,
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            width: DELIVERY_WIDTH,
            height: DELIVERY_HEIGHT,
        }
    }
}

impl EncodingConfig {
    /// Output arguments for a segment cut.
    ///
    /// Rate-distortion options tuned for short MPEG program-stream segments
    /// that concatenate cleanly without re-encoding.
    pub fn segment_output_args(&self) -> Vec<String> {
        vec![
            "-b:v".to_string(),
            self.segment_bitrate.to_string(),
            "-mbd".to_string(),
            "rd".to_string(),
            "-trellis".to_string(),
            "2".to_string(),
            "-cmp".to_string(),
            "2".to_string(),
            "-subcmp".to_string(),
            "2".to_string(),
            "-g".to_string(),
            "100".to_string(),
            "-f".to_string(),
            "mpeg".to_string(),
        ]
    }

    /// Video filter scaling to fit the delivery frame, then padding to its
    /// exact dimensions.
    pub fn delivery_filter(&self) -> String {
        format!(
            "scale=w={w}:h={h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
            w = self.width,
            h = self.height
        )
    }
}
