//! Per-run pipeline state.

use std::path::PathBuf;

use beatcut_models::{BeatGrid, EncodingConfig, JobSettings, SegmentRecord};

use crate::workspace::WorkDirs;

/// All state for one pipeline run.
///
/// Threaded explicitly through the stages, so a parked run can be resumed
/// from the stage that failed with everything it had already computed.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub settings: JobSettings,
    pub dirs: WorkDirs,
    pub encoding: EncodingConfig,

    /// Source clips found in the source directory, in natural name order.
    pub source_files: Vec<PathBuf>,

    /// Duration of the audio track, set by the audio stage.
    pub audio_duration: f64,
    /// Normalized audio file, set by the audio stage.
    pub audio_track: Option<PathBuf>,
    /// Beat grid, set by the audio stage.
    pub grid: Option<BeatGrid>,

    /// Running sum of produced segment durations.
    pub total_duration: f64,
    /// One record per grid slot, kept or dropped.
    pub segments: Vec<SegmentRecord>,

    /// Concatenated video, set by the assemble stage.
    pub joined_video: Option<PathBuf>,
    /// Video with audio muxed in, set by the mux stage.
    pub muxed_file: Option<PathBuf>,
    /// Delivery file, set by the encode stage.
    pub final_output: Option<PathBuf>,
}

impl RunContext {
    pub fn new(settings: JobSettings, dirs: WorkDirs, source_files: Vec<PathBuf>) -> Self {
        Self {
            settings,
            dirs,
            encoding: EncodingConfig::default(),
            source_files,
            audio_duration: 0.0,
            audio_track: None,
            grid: None,
            total_duration: 0.0,
            segments: Vec::new(),
            joined_video: None,
            muxed_file: None,
            final_output: None,
        }
    }
}
