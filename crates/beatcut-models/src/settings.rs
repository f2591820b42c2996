//! Job settings: validation, persistence, and field-wise merge.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors raised while loading, validating, or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid setting `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SettingsError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Immutable-per-run job settings.
///
/// Persisted as a JSON file between runs. `final_output` is not an input: it
/// records the delivery file of the most recent successful run so that
/// `open`/`save` keep working across invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    /// Directory scanned (non-recursively) for source clips.
    pub source_dir: PathBuf,

    /// Root under which the work directories are created.
    pub temp_dir: PathBuf,

    /// Audio track driving the beat grid.
    pub audio_path: PathBuf,

    /// Beats per minute of the audio track.
    pub bpm: u32,

    /// Number of beats each segment spans.
    pub beats_per_segment: u32,

    /// Audio/video timing offset in seconds. Applied negated to the audio
    /// input at mux time.
    #[serde(default)]
    pub audio_offset_secs: f64,

    /// Optional RNG seed for reproducible clip/offset selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Delivery file produced by the last successful run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<PathBuf>,
}

impl JobSettings {
    /// Validate the settings before a run starts. No filesystem access.
    pub fn validate(&self) -> SettingsResult<()> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(SettingsError::invalid("source_dir", "must not be empty"));
        }
        if self.temp_dir.as_os_str().is_empty() {
            return Err(SettingsError::invalid("temp_dir", "must not be empty"));
        }
        if self.audio_path.as_os_str().is_empty() {
            return Err(SettingsError::invalid("audio_path", "must not be empty"));
        }
        if self.bpm == 0 {
            return Err(SettingsError::invalid("bpm", "must be a positive integer"));
        }
        if self.beats_per_segment == 0 {
            return Err(SettingsError::invalid(
                "beats_per_segment",
                "must be a positive integer",
            ));
        }
        if !self.audio_offset_secs.is_finite() {
            return Err(SettingsError::invalid(
                "audio_offset_secs",
                "must be a finite number",
            ));
        }
        Ok(())
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Save settings to a JSON file, creating parent directories if needed.
    pub fn save(&self, path: impl AsRef<Path>) -> SettingsResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Overlay non-empty patch fields onto these settings.
    ///
    /// Mirrors the stored-settings update of the original tool: values the
    /// user supplies replace the stored ones, everything else is kept.
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(v) = patch.source_dir {
            self.source_dir = v;
        }
        if let Some(v) = patch.temp_dir {
            self.temp_dir = v;
        }
        if let Some(v) = patch.audio_path {
            self.audio_path = v;
        }
        if let Some(v) = patch.bpm {
            self.bpm = v;
        }
        if let Some(v) = patch.beats_per_segment {
            self.beats_per_segment = v;
        }
        if let Some(v) = patch.audio_offset_secs {
            self.audio_offset_secs = v;
        }
        if let Some(v) = patch.seed {
            self.seed = Some(v);
        }
    }
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::new(),
            temp_dir: PathBuf::new(),
            audio_path: PathBuf::new(),
            bpm: 0,
            beats_per_segment: 0,
            audio_offset_secs: 0.0,
            seed: None,
            final_output: None,
        }
    }
}

/// Partial settings collected from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub source_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub audio_path: Option<PathBuf>,
    pub bpm: Option<u32>,
    pub beats_per_segment: Option<u32>,
    pub audio_offset_secs: Option<f64>,
    pub seed: Option<u64>,
}
