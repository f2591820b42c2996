//! Pipeline error types.

use std::path::PathBuf;

use beatcut_media::MediaError;
use beatcut_models::SettingsError;
use thiserror::Error;

use crate::stages::Stage;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that abort a pipeline run.
///
/// Per-slot segment failures never surface here; they are dropped and their
/// duration carried into the next slot. Only failures that leave the run
/// unable to continue become a `PipelineError`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("failed to probe {}", .path.display())]
    Probe {
        path: PathBuf,
        #[source]
        source: MediaError,
    },

    #[error("{stage} stage failed")]
    Stage {
        stage: Stage,
        #[source]
        source: MediaError,
    },

    #[error("no source clips found in {}", .0.display())]
    NoSourceClips(PathBuf),

    #[error("no segments were produced")]
    NoSegments,

    #[error("no stage awaiting retry")]
    NoPendingRetry,

    #[error("pipeline state missing: {0}")]
    State(&'static str),

    #[error("run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Map a media error from `stage`, routing cancellation to its own
    /// variant so it is never mistaken for a stage failure.
    pub fn from_media(stage: Stage, source: MediaError) -> Self {
        if source.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Stage { stage, source }
        }
    }

    /// Whether the failed stage can be retried from the parked context.
    ///
    /// Probe errors here are always the primary audio probe (per-slot clip
    /// probes are dropped, not surfaced), and that stage is retry-eligible.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Stage { stage, .. } => stage.is_retryable(),
            Self::Probe { .. } => true,
            _ => false,
        }
    }
}
