//! The media engine seam between the pipeline and FFmpeg.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe;
use crate::progress::FfmpegProgress;

/// Callback type for progress updates.
pub type ProgressFn = Box<dyn Fn(FfmpegProgress) + Send>;

/// Abstracts FFmpeg/FFprobe so pipeline stages can be tested without media
/// files or binaries on PATH.
#[cfg_attr(feature = "mocks", mockall::automock)]
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Duration of a media file in seconds.
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64>;

    /// Run an FFmpeg job to completion.
    async fn run_job(&self, cmd: FfmpegCommand, on_progress: ProgressFn) -> MediaResult<()>;
}

/// Production engine shelling out to ffmpeg/ffprobe.
pub struct FfmpegEngine {
    cancel_rx: watch::Receiver<bool>,
}

impl FfmpegEngine {
    /// Create an engine whose jobs abort when `cancel_rx` flips to `true`.
    pub fn new(cancel_rx: watch::Receiver<bool>) -> Self {
        Self { cancel_rx }
    }
}

#[async_trait]
impl MediaEngine for FfmpegEngine {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        probe::probe_duration(path).await
    }

    async fn run_job(&self, cmd: FfmpegCommand, on_progress: ProgressFn) -> MediaResult<()> {
        let runner = FfmpegRunner::new().with_cancel(self.cancel_rx.clone());
        runner
            .run_with_progress(&cmd, move |p| on_progress(p))
            .await
    }
}
