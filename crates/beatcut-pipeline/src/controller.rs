//! Pipeline controller: sequencing, cancellation, and retry.

use std::path::PathBuf;
use std::sync::Arc;

use beatcut_media::{FfmpegEngine, MediaEngine};
use beatcut_models::JobSettings;
use tokio::sync::watch;
use tracing::{error, info};

use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::events::{Events, PipelineEvent};
use crate::stages::{self, Stage};
use crate::workspace::{self, WorkDirs};

/// A failed run parked at the stage that failed, with everything it had
/// computed so far.
struct PendingRetry {
    stage: Stage,
    ctx: RunContext,
}

/// Drives one run at a time through the stage sequence.
///
/// Runs are strictly sequential; a second `run` call resets cancellation and
/// any parked retry state from the previous one.
pub struct PipelineController {
    engine: Arc<dyn MediaEngine>,
    events: Events,
    cancel_tx: watch::Sender<bool>,
    pending: Option<PendingRetry>,
    last_output: Option<PathBuf>,
}

impl PipelineController {
    /// Controller over an arbitrary media engine.
    pub fn new(engine: Arc<dyn MediaEngine>, events: Events) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            engine,
            events,
            cancel_tx,
            pending: None,
            last_output: None,
        }
    }

    /// Controller over the real FFmpeg engine, wired to this controller's
    /// cancellation flag.
    pub fn with_ffmpeg(events: Events) -> Self {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        Self {
            engine: Arc::new(FfmpegEngine::new(cancel_rx)),
            events,
            cancel_tx,
            pending: None,
            last_output: None,
        }
    }

    /// Clonable handle that cancels the running job when sent `true`.
    pub fn cancel_handle(&self) -> watch::Sender<bool> {
        self.cancel_tx.clone()
    }

    /// Signal cancellation of the current run.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    /// Delivery file of the most recent successful run.
    pub fn last_output(&self) -> Option<&PathBuf> {
        self.last_output.as_ref()
    }

    /// Whether a failed run is parked and can be resumed.
    pub fn can_retry(&self) -> bool {
        self.pending.is_some()
    }

    /// Run the full pipeline for `settings`.
    pub async fn run(&mut self, settings: JobSettings) -> PipelineResult<()> {
        settings.validate()?;
        self.cancel_tx.send_replace(false);
        self.pending = None;

        let dirs = WorkDirs::prepare(&settings.temp_dir).await?;
        let source_files = workspace::list_source_clips(&settings.source_dir).await?;
        if source_files.is_empty() {
            return Err(PipelineError::NoSourceClips(settings.source_dir));
        }
        info!(clips = source_files.len(), "starting run");

        let ctx = RunContext::new(settings, dirs, source_files);
        self.advance(Stage::Audio, ctx).await
    }

    /// Resume a parked run from the stage that failed.
    pub async fn retry(&mut self) -> PipelineResult<()> {
        let PendingRetry { stage, ctx } =
            self.pending.take().ok_or(PipelineError::NoPendingRetry)?;
        self.cancel_tx.send_replace(false);
        info!(%stage, "retrying from failed stage");
        self.advance(stage, ctx).await
    }

    async fn advance(&mut self, from: Stage, mut ctx: RunContext) -> PipelineResult<()> {
        let start = Stage::ORDER
            .iter()
            .position(|s| *s == from)
            .unwrap_or(0);

        for &stage in &Stage::ORDER[start..] {
            let engine = self.engine.as_ref();
            let result = match stage {
                Stage::Audio => stages::audio::run(engine, &mut ctx, &self.events).await,
                Stage::Segments => stages::segments::run(engine, &mut ctx, &self.events).await,
                Stage::Assemble => stages::assemble::run(engine, &mut ctx, &self.events).await,
                Stage::Mux => stages::mux::run(engine, &mut ctx, &self.events).await,
                Stage::Encode => stages::encode::run(engine, &mut ctx, &self.events).await,
            };

            match result {
                Ok(()) => {}
                Err(PipelineError::Cancelled) => {
                    info!(%stage, "run cancelled");
                    self.events.emit(PipelineEvent::Cancelled);
                    return Err(PipelineError::Cancelled);
                }
                Err(err) if err.is_retryable() => {
                    error!(%stage, error = %err, "stage failed, parking run for retry");
                    self.pending = Some(PendingRetry { stage, ctx });
                    self.events.emit(PipelineEvent::RetryAvailable { stage });
                    return Err(err);
                }
                Err(err) => {
                    error!(%stage, error = %err, "stage failed");
                    return Err(err);
                }
            }
        }

        let output = ctx
            .final_output
            .clone()
            .ok_or(PipelineError::State("final output"))?;
        self.last_output = Some(output.clone());
        self.events.emit(PipelineEvent::Completed { output });
        Ok(())
    }
}
