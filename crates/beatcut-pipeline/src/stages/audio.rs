//! Audio analysis and normalization.

use beatcut_media::{FfmpegCommand, MediaEngine};
use beatcut_models::BeatGrid;
use tracing::info;

use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::events::Events;
use crate::stages::Stage;

/// Probe the audio track, derive the beat grid, and normalize the audio to
/// AAC so the mux stage can stream-copy it.
pub async fn run(
    engine: &dyn MediaEngine,
    ctx: &mut RunContext,
    events: &Events,
) -> PipelineResult<()> {
    events.primary("Analyzing audio track");

    let audio_path = ctx.settings.audio_path.clone();
    let duration = engine.probe_duration(&audio_path).await.map_err(|e| {
        if e.is_cancelled() {
            PipelineError::Cancelled
        } else {
            PipelineError::Probe {
                path: audio_path.clone(),
                source: e,
            }
        }
    })?;

    if duration <= 0.0 {
        return Err(PipelineError::Probe {
            path: audio_path.clone(),
            source: beatcut_media::MediaError::InvalidMedia(format!(
                "audio track has non-positive duration {duration}"
            )),
        });
    }

    let grid = BeatGrid::build(duration, ctx.settings.bpm, ctx.settings.beats_per_segment);
    info!(
        duration,
        period = grid.period(),
        slots = grid.slot_count(),
        "beat grid built"
    );

    ctx.audio_duration = duration;
    ctx.grid = Some(grid);

    let normalized = ctx.dirs.work.join("audio.m4a");
    let cmd = FfmpegCommand::new(&audio_path, &normalized)
        .no_video()
        .audio_codec(ctx.encoding.audio_codec.clone());

    engine
        .run_job(cmd, Box::new(|_| {}))
        .await
        .map_err(|e| PipelineError::from_media(Stage::Audio, e))?;

    ctx.audio_track = Some(normalized);
    Ok(())
}
