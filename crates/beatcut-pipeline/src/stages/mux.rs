//! Audio muxing onto the joined video.

use beatcut_media::{FfmpegCommand, MediaEngine};

use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::events::Events;
use crate::stages::Stage;

/// Stream-copy the normalized audio onto the joined video.
///
/// The configured offset is negated on the audio input: a positive offset
/// means the audio should start that much earlier relative to the video.
pub async fn run(
    engine: &dyn MediaEngine,
    ctx: &mut RunContext,
    events: &Events,
) -> PipelineResult<()> {
    events.primary("Muxing audio track");

    let joined = ctx
        .joined_video
        .clone()
        .ok_or(PipelineError::State("joined video"))?;
    let audio = ctx
        .audio_track
        .clone()
        .ok_or(PipelineError::State("normalized audio"))?;

    let muxed = ctx.dirs.work.join("muxed.mp4");
    let cmd = FfmpegCommand::new(&joined, &muxed)
        .input(&audio)
        .timestamp_offset(-ctx.settings.audio_offset_secs)
        .video_codec("copy")
        .audio_codec("copy")
        .output_arg("-shortest");

    engine
        .run_job(cmd, Box::new(|_| {}))
        .await
        .map_err(|e| PipelineError::from_media(Stage::Mux, e))?;

    ctx.muxed_file = Some(muxed);
    Ok(())
}
