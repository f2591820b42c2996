//! Delivery encode.

use beatcut_media::{FfmpegCommand, FfmpegProgress, MediaEngine};
use tracing::info;
use uuid::Uuid;

use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::eta::EtaEstimator;
use crate::events::Events;
use crate::stages::Stage;

/// Length of the random stem on delivery file names.
const OUTPUT_NAME_LEN: usize = 6;

/// Encode the muxed file to the delivery format.
pub async fn run(
    engine: &dyn MediaEngine,
    ctx: &mut RunContext,
    events: &Events,
) -> PipelineResult<()> {
    events.primary("Encoding delivery file");

    let muxed = ctx
        .muxed_file
        .clone()
        .ok_or(PipelineError::State("muxed file"))?;

    let mut stem = Uuid::new_v4().simple().to_string();
    stem.truncate(OUTPUT_NAME_LEN);
    let output = ctx.dirs.output.join(format!("{stem}.mp4"));

    let cmd = FfmpegCommand::new(&muxed, &output)
        .video_codec(ctx.encoding.video_codec.clone())
        .preset(ctx.encoding.preset.clone())
        .video_filter(ctx.encoding.delivery_filter())
        .audio_codec("copy");

    let total_ms = (ctx.total_duration * 1000.0) as i64;
    let progress_events = events.clone();
    engine
        .run_job(
            cmd,
            Box::new(move |p| {
                progress_events.secondary(encode_status(&p, total_ms));
            }),
        )
        .await
        .map_err(|e| PipelineError::from_media(Stage::Encode, e))?;

    info!(output = %output.display(), "delivery file ready");
    ctx.final_output = Some(output);
    Ok(())
}

/// Status line for the encode progress callback: percent done, plus time
/// remaining once FFmpeg reports a speed.
fn encode_status(progress: &FfmpegProgress, total_ms: i64) -> String {
    let percent = progress.percentage(total_ms);
    match progress.eta_seconds(total_ms) {
        Some(eta) => format!(
            "Encoding {percent:.0}% ({} left)",
            EtaEstimator::format_secs(eta)
        ),
        None => format!("Encoding {percent:.0}%"),
    }
}
