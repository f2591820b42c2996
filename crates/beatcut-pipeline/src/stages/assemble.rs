//! Segment assembly via the concat demuxer.

use std::fmt::Write as _;
use std::path::PathBuf;

use beatcut_media::{FfmpegCommand, MediaEngine};
use beatcut_models::SegmentRecord;
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::events::Events;
use crate::stages::Stage;
use crate::workspace;

/// Concatenate kept segments into one video in slot order.
pub async fn run(
    engine: &dyn MediaEngine,
    ctx: &mut RunContext,
    events: &Events,
) -> PipelineResult<()> {
    events.primary("Joining segments");

    let mut kept: Vec<&SegmentRecord> =
        ctx.segments.iter().filter(|r| r.is_kept()).collect();
    kept.sort_by_key(|r| r.index);
    let mut files: Vec<PathBuf> = kept
        .iter()
        .filter_map(|r| r.output.clone())
        .collect();

    // With no in-memory records (e.g. resuming against an existing segment
    // directory) fall back to the index prefix on the file names.
    if files.is_empty() {
        warn!("no segment records, discovering segments from disk");
        files = workspace::discover_segments(&ctx.dirs.segments).await?;
    }
    if files.is_empty() {
        return Err(PipelineError::NoSegments);
    }

    let mut manifest_body = String::new();
    for file in &files {
        // concat demuxer manifest line; single quotes keep spaces intact
        let _ = writeln!(manifest_body, "file '{}'", file.display());
    }
    let manifest = ctx.dirs.work.join("join.txt");
    tokio::fs::write(&manifest, manifest_body).await?;
    debug!(segments = files.len(), manifest = %manifest.display(), "wrote concat manifest");

    let joined = ctx.dirs.work.join("joined.mpg");
    let cmd = FfmpegCommand::new(&manifest, &joined)
        .input_args(["-f", "concat", "-safe", "0", "-auto_convert", "1"])
        .video_codec("copy");

    engine
        .run_job(cmd, Box::new(|_| {}))
        .await
        .map_err(|e| PipelineError::from_media(Stage::Assemble, e))?;

    ctx.joined_video = Some(joined);
    Ok(())
}
