//! Segment generation: one cut per grid slot, with drop-and-carry
//! compensation.

use std::path::Path;

use beatcut_media::{FfmpegCommand, MediaEngine};
use beatcut_models::{segment_file_name, EncodingConfig, SegmentRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::error::{PipelineError, PipelineResult};
use crate::eta::EtaEstimator;
use crate::events::Events;

/// Cut one segment per grid slot.
///
/// Each slot requests exactly the duration needed to reach its end boundary
/// from the current timeline position. Any slot that fails (probe error, cut
/// error, degenerate output) is dropped silently; its shortfall makes the
/// next slot's request larger, so the timeline re-converges on the grid.
pub async fn run(
    engine: &dyn MediaEngine,
    ctx: &mut RunContext,
    events: &Events,
) -> PipelineResult<()> {
    let grid = ctx
        .grid
        .clone()
        .ok_or(PipelineError::State("beat grid"))?;
    if ctx.source_files.is_empty() {
        return Err(PipelineError::NoSourceClips(ctx.settings.source_dir.clone()));
    }

    let mut rng = match ctx.settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let slot_count = grid.slot_count();
    let mut eta = EtaEstimator::new();
    eta.mark_start();

    ctx.total_duration = 0.0;
    ctx.segments.clear();

    for index in 0..slot_count {
        events.primary(format!("Generating compilation {}/{slot_count}", index + 1));
        if let Some(remaining) = eta.estimate(index, slot_count) {
            events.secondary(format!(
                "Estimated time remaining: {}",
                EtaEstimator::format_secs(remaining)
            ));
        }

        let requested = grid.slot_end(index) - ctx.total_duration;
        let source =
            ctx.source_files[rng.random_range(0..ctx.source_files.len())].clone();

        // An earlier slot overshot past this boundary; nothing to cut.
        if requested <= 0.0 {
            debug!(index, requested, "slot already satisfied, skipping");
            ctx.segments
                .push(SegmentRecord::dropped(index, &source, requested));
            continue;
        }

        let record = cut_segment(
            engine,
            &ctx.dirs.segments,
            &ctx.encoding,
            index,
            &source,
            requested,
            &mut rng,
        )
        .await?;

        ctx.total_duration += record.produced;
        ctx.segments.push(record);
    }

    if !ctx.segments.iter().any(SegmentRecord::is_kept) {
        return Err(PipelineError::NoSegments);
    }

    debug!(
        total = ctx.total_duration,
        kept = ctx.segments.iter().filter(|r| r.is_kept()).count(),
        "segment generation finished"
    );
    Ok(())
}

/// Cut one segment. Returns a dropped record on any non-fatal failure;
/// only cancellation propagates as an error.
async fn cut_segment(
    engine: &dyn MediaEngine,
    segments_dir: &Path,
    encoding: &EncodingConfig,
    index: usize,
    source: &Path,
    requested: f64,
    rng: &mut StdRng,
) -> PipelineResult<SegmentRecord> {
    let clip_duration = match engine.probe_duration(source).await {
        Ok(d) if d > 0.0 => d,
        Ok(d) => {
            warn!(index, clip = %source.display(), duration = d, "degenerate clip, dropping slot");
            return Ok(SegmentRecord::dropped(index, source, requested));
        }
        Err(e) if e.is_cancelled() => return Err(PipelineError::Cancelled),
        Err(e) => {
            warn!(index, clip = %source.display(), error = %e, "probe failed, dropping slot");
            return Ok(SegmentRecord::dropped(index, source, requested));
        }
    };

    // Offset is sampled over the whole clip, deliberately unbounded by the
    // request: a seek near the clip's end just yields a short segment, and
    // the accumulator absorbs the shortfall.
    let offset = rng.random_range(0.0..clip_duration);

    let output = segments_dir.join(segment_file_name(index, source));
    let cmd = FfmpegCommand::new(source, &output)
        .seek(offset)
        .duration(requested)
        .no_audio()
        .output_args(encoding.segment_output_args());

    match engine.run_job(cmd, Box::new(|_| {})).await {
        Ok(()) => {}
        Err(e) if e.is_cancelled() => return Err(PipelineError::Cancelled),
        Err(e) => {
            warn!(index, error = %e, "segment cut failed, dropping slot");
            remove_partial(&output).await;
            return Ok(SegmentRecord::dropped(index, source, requested));
        }
    }

    // Trust the file, not the request: the timeline advances by what FFmpeg
    // actually produced.
    let produced = match engine.probe_duration(&output).await {
        Ok(d) if d > 0.0 => d,
        Ok(_) => {
            warn!(index, "segment came out empty, dropping slot");
            remove_partial(&output).await;
            return Ok(SegmentRecord::dropped(index, source, requested));
        }
        Err(e) if e.is_cancelled() => return Err(PipelineError::Cancelled),
        Err(e) => {
            warn!(index, error = %e, "segment probe failed, dropping slot");
            remove_partial(&output).await;
            return Ok(SegmentRecord::dropped(index, source, requested));
        }
    };

    Ok(SegmentRecord {
        index,
        source_clip: source.to_path_buf(),
        requested,
        produced,
        output: Some(output),
    })
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove partial segment");
        }
    }
}
