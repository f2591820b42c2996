//! Pipeline tests over a scripted media engine.
//!
//! The scripted engine fabricates durations instead of invoking FFmpeg:
//! probe calls answer from a table of produced files, and run calls record
//! the `-t` duration they were asked for. That makes the timeline math
//! observable without any media files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use beatcut_media::{
    FfmpegCommand, MediaEngine, MediaError, MediaResult, MockMediaEngine, ProgressFn,
};
use beatcut_models::{BeatGrid, JobSettings};
use beatcut_pipeline::{
    stages, Events, PipelineController, PipelineError, PipelineEvent, RunContext, Stage, WorkDirs,
};
use tokio::sync::mpsc;

struct ScriptedEngine {
    audio_path: PathBuf,
    audio_duration: f64,
    clip_duration: f64,
    /// Durations of files "produced" by run_job, keyed by output path.
    produced: Mutex<HashMap<PathBuf, f64>>,
    /// Output paths containing this substring fail their job.
    fail_substring: Mutex<Option<String>>,
    /// Probed paths containing this substring fail their probe.
    fail_probe_substring: Mutex<Option<String>>,
    /// Total run_job calls.
    job_calls: AtomicUsize,
    /// run_job calls that were segment cuts.
    segment_jobs: AtomicUsize,
    /// Return Cancelled once this many jobs have run.
    cancel_after_jobs: Option<usize>,
}

impl ScriptedEngine {
    fn new(audio_path: PathBuf, audio_duration: f64, clip_duration: f64) -> Self {
        Self {
            audio_path,
            audio_duration,
            clip_duration,
            produced: Mutex::new(HashMap::new()),
            fail_substring: Mutex::new(None),
            fail_probe_substring: Mutex::new(None),
            job_calls: AtomicUsize::new(0),
            segment_jobs: AtomicUsize::new(0),
            cancel_after_jobs: None,
        }
    }

    fn fail_outputs_containing(&self, substring: &str) {
        *self.fail_substring.lock().unwrap() = Some(substring.to_string());
    }

    fn fail_probes_containing(&self, substring: &str) {
        *self.fail_probe_substring.lock().unwrap() = Some(substring.to_string());
    }

    fn clear_failures(&self) {
        *self.fail_substring.lock().unwrap() = None;
    }
}

#[async_trait]
impl MediaEngine for ScriptedEngine {
    async fn probe_duration(&self, path: &Path) -> MediaResult<f64> {
        if let Some(s) = self.fail_probe_substring.lock().unwrap().as_deref() {
            if path.to_string_lossy().contains(s) {
                return Err(MediaError::InvalidMedia("not a media file".into()));
            }
        }
        if path == self.audio_path {
            return Ok(self.audio_duration);
        }
        if let Some(d) = self.produced.lock().unwrap().get(path) {
            return Ok(*d);
        }
        Ok(self.clip_duration)
    }

    async fn run_job(&self, cmd: FfmpegCommand, _on_progress: ProgressFn) -> MediaResult<()> {
        let calls = self.job_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(limit) = self.cancel_after_jobs {
            if calls > limit {
                return Err(MediaError::Cancelled);
            }
        }

        let output = cmd.output_path().to_path_buf();
        if let Some(s) = self.fail_substring.lock().unwrap().as_deref() {
            if output.to_string_lossy().contains(s) {
                return Err(MediaError::ffmpeg_failed("scripted failure", None, Some(1)));
            }
        }

        let args = cmd.build_args();
        if args.iter().any(|a| a == "-mbd") {
            self.segment_jobs.fetch_add(1, Ordering::SeqCst);
            if let Some(pos) = args.iter().position(|a| a == "-t") {
                let t: f64 = args[pos + 1].parse().unwrap();
                self.produced.lock().unwrap().insert(output.clone(), t);
            }
        }

        std::fs::write(&output, b"scripted")?;
        Ok(())
    }
}

/// Source dir with three clips, an audio file, and a temp root.
fn test_settings(root: &Path) -> JobSettings {
    let source_dir = root.join("clips");
    std::fs::create_dir_all(&source_dir).unwrap();
    for name in ["a.mp4", "b.mp4", "c.mp4"] {
        std::fs::write(source_dir.join(name), b"clip").unwrap();
    }
    let audio_path = root.join("track.mp3");
    std::fs::write(&audio_path, b"audio").unwrap();

    JobSettings {
        source_dir,
        temp_dir: root.join("tmp"),
        audio_path,
        bpm: 120,
        beats_per_segment: 8,
        audio_offset_secs: 0.5,
        seed: Some(42),
        final_output: None,
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn segments_ctx(settings: &JobSettings) -> RunContext {
    let dirs = WorkDirs::prepare(&settings.temp_dir).await.unwrap();
    let source_files = beatcut_pipeline::workspace::list_source_clips(&settings.source_dir)
        .await
        .unwrap();
    let mut ctx = RunContext::new(settings.clone(), dirs, source_files);
    ctx.audio_duration = 130.0;
    ctx.grid = Some(BeatGrid::build(130.0, 120, 8));
    ctx
}

#[tokio::test]
async fn segment_loop_converges_on_grid_end() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let engine = ScriptedEngine::new(settings.audio_path.clone(), 130.0, 30.0);
    let mut ctx = segments_ctx(&settings).await;

    stages::segments::run(&engine, &mut ctx, &Events::disabled())
        .await
        .unwrap();

    // 4s period over 130s of audio: 33 slots, boundaries up to 132s.
    assert_eq!(ctx.segments.len(), 33);
    assert!(ctx.segments.iter().all(|r| r.is_kept()));
    assert!(
        (ctx.total_duration - 132.0).abs() < 1e-9,
        "total {} should land on the final boundary",
        ctx.total_duration
    );
}

#[tokio::test]
async fn dropped_slot_shortfall_is_carried_into_next_request() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let engine = ScriptedEngine::new(settings.audio_path.clone(), 130.0, 30.0);
    engine.fail_outputs_containing("/5_");
    let mut ctx = segments_ctx(&settings).await;

    stages::segments::run(&engine, &mut ctx, &Events::disabled())
        .await
        .unwrap();

    let dropped = &ctx.segments[5];
    assert!(!dropped.is_kept());
    assert_eq!(dropped.produced, 0.0);
    assert!((dropped.requested - 4.0).abs() < 1e-9);

    // Slot 6 must request its own 4s plus the dropped 4s.
    let next = &ctx.segments[6];
    assert!((next.requested - 8.0).abs() < 1e-9);
    assert!((next.produced - 8.0).abs() < 1e-9);

    // The timeline still converges on the grid end.
    assert!((ctx.total_duration - 132.0).abs() < 1e-9);
    assert_eq!(ctx.segments.iter().filter(|r| r.is_kept()).count(), 32);
}

#[tokio::test]
async fn unreadable_source_files_cost_dropped_slots_not_the_run() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    // Non-media junk sits alongside the clips; discovery does not filter it.
    std::fs::write(settings.source_dir.join("notes.txt"), b"not a video").unwrap();

    let engine = ScriptedEngine::new(settings.audio_path.clone(), 130.0, 30.0);
    engine.fail_probes_containing("notes.txt");
    let mut ctx = segments_ctx(&settings).await;
    assert_eq!(ctx.source_files.len(), 4);

    stages::segments::run(&engine, &mut ctx, &Events::disabled())
        .await
        .unwrap();

    // Every slot that picked the junk file was dropped, and each later
    // successful slot absorbed the shortfall: the timeline sits exactly on
    // the end boundary of the last kept slot.
    for record in &ctx.segments {
        if record.source_clip.ends_with("notes.txt") {
            assert!(!record.is_kept());
            assert_eq!(record.produced, 0.0);
        }
    }
    let last_kept = ctx
        .segments
        .iter()
        .filter(|r| r.is_kept())
        .map(|r| r.index)
        .max()
        .expect("at least one kept slot");
    let expected = 4.0 * (last_kept + 1) as f64;
    assert!((ctx.total_duration - expected).abs() < 1e-9);
}

#[tokio::test]
async fn full_run_emits_completion_and_writes_manifest_in_order() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let engine = Arc::new(ScriptedEngine::new(
        settings.audio_path.clone(),
        130.0,
        30.0,
    ));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = PipelineController::new(engine, Events::new(tx));
    controller.run(settings.clone()).await.unwrap();

    let events = drain(&mut rx);
    let output = events
        .iter()
        .find_map(|e| match e {
            PipelineEvent::Completed { output } => Some(output.clone()),
            _ => None,
        })
        .expect("completion event");

    // Delivery file: 6-char random stem, .mp4, in the output directory.
    assert_eq!(output.extension().unwrap(), "mp4");
    assert_eq!(output.file_stem().unwrap().len(), 6);
    assert!(output.starts_with(settings.temp_dir.join("beatcut_out")));
    assert!(output.exists());
    assert_eq!(controller.last_output(), Some(&output));

    // The concat manifest lists all 33 segments in slot order.
    let manifest =
        std::fs::read_to_string(settings.temp_dir.join("beatcut_work").join("join.txt")).unwrap();
    let lines: Vec<&str> = manifest.lines().collect();
    assert_eq!(lines.len(), 33);
    for (i, line) in lines.iter().enumerate() {
        assert!(line.starts_with("file '"), "bad manifest line: {line}");
        assert!(
            line.contains(&format!("/{i}_")),
            "line {i} out of order: {line}"
        );
    }
}

#[tokio::test]
async fn identical_seeds_pick_identical_sources() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());

    let mut picks = Vec::new();
    for _ in 0..2 {
        let engine = ScriptedEngine::new(settings.audio_path.clone(), 130.0, 30.0);
        let mut ctx = segments_ctx(&settings).await;
        stages::segments::run(&engine, &mut ctx, &Events::disabled())
            .await
            .unwrap();
        picks.push(
            ctx.segments
                .iter()
                .map(|r| r.source_clip.clone())
                .collect::<Vec<_>>(),
        );
    }

    assert_eq!(picks[0], picks[1]);
}

#[tokio::test]
async fn cancellation_halts_the_run_without_retry_offer() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let mut engine = ScriptedEngine::new(settings.audio_path.clone(), 130.0, 30.0);
    engine.cancel_after_jobs = Some(3);
    let engine = Arc::new(engine);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = PipelineController::new(engine.clone(), Events::new(tx));
    let err = controller.run(settings).await.unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled));
    assert!(!controller.can_retry());

    // The cancelled job is the last engine call; nothing runs after it.
    assert_eq!(engine.job_calls.load(Ordering::SeqCst), 4);

    let events = drain(&mut rx);
    assert!(events.contains(&PipelineEvent::Cancelled));
    assert!(!events
        .iter()
        .any(|e| matches!(e, PipelineEvent::RetryAvailable { .. })));
}

#[tokio::test]
async fn failed_mux_parks_run_and_retry_resumes_without_recutting() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let engine = Arc::new(ScriptedEngine::new(
        settings.audio_path.clone(),
        130.0,
        30.0,
    ));
    engine.fail_outputs_containing("muxed");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut controller = PipelineController::new(engine.clone(), Events::new(tx));

    let err = controller.run(settings).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Stage {
            stage: Stage::Mux,
            ..
        }
    ));
    assert!(err.is_retryable());
    assert!(controller.can_retry());

    let events = drain(&mut rx);
    assert!(events.contains(&PipelineEvent::RetryAvailable { stage: Stage::Mux }));

    let cuts_before = engine.segment_jobs.load(Ordering::SeqCst);
    assert_eq!(cuts_before, 33);

    engine.clear_failures();
    controller.retry().await.unwrap();
    assert!(!controller.can_retry());

    // Resumed from mux: no segments were cut again.
    assert_eq!(engine.segment_jobs.load(Ordering::SeqCst), cuts_before);

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, PipelineEvent::Completed { .. })));
}

#[tokio::test]
async fn retry_without_parked_run_is_an_error() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let engine = Arc::new(ScriptedEngine::new(
        settings.audio_path.clone(),
        130.0,
        30.0,
    ));

    let mut controller = PipelineController::new(engine, Events::disabled());
    controller.run(settings).await.unwrap();

    let err = controller.retry().await.unwrap_err();
    assert!(matches!(err, PipelineError::NoPendingRetry));
}

#[tokio::test]
async fn empty_source_dir_fails_before_any_stage() {
    let root = tempfile::tempdir().unwrap();
    let mut settings = test_settings(root.path());
    settings.source_dir = root.path().join("empty");
    std::fs::create_dir_all(&settings.source_dir).unwrap();

    let engine = Arc::new(ScriptedEngine::new(
        settings.audio_path.clone(),
        130.0,
        30.0,
    ));
    let mut controller = PipelineController::new(engine.clone(), Events::disabled());

    let err = controller.run(settings).await.unwrap_err();
    assert!(matches!(err, PipelineError::NoSourceClips(_)));
    assert_eq!(engine.job_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn audio_stage_builds_grid_and_normalizes() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let mut ctx = segments_ctx(&settings).await;
    ctx.grid = None;
    ctx.audio_duration = 0.0;

    let mut engine = MockMediaEngine::new();
    engine.expect_probe_duration().returning(|_| Ok(130.0));
    engine.expect_run_job().returning(|_, _| Ok(()));

    stages::audio::run(&engine, &mut ctx, &Events::disabled())
        .await
        .unwrap();

    assert_eq!(ctx.audio_duration, 130.0);
    assert_eq!(ctx.grid.as_ref().unwrap().slot_count(), 33);
    let audio_track = ctx.audio_track.unwrap();
    assert_eq!(audio_track.extension().unwrap(), "m4a");
}

#[tokio::test]
async fn audio_probe_failure_is_a_retryable_probe_error() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path());
    let mut ctx = segments_ctx(&settings).await;

    let mut engine = MockMediaEngine::new();
    engine
        .expect_probe_duration()
        .returning(|_| Err(MediaError::InvalidMedia("no duration".into())));

    let err = stages::audio::run(&engine, &mut ctx, &Events::disabled())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Probe { .. }));
    assert!(err.is_retryable());
}
