//! beatcut CLI.

use std::path::{Path, PathBuf};

use anyhow::Context;
use beatcut_models::{JobSettings, SettingsError, SettingsPatch};
use beatcut_pipeline::{Events, PipelineController, PipelineEvent, WorkDirs};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "beatcut", version, about = "Beat-synced video compilation generator")]
struct Cli {
    /// Settings file; created/updated after a successful run
    #[arg(
        short,
        long,
        global = true,
        env = "BEATCUT_SETTINGS",
        default_value = "beatcut.json"
    )]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a compilation
    Run {
        /// Directory scanned for source clips
        #[arg(long)]
        source_dir: Option<PathBuf>,
        /// Root for work directories
        #[arg(long)]
        temp_dir: Option<PathBuf>,
        /// Audio track driving the beat grid
        #[arg(long)]
        audio: Option<PathBuf>,
        /// Beats per minute of the audio track
        #[arg(long)]
        bpm: Option<u32>,
        /// Beats each segment spans
        #[arg(long)]
        beats_per_segment: Option<u32>,
        /// Audio/video offset in seconds
        #[arg(long)]
        audio_offset: Option<f64>,
        /// RNG seed for reproducible selection
        #[arg(long)]
        seed: Option<u64>,
        /// Automatic retries of a failed stage before giving up
        #[arg(long, env = "BEATCUT_MAX_STAGE_RETRIES", default_value_t = 0)]
        max_stage_retries: u32,
    },
    /// Open the last delivery file with the system player
    Open,
    /// Copy the last delivery file to a destination
    Save {
        /// Destination file or directory
        dest: PathBuf,
    },
    /// Remove the work directories, including delivery files
    Clean,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            source_dir,
            temp_dir,
            audio,
            bpm,
            beats_per_segment,
            audio_offset,
            seed,
            max_stage_retries,
        } => {
            let patch = SettingsPatch {
                source_dir,
                temp_dir,
                audio_path: audio,
                bpm,
                beats_per_segment,
                audio_offset_secs: audio_offset,
                seed,
            };
            run_command(cli.settings, patch, max_stage_retries).await
        }
        Command::Open => open_command(&cli.settings),
        Command::Save { dest } => save_command(&cli.settings, &dest),
        Command::Clean => clean_command(&cli.settings).await,
    }
}

/// Load stored settings (if any), overlay CLI flags, run the pipeline, and
/// persist the merged settings on success.
async fn run_command(
    settings_path: PathBuf,
    patch: SettingsPatch,
    max_stage_retries: u32,
) -> anyhow::Result<()> {
    let mut settings = match JobSettings::load(&settings_path) {
        Ok(s) => s,
        Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            JobSettings::default()
        }
        Err(e) => return Err(e).context("failed to load settings file"),
    };
    settings.apply(patch);
    settings.validate().context(
        "settings incomplete; pass --source-dir, --temp-dir, --audio, --bpm and \
         --beats-per-segment at least once",
    )?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                PipelineEvent::Primary(msg) => println!("{msg}"),
                PipelineEvent::Secondary(msg) => println!("  {msg}"),
                PipelineEvent::RetryAvailable { stage } => {
                    println!("Stage `{stage}` failed; the run can be resumed")
                }
                PipelineEvent::Completed { output } => {
                    println!("Compilation ready: {}", output.display())
                }
                PipelineEvent::Cancelled => println!("Cancelled"),
            }
        }
    });

    let mut controller = PipelineController::with_ffmpeg(Events::new(event_tx));

    // Ctrl-C flips the cancel flag; the running FFmpeg job is killed.
    let cancel = controller.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = cancel.send(true);
        }
    });

    let mut result = controller.run(settings.clone()).await;
    let mut attempts = 0;
    while attempts < max_stage_retries
        && matches!(result, Err(ref e) if e.is_retryable())
        && controller.can_retry()
    {
        attempts += 1;
        warn!(attempt = attempts, max = max_stage_retries, "retrying failed stage");
        result = controller.retry().await;
    }

    if result.is_ok() {
        if let Some(output) = controller.last_output() {
            settings.final_output = Some(output.clone());
        }
        settings.save(&settings_path).context("failed to save settings")?;
    }

    drop(controller);
    let _ = printer.await;
    result.map_err(Into::into)
}

fn load_settings(settings_path: &Path) -> anyhow::Result<JobSettings> {
    JobSettings::load(settings_path).with_context(|| {
        format!(
            "failed to load settings from {}; run `beatcut run` first",
            settings_path.display()
        )
    })
}

fn open_command(settings_path: &Path) -> anyhow::Result<()> {
    let settings = load_settings(settings_path)?;
    let output = settings
        .final_output
        .context("no compilation has been produced yet")?;
    open::that(&output)
        .with_context(|| format!("failed to open {}", output.display()))?;
    Ok(())
}

fn save_command(settings_path: &Path, dest: &Path) -> anyhow::Result<()> {
    let settings = load_settings(settings_path)?;
    let output = settings
        .final_output
        .context("no compilation has been produced yet")?;

    let target = if dest.is_dir() {
        match output.file_name() {
            Some(name) => dest.join(name),
            None => dest.to_path_buf(),
        }
    } else {
        dest.to_path_buf()
    };

    std::fs::copy(&output, &target)
        .with_context(|| format!("failed to copy to {}", target.display()))?;
    println!("Saved {}", target.display());
    Ok(())
}

async fn clean_command(settings_path: &Path) -> anyhow::Result<()> {
    let settings = load_settings(settings_path)?;
    WorkDirs::clean(&settings.temp_dir)
        .await
        .context("failed to remove work directories")?;
    println!("Removed work directories under {}", settings.temp_dir.display());
    Ok(())
}
