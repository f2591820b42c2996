//! Work directory layout and source clip discovery.

use std::io;
use std::path::{Path, PathBuf};

use beatcut_models::natural_cmp;
use tokio::fs;
use tracing::debug;

/// Directory for cut segments, recreated on every run.
pub const SEGMENTS_DIR: &str = "beatcut_segments";
/// Directory for intermediates (normalized audio, manifest, joined, muxed),
/// recreated on every run.
pub const WORK_DIR: &str = "beatcut_work";
/// Directory for delivery files, kept across runs.
pub const OUTPUT_DIR: &str = "beatcut_out";

/// Work directory layout under the configured temp root.
#[derive(Debug, Clone)]
pub struct WorkDirs {
    pub root: PathBuf,
    pub segments: PathBuf,
    pub work: PathBuf,
    pub output: PathBuf,
}

impl WorkDirs {
    /// Reset the per-run directories and ensure the layout exists.
    ///
    /// Segment and work directories are wiped so stale files from an earlier
    /// run can never leak into the assembly manifest. The output directory
    /// is preserved.
    pub async fn prepare(temp_root: &Path) -> io::Result<Self> {
        let dirs = Self::layout(temp_root);

        for dir in [&dirs.segments, &dirs.work] {
            remove_dir_if_present(dir).await?;
        }
        for dir in [&dirs.segments, &dirs.work, &dirs.output] {
            fs::create_dir_all(dir).await?;
        }

        debug!("work directories ready under {}", dirs.root.display());
        Ok(dirs)
    }

    /// Compute the layout without touching the filesystem.
    pub fn layout(temp_root: &Path) -> Self {
        let root = temp_root.to_path_buf();
        Self {
            segments: root.join(SEGMENTS_DIR),
            work: root.join(WORK_DIR),
            output: root.join(OUTPUT_DIR),
            root,
        }
    }

    /// Remove all beatcut directories under `temp_root`, including delivery
    /// files. Missing directories are not an error.
    pub async fn clean(temp_root: &Path) -> io::Result<()> {
        let dirs = Self::layout(temp_root);
        for dir in [&dirs.segments, &dirs.work, &dirs.output] {
            remove_dir_if_present(dir).await?;
        }
        Ok(())
    }
}

async fn remove_dir_if_present(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// List source clip candidates directly inside `dir`, in natural name order.
///
/// Non-recursive; subdirectories and hidden entries are skipped. No
/// extension filtering: a file FFprobe cannot read costs one dropped slot
/// when it is picked, which the accumulator compensates for.
pub async fn list_source_clips(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut names: Vec<String> = Vec::new();

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }

    names.sort_by(|a, b| natural_cmp(a, b));
    Ok(names.into_iter().map(|n| dir.join(n)).collect())
}

/// List all files in the segments directory in natural name order.
///
/// Fallback path for assembly when no in-memory records are available; the
/// index prefix on segment names makes natural order equal slot order.
pub async fn discover_segments(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut names: Vec<String> = Vec::new();

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort_by(|a, b| natural_cmp(a, b));
    Ok(names.into_iter().map(|n| dir.join(n)).collect())
}
