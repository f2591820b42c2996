//! FFmpeg CLI wrapper for the beatcut pipeline.
//!
//! This crate provides:
//! - Type-safe multi-input FFmpeg command building
//! - Progress parsing from `-progress pipe:2`
//! - Cooperative cancellation via a tokio watch channel
//! - FFprobe duration probing
//! - The [`MediaEngine`] trait the pipeline crate depends on

pub mod command;
pub mod engine;
pub mod error;
pub mod probe;
pub mod progress;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use engine::{FfmpegEngine, MediaEngine, ProgressFn};
pub use error::{MediaError, MediaResult};
pub use probe::probe_duration;
pub use progress::FfmpegProgress;

#[cfg(feature = "mocks")]
pub use engine::MockMediaEngine;
