//! Shared data types for the beatcut compilation pipeline.
//!
//! This crate is dependency-light on purpose: everything here is plain data
//! and pure functions (settings, the beat grid, segment records, encoding
//! parameters) so the media and pipeline crates can both build on it.

pub mod encoding;
pub mod grid;
pub mod segment;
pub mod settings;

pub use encoding::EncodingConfig;
pub use grid::BeatGrid;
pub use segment::{natural_cmp, sanitize_file_name, segment_file_name, SegmentRecord};
pub use settings::{JobSettings, SettingsError, SettingsPatch, SettingsResult};
