//! Beat-synced video compilation pipeline.
//!
//! Stages run strictly in sequence over one explicit [`RunContext`]:
//! audio analysis, segment generation, assembly, muxing, delivery encode.
//! Failures in retryable stages park the context so the run can resume
//! from the failed stage instead of starting over.

pub mod context;
pub mod controller;
pub mod error;
pub mod eta;
pub mod events;
pub mod stages;
pub mod workspace;

pub use context::RunContext;
pub use controller::PipelineController;
pub use error::{PipelineError, PipelineResult};
pub use eta::EtaEstimator;
pub use events::{Events, PipelineEvent};
pub use stages::Stage;
pub use workspace::WorkDirs;
