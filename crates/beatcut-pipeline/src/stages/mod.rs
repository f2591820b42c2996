//! Pipeline stages.

use std::fmt;

pub mod assemble;
pub mod audio;
pub mod encode;
pub mod mux;
pub mod segments;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Probe the audio track, build the beat grid, normalize the audio.
    Audio,
    /// Cut one segment per grid slot.
    Segments,
    /// Concatenate kept segments into one video.
    Assemble,
    /// Mux the normalized audio onto the joined video.
    Mux,
    /// Encode the delivery file.
    Encode,
}

impl Stage {
    /// Execution order of the stages.
    pub const ORDER: [Stage; 5] = [
        Stage::Audio,
        Stage::Segments,
        Stage::Assemble,
        Stage::Mux,
        Stage::Encode,
    ];

    /// Whether a failure in this stage parks the context for retry.
    ///
    /// The segment loop handles its own failures by dropping slots, so a
    /// fatal error out of it means something retrying will not fix.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Stage::Segments)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Audio => "audio",
            Stage::Segments => "segments",
            Stage::Assemble => "assemble",
            Stage::Mux => "mux",
            Stage::Encode => "encode",
        };
        f.write_str(name)
    }
}
