//! Remaining-time estimation for the segment loop.

use std::time::Instant;

/// Linear extrapolation from wall-clock time spent so far.
#[derive(Debug, Clone, Default)]
pub struct EtaEstimator {
    started: Option<Instant>,
}

impl EtaEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the loop start. Must be called before [`estimate`](Self::estimate).
    pub fn mark_start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Use a specific start instant instead of now.
    pub fn start_at(&mut self, at: Instant) {
        self.started = Some(at);
    }

    /// Estimated seconds remaining after `completed` of `total` items.
    ///
    /// Returns `None` until at least one item has completed, since there is
    /// nothing to extrapolate from.
    pub fn estimate(&self, completed: usize, total: usize) -> Option<f64> {
        let started = self.started?;
        if completed == 0 || total == 0 {
            return None;
        }
        let elapsed = started.elapsed().as_secs_f64();
        let per_item = elapsed / completed as f64;
        let remaining = total.saturating_sub(completed);
        Some(per_item * remaining as f64)
    }

    /// Human-readable rendering of a duration in seconds.
    pub fn format_secs(secs: f64) -> String {
        let total = secs.round().max(0.0) as u64;
        let minutes = total / 60;
        let seconds = total % 60;
        if minutes > 0 {
            format!("{minutes}m {seconds:02}s")
        } else {
            format!("{seconds}s")
        }
    }
}
