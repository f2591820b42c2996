//! Beat grid construction.

/// Ordered sequence of absolute timestamps marking segment boundaries.
///
/// The grid covers `[0, audio_duration + period]` in steps of one segment
/// period, so it always extends past the audio's end and the final segment
/// slot is never starved. Slot `i` spans `[beats[i], beats[i + 1])`.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatGrid {
    beats: Vec<f64>,
    period: f64,
}

impl BeatGrid {
    /// Build the grid for an audio track.
    ///
    /// `period = (60 / bpm) * beats_per_segment`. Beats are computed as
    /// `i * period` rather than by accumulation, so the grid is exact for
    /// any length.
    pub fn build(audio_duration: f64, bpm: u32, beats_per_segment: u32) -> Self {
        let period = (60.0 / f64::from(bpm)) * f64::from(beats_per_segment);
        let end = audio_duration + period;

        let beats: Vec<f64> = (0..)
            .map(|i| i as f64 * period)
            .take_while(|b| *b <= end)
            .collect();

        Self { beats, period }
    }

    /// The boundary timestamps, strictly increasing, starting at 0.
    pub fn beats(&self) -> &[f64] {
        &self.beats
    }

    /// Seconds between consecutive boundaries.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Number of segment slots defined by the grid.
    pub fn slot_count(&self) -> usize {
        self.beats.len().saturating_sub(1)
    }

    /// End boundary of slot `index`.
    pub fn slot_end(&self, index: usize) -> f64 {
        self.beats[index + 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_shape_130s_120bpm_8beats() {
        // 120 bpm, 8 beats per segment => 4s period; 130s audio => boundaries
        // 0, 4, ..., 132: 34 points, 33 slots.
        let grid = BeatGrid::build(130.0, 120, 8);
        assert_eq!(grid.period(), 4.0);
        assert_eq!(grid.beats().len(), 34);
        assert_eq!(grid.slot_count(), 33);
        assert_eq!(grid.beats()[0], 0.0);
        assert_eq!(*grid.beats().last().unwrap(), 132.0);
    }

    #[test]
    fn test_grid_is_strictly_increasing_and_covers_audio() {
        for &(dur, bpm, bps) in &[
            (1.0_f64, 1_u32, 1_u32),
            (59.9, 128, 4),
            (130.0, 120, 8),
            (3600.0, 95, 16),
            (0.5, 200, 1),
        ] {
            let grid = BeatGrid::build(dur, bpm, bps);
            let beats = grid.beats();
            assert_eq!(beats[0], 0.0);
            assert!(beats.windows(2).all(|w| w[1] > w[0]));
            assert!(*beats.last().unwrap() >= dur, "grid must reach past audio end");
        }
    }

    #[test]
    fn test_grid_is_deterministic() {
        let a = BeatGrid::build(247.3, 174, 4);
        let b = BeatGrid::build(247.3, 174, 4);
        assert_eq!(a, b);
    }

    #[test]
    fn test_slot_end() {
        let grid = BeatGrid::build(10.0, 60, 2);
        // period = 2s
        assert_eq!(grid.slot_end(0), 2.0);
        assert_eq!(grid.slot_end(3), 8.0);
    }
}
