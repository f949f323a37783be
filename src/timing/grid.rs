// Loop Grid - Fixed 4/4 loop geometry in integer ticks
// Loop boundary, grid positions, tempo and resolution conversions

use std::fmt;

use serde::{Deserialize, Serialize};

use super::notation::TimeBase;

/// Beats per bar (fixed 4/4 meter)
pub const BEATS_PER_BAR: u32 = 4;

/// Sixteenth notes per beat
pub const SIXTEENTHS_PER_BEAT: u32 = 4;

/// Grid position - describes location in musical time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    /// Bar number (0-indexed)
    pub bar: u32,

    /// Beat number within bar (0-indexed)
    pub beat: u32,

    /// Sixteenth within beat (0-indexed)
    pub sixteenth: u32,
}

impl GridPosition {
    pub fn new(bar: u32, beat: u32, sixteenth: u32) -> Self {
        GridPosition {
            bar,
            beat,
            sixteenth,
        }
    }

    /// Tick offset of this position at the given resolution
    ///
    /// Sixteenths round half-up when `ppq` is not divisible by four.
    /// Positions beyond `u64::MAX` ticks saturate.
    pub fn to_ticks(&self, ppq: u32) -> u64 {
        let quarters = self.bar as u128 * BEATS_PER_BAR as u128 + self.beat as u128;
        let sixteenths = quarters * SIXTEENTHS_PER_BEAT as u128 + self.sixteenth as u128;
        let scaled = sixteenths * ppq as u128;
        let ticks = (scaled + SIXTEENTHS_PER_BEAT as u128 / 2) / SIXTEENTHS_PER_BEAT as u128;
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.bar, self.beat, self.sixteenth)
    }
}

/// A repeating loop of whole bars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopGrid {
    /// Total number of bars in the loop
    pub length_in_bars: u32,

    /// Resolution and tempo the loop is measured in
    pub base: TimeBase,
}

impl LoopGrid {
    /// Create a loop at the default internal resolution
    pub fn new(length_in_bars: u32) -> Self {
        LoopGrid {
            length_in_bars,
            base: TimeBase::default(),
        }
    }

    pub fn with_base(length_in_bars: u32, base: TimeBase) -> Self {
        LoopGrid {
            length_in_bars,
            base,
        }
    }

    /// First position after the loop (`<length>:0:0`)
    pub fn end_position(&self) -> GridPosition {
        GridPosition::new(self.length_in_bars, 0, 0)
    }

    /// Exclusive upper bound for event starts, inclusive bound for event ends
    pub fn end_ticks(&self) -> u64 {
        self.end_position().to_ticks(self.base.ppq)
    }

    /// Whether an event starting at `start_ticks` belongs to this loop
    pub fn contains_start(&self, start_ticks: u64) -> bool {
        start_ticks < self.end_ticks()
    }

    /// Loop length in seconds at the configured tempo
    pub fn duration_seconds(&self) -> f64 {
        ticks_to_seconds(self.end_ticks(), &self.base)
    }
}

/// Convert ticks to seconds at the base's tempo
pub fn ticks_to_seconds(ticks: u64, base: &TimeBase) -> f64 {
    if base.ppq == 0 || base.bpm <= 0.0 {
        return 0.0;
    }
    let quarters = ticks as f64 / base.ppq as f64;
    quarters * 60.0 / base.bpm
}

/// Rescale a tick count between resolutions
///
/// Computes `round(ticks * to_ppq / from_ppq)` in exact integer arithmetic,
/// rounding halves up. Equal resolutions return the input unchanged.
pub fn rescale_ticks(ticks: u64, from_ppq: u32, to_ppq: u32) -> u128 {
    if from_ppq == to_ppq || from_ppq == 0 {
        return ticks as u128;
    }
    let numerator = ticks as u128 * to_ppq as u128 * 2 + from_ppq as u128;
    numerator / (2 * from_ppq as u128)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_position_ticks() {
        assert_eq!(GridPosition::new(0, 0, 0).to_ticks(192), 0);
        assert_eq!(GridPosition::new(3, 3, 2).to_ticks(192), 2976);
        assert_eq!(GridPosition::new(1, 0, 0).to_ticks(480), 1920);
        // 25 ticks per quarter: a sixteenth is 6.25 ticks
        assert_eq!(GridPosition::new(0, 0, 1).to_ticks(25), 6);
        assert_eq!(GridPosition::new(0, 0, 2).to_ticks(25), 13);
    }

    #[test]
    fn test_huge_loop_saturates() {
        let grid = LoopGrid::with_base(u32::MAX, TimeBase::new(u32::MAX, 120.0));
        assert_eq!(grid.end_ticks(), u64::MAX);
        assert!(grid.contains_start(u64::MAX - 1));

        // Still exact while it fits
        let grid = LoopGrid::with_base(u32::MAX, TimeBase::new(192, 120.0));
        assert_eq!(grid.end_ticks(), u32::MAX as u64 * 768);
    }

    #[test]
    fn test_grid_position_display() {
        assert_eq!(GridPosition::new(3, 3, 2).to_string(), "3:3:2");
    }

    #[test]
    fn test_loop_end() {
        assert_eq!(LoopGrid::new(4).end_ticks(), 3072);
        assert_eq!(LoopGrid::new(1).end_ticks(), 768);
        assert_eq!(LoopGrid::new(0).end_ticks(), 0);
        assert_eq!(LoopGrid::new(8).end_position(), GridPosition::new(8, 0, 0));
    }

    #[test]
    fn test_contains_start() {
        let grid = LoopGrid::new(4);
        assert!(grid.contains_start(0));
        assert!(grid.contains_start(3071));
        assert!(!grid.contains_start(3072));
    }

    #[test]
    fn test_ticks_to_seconds() {
        let base = TimeBase::new(192, 120.0);
        assert!((ticks_to_seconds(192, &base) - 0.5).abs() < 1e-9);
        assert!((LoopGrid::with_base(4, base).duration_seconds() - 8.0).abs() < 1e-9);
        assert_eq!(ticks_to_seconds(192, &TimeBase::new(192, 0.0)), 0.0);
    }

    #[test]
    fn test_rescale_ticks() {
        assert_eq!(rescale_ticks(192, 192, 480), 480);
        assert_eq!(rescale_ticks(1, 192, 480), 3); // 2.5 rounds up
        assert_eq!(rescale_ticks(3072, 192, 480), 7680);
        assert_eq!(rescale_ticks(777, 192, 192), 777);
        assert_eq!(rescale_ticks(100, 480, 96), 20);
        assert_eq!(rescale_ticks(2, 480, 96), 0);
    }
}
