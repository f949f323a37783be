// Timing - Musical time values, loop geometry and tick conversions
// Shared by the loop sanitizer and the MIDI exporter

pub mod grid;
pub mod notation;

pub use grid::{rescale_ticks, ticks_to_seconds, GridPosition, LoopGrid, BEATS_PER_BAR};
pub use notation::{
    tick_string, to_ticks, TimeBase, TimeParseError, TimeResult, TimeValue, DEFAULT_BPM,
    DEFAULT_INTERNAL_PPQ,
};
