// Time Notation - Symbolic musical time resolved to integer ticks
// Transport positions, note values, triplets, measures, raw ticks and seconds

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::grid::BEATS_PER_BAR;

/// Resolution used while editing and sanitizing patterns
pub const DEFAULT_INTERNAL_PPQ: u32 = 192;

/// Tempo assumed when none is configured
pub const DEFAULT_BPM: f64 = 120.0;

/// Largest tick count we accept from floating-point conversion (2^53)
const MAX_FLOAT_TICKS: f64 = 9_007_199_254_740_992.0;

/// Errors raised while resolving a time string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("empty time value")]
    Empty,

    #[error("unrecognized time syntax: {0:?}")]
    Unrecognized(String),

    #[error("invalid number {0:?} in time value")]
    InvalidNumber(String),

    #[error("note division must be positive: {0:?}")]
    ZeroDivision(String),

    #[error("time value {0:?} is out of range")]
    OutOfRange(String),
}

pub type TimeResult<T> = Result<T, TimeParseError>;

/// Tick resolution plus the tempo needed to resolve clock-time values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeBase {
    /// Pulses per quarter note
    pub ppq: u32,

    /// Beats per minute, only consulted for seconds
    pub bpm: f64,
}

impl Default for TimeBase {
    fn default() -> Self {
        TimeBase {
            ppq: DEFAULT_INTERNAL_PPQ,
            bpm: DEFAULT_BPM,
        }
    }
}

impl TimeBase {
    pub fn new(ppq: u32, bpm: f64) -> Self {
        TimeBase { ppq, bpm }
    }
}

/// A parsed musical time value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeValue {
    /// `bars:quarters[:sixteenths]`, 0-based bar index
    Transport {
        bars: f64,
        quarters: f64,
        sixteenths: f64,
    },

    /// `<N>n`, `<N>n.` - a 1/N note, `1n` spans a full bar
    Note { division: u32, dotted: bool },

    /// `<N>t` - triplet of a 1/N note
    Triplet { division: u32 },

    /// `<N>m` - whole measures
    Measures(u32),

    /// `<N>i` - exact ticks, independent of resolution
    Ticks(u64),

    /// `<x>` or `<x>s` - clock time
    Seconds(f64),
}

impl TimeValue {
    /// Parse a time string
    ///
    /// Anything outside the grammar, including negative numbers and
    /// compound expressions such as `4n + 8n`, is rejected.
    pub fn parse(input: &str) -> TimeResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TimeParseError::Empty);
        }
        let lower = trimmed.to_ascii_lowercase();

        if lower.contains(':') {
            return parse_transport(&lower);
        }

        if let Some(body) = lower.strip_suffix("n.") {
            let division = parse_division(body, &lower)?;
            return Ok(TimeValue::Note {
                division,
                dotted: true,
            });
        }
        if let Some(body) = lower.strip_suffix('n') {
            let division = parse_division(body, &lower)?;
            return Ok(TimeValue::Note {
                division,
                dotted: false,
            });
        }
        if let Some(body) = lower.strip_suffix('t') {
            let division = parse_division(body, &lower)?;
            return Ok(TimeValue::Triplet { division });
        }
        if let Some(body) = lower.strip_suffix('m') {
            let count = parse_integer(body, &lower)?;
            let count = u32::try_from(count).map_err(|_| TimeParseError::OutOfRange(lower.clone()))?;
            return Ok(TimeValue::Measures(count));
        }
        if let Some(body) = lower.strip_suffix('i') {
            return Ok(TimeValue::Ticks(parse_integer(body, &lower)?));
        }

        let seconds = lower.strip_suffix('s').unwrap_or(&lower);
        Ok(TimeValue::Seconds(parse_decimal(seconds, &lower)?))
    }

    /// Resolve to a tick count at the given time base
    ///
    /// Fractional results round half-up to the nearest tick.
    pub fn to_ticks(&self, base: &TimeBase) -> TimeResult<u64> {
        let ppq = base.ppq as f64;
        let beats_per_bar = BEATS_PER_BAR as f64;

        let exact = match *self {
            TimeValue::Ticks(ticks) => return Ok(ticks),
            TimeValue::Measures(count) => {
                return (count as u64)
                    .checked_mul(BEATS_PER_BAR as u64)
                    .and_then(|beats| beats.checked_mul(base.ppq as u64))
                    .ok_or_else(|| TimeParseError::OutOfRange(format!("{}m", count)));
            }
            TimeValue::Transport {
                bars,
                quarters,
                sixteenths,
            } => (bars * beats_per_bar + quarters + sixteenths / 4.0) * ppq,
            TimeValue::Note { division, dotted } => {
                let base_ticks = if division == 1 {
                    beats_per_bar * ppq
                } else {
                    4.0 * ppq / division as f64
                };
                if dotted {
                    base_ticks * 1.5
                } else {
                    base_ticks
                }
            }
            TimeValue::Triplet { division } => 8.0 * ppq / (3.0 * division as f64),
            TimeValue::Seconds(seconds) => {
                if !(base.bpm > 0.0) {
                    return Err(TimeParseError::OutOfRange(format!("{}s", seconds)));
                }
                seconds * base.bpm / 60.0 * ppq
            }
        };

        round_ticks(exact).ok_or_else(|| TimeParseError::OutOfRange(self.to_string()))
    }
}

impl FromStr for TimeValue {
    type Err = TimeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeValue::parse(s)
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeValue::Transport {
                bars,
                quarters,
                sixteenths,
            } => write!(f, "{}:{}:{}", bars, quarters, sixteenths),
            TimeValue::Note { division, dotted } => {
                write!(f, "{}n{}", division, if *dotted { "." } else { "" })
            }
            TimeValue::Triplet { division } => write!(f, "{}t", division),
            TimeValue::Measures(count) => write!(f, "{}m", count),
            TimeValue::Ticks(ticks) => write!(f, "{}i", ticks),
            TimeValue::Seconds(seconds) => write!(f, "{}s", seconds),
        }
    }
}

/// Parse and resolve a time string in one step
pub fn to_ticks(input: &str, base: &TimeBase) -> TimeResult<u64> {
    TimeValue::parse(input)?.to_ticks(base)
}

/// Exact tick notation (`<N>i`) for a tick count
pub fn tick_string(ticks: u64) -> String {
    TimeValue::Ticks(ticks).to_string()
}

fn parse_transport(input: &str) -> TimeResult<TimeValue> {
    let parts: Vec<&str> = input.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(TimeParseError::Unrecognized(input.to_string()));
    }

    let bars = parse_decimal(parts[0], input)?;
    let quarters = parse_decimal(parts[1], input)?;
    let sixteenths = match parts.get(2) {
        Some(part) => parse_decimal(part, input)?,
        None => 0.0,
    };

    Ok(TimeValue::Transport {
        bars,
        quarters,
        sixteenths,
    })
}

fn parse_division(body: &str, input: &str) -> TimeResult<u32> {
    let value = parse_integer(body, input)?;
    if value == 0 {
        return Err(TimeParseError::ZeroDivision(input.to_string()));
    }
    u32::try_from(value).map_err(|_| TimeParseError::OutOfRange(input.to_string()))
}

/// Digits only, no sign
fn parse_integer(body: &str, input: &str) -> TimeResult<u64> {
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimeParseError::Unrecognized(input.to_string()));
    }
    body.parse::<u64>()
        .map_err(|_| TimeParseError::OutOfRange(input.to_string()))
}

/// `\d+(\.\d+)?`
fn parse_decimal(body: &str, input: &str) -> TimeResult<f64> {
    let (whole, fraction) = match body.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (body, None),
    };

    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(whole) || fraction.is_some_and(|f| !digits(f)) {
        return Err(TimeParseError::InvalidNumber(input.to_string()));
    }

    body.parse::<f64>()
        .map_err(|_| TimeParseError::InvalidNumber(input.to_string()))
}

fn round_ticks(exact: f64) -> Option<u64> {
    if !exact.is_finite() || exact < 0.0 || exact > MAX_FLOAT_TICKS {
        return None;
    }
    Some((exact + 0.5).floor() as u64)
}
