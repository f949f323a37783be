// Session configuration
// Resolutions, tempo and loop lengths shared by sanitization and export

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::{MidiExportOptions, TrackId};
use crate::timing::{TimeBase, DEFAULT_BPM, DEFAULT_INTERNAL_PPQ};

/// Loop lengths offered for single-part generation
pub const LOOP_LENGTHS: [u32; 3] = [2, 4, 8];

/// Tempo range accepted by the editor
pub const MIN_TEMPO_BPM: f64 = 60.0;
pub const MAX_TEMPO_BPM: f64 = 200.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Resolution events are sanitized in
    pub internal_ppq: u32,

    /// Resolution written to MIDI files
    pub export_ppq: u16,

    pub tempo_bpm: f64,

    /// Bars per loop for single-part generation
    pub loop_bars: u32,

    /// Write a tempo meta event into exported files
    pub include_tempo: bool,

    /// Write a 4/4 time signature meta event into exported files
    pub include_time_signature: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            internal_ppq: DEFAULT_INTERNAL_PPQ,
            export_ppq: 480,
            tempo_bpm: DEFAULT_BPM,
            loop_bars: 4,
            include_tempo: true,
            include_time_signature: true,
        }
    }
}

impl SessionConfig {
    /// Load and validate a JSON config file; missing fields take defaults
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> ConfigResult<Self> {
        let config: SessionConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.internal_ppq == 0 {
            return Err(ConfigError::Invalid("internal_ppq must be positive".to_string()));
        }
        if self.export_ppq == 0 || self.export_ppq > 0x7FFF {
            return Err(ConfigError::Invalid(format!(
                "export_ppq {} must be between 1 and 32767",
                self.export_ppq
            )));
        }
        if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&self.tempo_bpm) {
            return Err(ConfigError::Invalid(format!(
                "tempo {} BPM is outside {}-{}",
                self.tempo_bpm, MIN_TEMPO_BPM, MAX_TEMPO_BPM
            )));
        }
        if !LOOP_LENGTHS.contains(&self.loop_bars) {
            return Err(ConfigError::Invalid(format!(
                "loop length {} must be one of {:?}",
                self.loop_bars, LOOP_LENGTHS
            )));
        }
        Ok(())
    }

    pub fn time_base(&self) -> TimeBase {
        TimeBase::new(self.internal_ppq, self.tempo_bpm)
    }

    /// Export options for one track of a loop ending at `loop_end_ticks`
    ///
    /// Times resolve at the session tempo whether or not a tempo event is written.
    pub fn export_options(&self, track: TrackId, loop_end_ticks: Option<u64>) -> MidiExportOptions {
        MidiExportOptions {
            internal_ppq: self.internal_ppq,
            ppq: self.export_ppq,
            tempo_bpm: self.tempo_bpm,
            include_tempo: self.include_tempo,
            include_time_signature: self.include_time_signature,
            channel: track.channel(),
            loop_end_ticks,
        }
    }
}
