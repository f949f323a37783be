// Export tracks - Selectable output tracks, their MIDI names and file names

use serde::{Deserialize, Serialize};

use crate::events::DrumRole;

/// General MIDI percussion channel (channel 10, 0-indexed)
pub const DRUM_CHANNEL: u8 = 9;

/// Channel for pitched parts
pub const MELODIC_CHANNEL: u8 = 0;

/// A track the user can select for download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackId {
    Kick,
    Snare,
    Hihat,
    /// Kick, snare and hi-hat in one track
    FullDrums,
    Chords,
    Melody,
    Bass,
    Layers,
}

impl TrackId {
    pub const ALL: [TrackId; 8] = [
        TrackId::Kick,
        TrackId::Snare,
        TrackId::Hihat,
        TrackId::FullDrums,
        TrackId::Chords,
        TrackId::Melody,
        TrackId::Bass,
        TrackId::Layers,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TrackId::Kick => "kick",
            TrackId::Snare => "snare",
            TrackId::Hihat => "hihat",
            TrackId::FullDrums => "full_drums",
            TrackId::Chords => "chords",
            TrackId::Melody => "melody",
            TrackId::Bass => "bass",
            TrackId::Layers => "layers",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        TrackId::ALL.into_iter().find(|id| id.key() == key)
    }

    /// Track name written into the MIDI file
    pub fn midi_name(&self) -> &'static str {
        match self {
            TrackId::Kick => "Kick",
            TrackId::Snare => "Snare",
            TrackId::Hihat => "Hi-Hat",
            TrackId::FullDrums => "Drums_Full_Loop",
            TrackId::Chords => "Chords",
            TrackId::Melody => "Melody",
            TrackId::Bass => "Bass",
            TrackId::Layers => "Layers",
        }
    }

    /// Suggested file name, e.g. `Kick_120bpm.mid`
    pub fn file_name(&self, tempo_bpm: f64) -> String {
        format!("{}_{}bpm.mid", self.midi_name(), tempo_bpm)
    }

    /// The single drum lane this track exports, if any
    pub fn drum_role(&self) -> Option<DrumRole> {
        match self {
            TrackId::Kick => Some(DrumRole::Kick),
            TrackId::Snare => Some(DrumRole::Snare),
            TrackId::Hihat => Some(DrumRole::Hihat),
            _ => None,
        }
    }

    pub fn is_drums(&self) -> bool {
        matches!(
            self,
            TrackId::Kick | TrackId::Snare | TrackId::Hihat | TrackId::FullDrums
        )
    }

    pub fn channel(&self) -> u8 {
        if self.is_drums() {
            DRUM_CHANNEL
        } else {
            MELODIC_CHANNEL
        }
    }
}

/// Suggested archive name for a set of exported tracks
pub fn archive_name(tempo_bpm: f64) -> String {
    format!("midi_kit_{}bpm.zip", tempo_bpm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names() {
        assert_eq!(TrackId::Kick.file_name(120.0), "Kick_120bpm.mid");
        assert_eq!(TrackId::Hihat.file_name(95.0), "Hi-Hat_95bpm.mid");
        assert_eq!(TrackId::FullDrums.file_name(140.0), "Drums_Full_Loop_140bpm.mid");
        assert_eq!(archive_name(120.0), "midi_kit_120bpm.zip");
    }

    #[test]
    fn test_keys_round_trip() {
        for id in TrackId::ALL {
            assert_eq!(TrackId::from_key(id.key()), Some(id));
        }
        assert_eq!(TrackId::from_key("vocals"), None);
    }

    #[test]
    fn test_drum_channels() {
        assert_eq!(TrackId::FullDrums.channel(), DRUM_CHANNEL);
        assert_eq!(TrackId::Snare.channel(), DRUM_CHANNEL);
        assert_eq!(TrackId::Bass.channel(), MELODIC_CHANNEL);
        assert_eq!(TrackId::FullDrums.drum_role(), None);
        assert_eq!(TrackId::Hihat.drum_role(), Some(DrumRole::Hihat));
    }

    #[test]
    fn test_serde_names_match_keys() {
        let value = serde_json::to_value(TrackId::FullDrums).unwrap();
        assert_eq!(value, "full_drums");
    }
}
