// Data models for pattern sessions
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::EventCollection;
use crate::export::TrackId;
use crate::looping::SanitizeReport;

/// The musical part a generation call produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternRole {
    Drums,
    Chords,
    Melody,
    Bass,
    Layers,
}

impl PatternRole {
    pub const ALL: [PatternRole; 5] = [
        PatternRole::Drums,
        PatternRole::Chords,
        PatternRole::Melody,
        PatternRole::Bass,
        PatternRole::Layers,
    ];

    /// Key wrapping this role's data in a generator response
    pub fn key(&self) -> &'static str {
        match self {
            PatternRole::Drums => "drums",
            PatternRole::Chords => "chords",
            PatternRole::Melody => "melody",
            PatternRole::Bass => "bass",
            PatternRole::Layers => "layers",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        PatternRole::ALL.into_iter().find(|role| role.key() == key)
    }

    /// Tracks that become available once this role is generated
    pub fn track_ids(&self) -> &'static [TrackId] {
        match self {
            PatternRole::Drums => &[TrackId::Kick, TrackId::Snare, TrackId::Hihat, TrackId::FullDrums],
            PatternRole::Chords => &[TrackId::Chords],
            PatternRole::Melody => &[TrackId::Melody],
            PatternRole::Bass => &[TrackId::Bass],
            PatternRole::Layers => &[TrackId::Layers],
        }
    }

    /// The role whose data a track exports
    pub fn for_track(track: TrackId) -> Self {
        match track {
            TrackId::Kick | TrackId::Snare | TrackId::Hihat | TrackId::FullDrums => PatternRole::Drums,
            TrackId::Chords => PatternRole::Chords,
            TrackId::Melody => PatternRole::Melody,
            TrackId::Bass => PatternRole::Bass,
            TrackId::Layers => PatternRole::Layers,
        }
    }

    /// Melody, bass and layers are derived from an existing chord progression
    pub fn requires_harmonic_context(&self) -> bool {
        matches!(self, PatternRole::Melody | PatternRole::Bass | PatternRole::Layers)
    }

    /// Drums arrive as a per-instrument mapping, everything else as a flat list
    pub fn expects_drum_kit(&self) -> bool {
        matches!(self, PatternRole::Drums)
    }
}

impl fmt::Display for PatternRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One sanitized generation result held by the session
#[derive(Debug, Clone, Serialize)]
pub struct Generation {
    pub id: Uuid,
    pub role: PatternRole,
    pub length_in_bars: u32,
    pub created_at: DateTime<Utc>,

    /// Sanitized and ordered events
    pub collection: EventCollection,

    pub report: SanitizeReport,
}

impl Generation {
    pub fn new(
        role: PatternRole,
        length_in_bars: u32,
        collection: EventCollection,
        report: SanitizeReport,
    ) -> Self {
        Generation {
            id: Uuid::new_v4(),
            role,
            length_in_bars,
            created_at: Utc::now(),
            collection,
            report,
        }
    }
}
