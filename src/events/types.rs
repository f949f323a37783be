// Pattern event types
// Notes, chords, drum kits and the collections they arrive in

use serde::{Deserialize, Serialize};

/// A single sounding pitch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    /// Start position (e.g. "0:1:2")
    pub time: String,

    /// Note name (e.g. "C4", "F#2")
    pub note: String,

    /// Length (e.g. "8n", or exact ticks "96i")
    pub duration: String,

    /// Velocity in (0.0, 1.0]
    pub velocity: f64,
}

impl NoteEvent {
    pub fn new(
        time: impl Into<String>,
        note: impl Into<String>,
        duration: impl Into<String>,
        velocity: f64,
    ) -> Self {
        NoteEvent {
            time: time.into(),
            note: note.into(),
            duration: duration.into(),
            velocity,
        }
    }
}

/// Simultaneous pitches sharing one onset, length and velocity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordEvent {
    pub time: String,

    /// Note names, never empty
    pub notes: Vec<String>,

    pub duration: String,

    pub velocity: f64,
}

impl ChordEvent {
    pub fn new<I, S>(time: impl Into<String>, notes: I, duration: impl Into<String>, velocity: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ChordEvent {
            time: time.into(),
            notes: notes.into_iter().map(Into::into).collect(),
            duration: duration.into(),
            velocity,
        }
    }
}

/// Either shape of event found in a flat sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternEvent {
    Note(NoteEvent),
    Chord(ChordEvent),
}

impl PatternEvent {
    pub fn time(&self) -> &str {
        match self {
            PatternEvent::Note(note) => &note.time,
            PatternEvent::Chord(chord) => &chord.time,
        }
    }

    pub fn duration(&self) -> &str {
        match self {
            PatternEvent::Note(note) => &note.duration,
            PatternEvent::Chord(chord) => &chord.duration,
        }
    }

    pub fn velocity(&self) -> f64 {
        match self {
            PatternEvent::Note(note) => note.velocity,
            PatternEvent::Chord(chord) => chord.velocity,
        }
    }

    /// Every pitch this event sounds, in order
    pub fn pitches(&self) -> Vec<&str> {
        match self {
            PatternEvent::Note(note) => vec![note.note.as_str()],
            PatternEvent::Chord(chord) => chord.notes.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_chord(&self) -> bool {
        matches!(self, PatternEvent::Chord(_))
    }
}

impl From<NoteEvent> for PatternEvent {
    fn from(note: NoteEvent) -> Self {
        PatternEvent::Note(note)
    }
}

impl From<ChordEvent> for PatternEvent {
    fn from(chord: ChordEvent) -> Self {
        PatternEvent::Chord(chord)
    }
}

/// Instrument roles of the drum kit mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumRole {
    Kick,
    Snare,
    Hihat,
}

impl DrumRole {
    pub const ALL: [DrumRole; 3] = [DrumRole::Kick, DrumRole::Snare, DrumRole::Hihat];

    /// Key used in collaborator JSON
    pub fn key(&self) -> &'static str {
        match self {
            DrumRole::Kick => "kick",
            DrumRole::Snare => "snare",
            DrumRole::Hihat => "hihat",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "kick" => Some(DrumRole::Kick),
            "snare" => Some(DrumRole::Snare),
            "hihat" => Some(DrumRole::Hihat),
            _ => None,
        }
    }
}

/// Per-role drum sequences; absent roles are empty, never null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrumKit {
    #[serde(default)]
    pub kick: Vec<NoteEvent>,

    #[serde(default)]
    pub snare: Vec<NoteEvent>,

    #[serde(default)]
    pub hihat: Vec<NoteEvent>,
}

impl DrumKit {
    pub fn lane(&self, role: DrumRole) -> &[NoteEvent] {
        match role {
            DrumRole::Kick => &self.kick,
            DrumRole::Snare => &self.snare,
            DrumRole::Hihat => &self.hihat,
        }
    }

    pub fn lane_mut(&mut self, role: DrumRole) -> &mut Vec<NoteEvent> {
        match role {
            DrumRole::Kick => &mut self.kick,
            DrumRole::Snare => &mut self.snare,
            DrumRole::Hihat => &mut self.hihat,
        }
    }

    /// Kick, snare and hi-hat events concatenated (full kit track)
    pub fn all_notes(&self) -> Vec<NoteEvent> {
        DrumRole::ALL
            .iter()
            .flat_map(|role| self.lane(*role).iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.kick.len() + self.snare.len() + self.hihat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A role's worth of events as delivered by the generator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventCollection {
    /// Chords, melody, bass or texture layers
    Flat(Vec<PatternEvent>),

    /// Drum kit mapping
    Drums(DrumKit),

    /// Any other shape, carried through untouched
    Unrecognized(serde_json::Value),
}

impl EventCollection {
    /// Number of events held (0 for unrecognized shapes)
    pub fn event_count(&self) -> usize {
        match self {
            EventCollection::Flat(events) => events.len(),
            EventCollection::Drums(kit) => kit.len(),
            EventCollection::Unrecognized(_) => 0,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, EventCollection::Unrecognized(_))
    }

    pub fn as_flat(&self) -> Option<&[PatternEvent]> {
        match self {
            EventCollection::Flat(events) => Some(events),
            _ => None,
        }
    }

    pub fn as_drums(&self) -> Option<&DrumKit> {
        match self {
            EventCollection::Drums(kit) => Some(kit),
            _ => None,
        }
    }
}
