// Pitch names - Scientific pitch notation to MIDI key numbers
// C4 = 60; sharps '#', flats 'b', octaves -1 through 9

use thiserror::Error;

/// Semitone offsets for note letters (C=0, D=2, E=4, F=5, G=7, A=9, B=11)
const SEMITONE_MAP: [(char, i32); 7] = [
    ('C', 0),
    ('D', 2),
    ('E', 4),
    ('F', 5),
    ('G', 7),
    ('A', 9),
    ('B', 11),
];

/// Highest MIDI key number
pub const MIDI_KEY_MAX: u8 = 127;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PitchError {
    #[error("Invalid note name: {0:?}")]
    InvalidName(String),

    #[error("Note {0:?} is outside the MIDI key range")]
    OutOfRange(String),
}

/// Convert a note name (e.g. "C4", "F#2", "Bb3") to a MIDI key number
///
/// Accidentals may repeat ("C##4"). Letters are case-insensitive.
pub fn note_name_to_midi(name: &str) -> Result<u8, PitchError> {
    let trimmed = name.trim();
    let invalid = || PitchError::InvalidName(name.to_string());

    let mut chars = trimmed.chars();
    let letter = chars.next().ok_or_else(invalid)?.to_ascii_uppercase();
    let mut semitone = SEMITONE_MAP
        .iter()
        .find(|(c, _)| *c == letter)
        .map(|(_, s)| *s)
        .ok_or_else(invalid)?;

    let rest = chars.as_str();
    let octave_start = rest
        .find(|c: char| c == '-' || c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (accidentals, octave_str) = rest.split_at(octave_start);

    for accidental in accidentals.chars() {
        match accidental {
            '#' => semitone += 1,
            'b' => semitone -= 1,
            _ => return Err(invalid()),
        }
    }

    let octave: i32 = octave_str.parse().map_err(|_| invalid())?;
    let key = (octave + 1) * 12 + semitone;

    if !(0..=MIDI_KEY_MAX as i32).contains(&key) {
        return Err(PitchError::OutOfRange(name.to_string()));
    }
    Ok(key as u8)
}
