// Event ingestion
// Lenient conversion of untrusted generator JSON into typed event collections

use serde_json::{Map, Value};
use thiserror::Error;

use super::types::{ChordEvent, DrumKit, DrumRole, EventCollection, NoteEvent, PatternEvent};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Parse JSON text and ingest it as a collection
///
/// Only malformed JSON is an error; structurally odd content degrades to
/// dropped events or an `Unrecognized` collection.
pub fn ingest_json(text: &str) -> Result<EventCollection, IngestError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(ingest_collection(&value))
}

/// Decide the collection shape and ingest every event in it
///
/// An object exposing any drum-role key is a drum kit, an array is a flat
/// sequence, anything else is carried through unchanged.
pub fn ingest_collection(value: &Value) -> EventCollection {
    match value {
        Value::Object(map) if is_drum_mapping(map) => {
            let mut kit = DrumKit::default();
            for role in DrumRole::ALL {
                *kit.lane_mut(role) = ingest_lane(map.get(role.key()));
            }
            EventCollection::Drums(kit)
        }
        Value::Array(items) => {
            let events: Vec<PatternEvent> = items.iter().filter_map(ingest_event).collect();
            if events.len() < items.len() {
                log::debug!(
                    "Dropped {} malformed events while ingesting",
                    items.len() - events.len()
                );
            }
            EventCollection::Flat(events)
        }
        other => EventCollection::Unrecognized(other.clone()),
    }
}

fn is_drum_mapping(map: &Map<String, Value>) -> bool {
    DrumRole::ALL.iter().any(|role| map.contains_key(role.key()))
}

/// A drum lane; null, missing or non-array values become empty
fn ingest_lane(value: Option<&Value>) -> Vec<NoteEvent> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(ingest_note).collect(),
        _ => Vec::new(),
    }
}

/// Ingest a note or chord, or `None` if the entry is unusable
pub fn ingest_event(value: &Value) -> Option<PatternEvent> {
    let object = value.as_object()?;
    if object.get("note").is_some_and(Value::is_string) {
        return ingest_note(value).map(PatternEvent::Note);
    }
    ingest_chord(object).map(PatternEvent::Chord)
}

/// Ingest a single-pitch event
pub fn ingest_note(value: &Value) -> Option<NoteEvent> {
    let object = value.as_object()?;
    let (time, duration, velocity) = timing_fields(object)?;
    let Some(note) = object.get("note").and_then(Value::as_str) else {
        log::debug!("Dropping event without a note name: {}", value);
        return None;
    };

    Some(NoteEvent {
        time,
        note: note.to_string(),
        duration,
        velocity,
    })
}

fn ingest_chord(object: &Map<String, Value>) -> Option<ChordEvent> {
    let (time, duration, velocity) = timing_fields(object)?;
    let Some(items) = object.get("notes").and_then(Value::as_array) else {
        log::debug!("Dropping event with neither note nor notes");
        return None;
    };

    let notes: Option<Vec<String>> = items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect();

    match notes {
        Some(notes) if !notes.is_empty() => Some(ChordEvent {
            time,
            notes,
            duration,
            velocity,
        }),
        _ => {
            log::debug!("Dropping chord with an empty or non-text pitch list");
            None
        }
    }
}

/// `time` and `duration` must be strings, `velocity` a number
fn timing_fields(object: &Map<String, Value>) -> Option<(String, String, f64)> {
    let time = object.get("time").and_then(Value::as_str);
    let duration = object.get("duration").and_then(Value::as_str);
    let velocity = object
        .get("velocity")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite());

    match (time, duration, velocity) {
        (Some(time), Some(duration), Some(velocity)) => {
            Some((time.to_string(), duration.to_string(), velocity))
        }
        _ => {
            log::debug!("Dropping event with missing or non-text time fields");
            None
        }
    }
}
