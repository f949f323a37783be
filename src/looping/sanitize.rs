// Loop Sanitizer - Forces events to fit exactly inside a fixed-length loop
// All comparisons happen in integer ticks at the loop's resolution

use serde::{Deserialize, Serialize};

use crate::events::{ChordEvent, DrumKit, DrumRole, EventCollection, NoteEvent, PatternEvent};
use crate::timing::{tick_string, to_ticks, LoopGrid};

/// An event with a start time and a length that the sanitizer can rewrite
pub trait LoopEvent: Clone {
    fn start_time(&self) -> &str;

    fn length(&self) -> &str;

    /// Copy of this event with its duration replaced
    fn with_duration(&self, duration: String) -> Self;
}

impl LoopEvent for NoteEvent {
    fn start_time(&self) -> &str {
        &self.time
    }

    fn length(&self) -> &str {
        &self.duration
    }

    fn with_duration(&self, duration: String) -> Self {
        NoteEvent {
            duration,
            ..self.clone()
        }
    }
}

impl LoopEvent for ChordEvent {
    fn start_time(&self) -> &str {
        &self.time
    }

    fn length(&self) -> &str {
        &self.duration
    }

    fn with_duration(&self, duration: String) -> Self {
        ChordEvent {
            duration,
            ..self.clone()
        }
    }
}

impl LoopEvent for PatternEvent {
    fn start_time(&self) -> &str {
        self.time()
    }

    fn length(&self) -> &str {
        self.duration()
    }

    fn with_duration(&self, duration: String) -> Self {
        match self {
            PatternEvent::Note(note) => PatternEvent::Note(note.with_duration(duration)),
            PatternEvent::Chord(chord) => PatternEvent::Chord(chord.with_duration(duration)),
        }
    }
}

/// Tally of what the sanitizer did to a collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizeReport {
    /// Events emitted unchanged
    pub kept: usize,

    /// Events emitted with a shortened duration
    pub truncated: usize,

    /// Events whose time or duration could not be resolved
    pub discarded_unparseable: usize,

    /// Events starting at or after the loop end
    pub discarded_out_of_range: usize,

    /// Events with no length left
    pub discarded_empty: usize,
}

impl SanitizeReport {
    pub fn retained(&self) -> usize {
        self.kept + self.truncated
    }

    pub fn discarded(&self) -> usize {
        self.discarded_unparseable + self.discarded_out_of_range + self.discarded_empty
    }

    pub fn total(&self) -> usize {
        self.retained() + self.discarded()
    }
}

enum Outcome<E> {
    Kept(E),
    Truncated(E),
    Unparseable,
    OutOfRange,
    Empty,
}

fn classify<E: LoopEvent>(event: &E, grid: &LoopGrid, loop_end_ticks: u64) -> Outcome<E> {
    let Ok(start_ticks) = to_ticks(event.start_time(), &grid.base) else {
        log::debug!("Discarding event with unparseable time {:?}", event.start_time());
        return Outcome::Unparseable;
    };

    if start_ticks >= loop_end_ticks {
        log::debug!(
            "Discarding event at tick {} (loop ends at {})",
            start_ticks,
            loop_end_ticks
        );
        return Outcome::OutOfRange;
    }

    let Ok(duration_ticks) = to_ticks(event.length(), &grid.base) else {
        log::debug!("Discarding event with unparseable duration {:?}", event.length());
        return Outcome::Unparseable;
    };

    if duration_ticks == 0 {
        return Outcome::Empty;
    }

    if start_ticks.saturating_add(duration_ticks) > loop_end_ticks {
        let new_duration = loop_end_ticks - start_ticks;
        if new_duration == 0 {
            return Outcome::Empty;
        }
        return Outcome::Truncated(event.with_duration(tick_string(new_duration)));
    }

    Outcome::Kept(event.clone())
}

/// Sanitize a single event, or `None` if it cannot belong to the loop
pub fn sanitize_event<E: LoopEvent>(event: &E, grid: &LoopGrid) -> Option<E> {
    match classify(event, grid, grid.end_ticks()) {
        Outcome::Kept(event) | Outcome::Truncated(event) => Some(event),
        _ => None,
    }
}

/// Sanitize a sequence, recording outcomes into `report`
///
/// Retained events keep their input order. Truncated durations are written
/// as exact tick strings so no rounding is reintroduced.
pub fn sanitize_events_with_report<E: LoopEvent>(
    events: &[E],
    grid: &LoopGrid,
    report: &mut SanitizeReport,
) -> Vec<E> {
    let loop_end_ticks = grid.end_ticks();
    let mut sanitized = Vec::with_capacity(events.len());

    for event in events {
        match classify(event, grid, loop_end_ticks) {
            Outcome::Kept(event) => {
                report.kept += 1;
                sanitized.push(event);
            }
            Outcome::Truncated(event) => {
                report.truncated += 1;
                sanitized.push(event);
            }
            Outcome::Unparseable => report.discarded_unparseable += 1,
            Outcome::OutOfRange => report.discarded_out_of_range += 1,
            Outcome::Empty => report.discarded_empty += 1,
        }
    }

    sanitized
}

pub fn sanitize_events<E: LoopEvent>(events: &[E], grid: &LoopGrid) -> Vec<E> {
    sanitize_events_with_report(events, grid, &mut SanitizeReport::default())
}

/// Sanitize every sequence of a collection against `grid`
pub fn sanitize_with_report(
    collection: &EventCollection,
    grid: &LoopGrid,
) -> (EventCollection, SanitizeReport) {
    let mut report = SanitizeReport::default();

    let sanitized = match collection {
        EventCollection::Flat(events) => {
            EventCollection::Flat(sanitize_events_with_report(events, grid, &mut report))
        }
        EventCollection::Drums(kit) => {
            let mut sanitized = DrumKit::default();
            for role in DrumRole::ALL {
                *sanitized.lane_mut(role) =
                    sanitize_events_with_report(kit.lane(role), grid, &mut report);
            }
            EventCollection::Drums(sanitized)
        }
        EventCollection::Unrecognized(value) => EventCollection::Unrecognized(value.clone()),
    };

    (sanitized, report)
}

pub fn sanitize_with_base(collection: &EventCollection, grid: &LoopGrid) -> EventCollection {
    sanitize_with_report(collection, grid).0
}

/// Sanitize a collection for a loop of `length_in_bars` at the default resolution
pub fn sanitize(collection: &EventCollection, length_in_bars: u32) -> EventCollection {
    sanitize_with_base(collection, &LoopGrid::new(length_in_bars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::TimeBase;

    fn note(time: &str, duration: &str) -> NoteEvent {
        NoteEvent::new(time, "C4", duration, 0.8)
    }

    #[test]
    fn test_loop_end_matches_transport_notation() {
        let grid = LoopGrid::new(4);
        assert_eq!(grid.end_ticks(), to_ticks("4:0:0", &grid.base).unwrap());
    }

    #[test]
    fn test_event_inside_loop_is_unchanged() {
        let grid = LoopGrid::new(4);
        let event = note("1:2:0", "4n");
        assert_eq!(sanitize_event(&event, &grid), Some(event));
    }

    #[test]
    fn test_overhanging_event_is_truncated_to_exact_ticks() {
        let grid = LoopGrid::new(4);
        let event = note("3:3:2", "4n");

        let sanitized = sanitize_event(&event, &grid).unwrap();
        assert_eq!(sanitized.duration, "96i");
        assert_eq!(sanitized.time, "3:3:2");
        assert_eq!(sanitized.note, "C4");

        let start = to_ticks(&sanitized.time, &grid.base).unwrap();
        let length = to_ticks(&sanitized.duration, &grid.base).unwrap();
        assert_eq!(start + length, 3072);
    }

    #[test]
    fn test_event_at_loop_end_is_discarded() {
        let grid = LoopGrid::new(4);
        assert_eq!(sanitize_event(&note("4:0:0", "16n"), &grid), None);
        assert_eq!(sanitize_event(&note("7:0:0", "16n"), &grid), None);
    }

    #[test]
    fn test_whole_loop_duration_from_start() {
        let grid = LoopGrid::new(2);
        let sanitized = sanitize_event(&note("0:0:0", "4m"), &grid).unwrap();
        assert_eq!(sanitized.duration, "1536i");
    }

    #[test]
    fn test_event_ending_exactly_on_boundary_is_kept() {
        let grid = LoopGrid::new(1);
        let event = note("0:3:0", "4n");
        assert_eq!(sanitize_event(&event, &grid), Some(event));
    }

    #[test]
    fn test_unparseable_and_empty_events_are_discarded() {
        let grid = LoopGrid::new(4);
        let events = vec![
            note("soon", "4n"),
            note("0:0:0", "a while"),
            note("0:0:0", "0i"),
            note("0:1:0", "8n"),
        ];

        let mut report = SanitizeReport::default();
        let sanitized = sanitize_events_with_report(&events, &grid, &mut report);

        assert_eq!(sanitized, vec![note("0:1:0", "8n")]);
        assert_eq!(report.discarded_unparseable, 2);
        assert_eq!(report.discarded_empty, 1);
        assert_eq!(report.kept, 1);
        assert_eq!(report.total(), 4);
    }

    #[test]
    fn test_chord_truncation_keeps_pitches() {
        let grid = LoopGrid::new(1);
        let chord = ChordEvent::new("0:2:0", ["C4", "E4", "G4"], "1m", 0.6);

        let sanitized = sanitize_event(&PatternEvent::Chord(chord), &grid).unwrap();
        let PatternEvent::Chord(sanitized) = sanitized else {
            panic!("Expected chord");
        };
        assert_eq!(sanitized.notes, vec!["C4", "E4", "G4"]);
        assert_eq!(sanitized.duration, "384i");
        assert_eq!(sanitized.velocity, 0.6);
    }

    #[test]
    fn test_drum_kit_lanes_sanitized_independently() {
        let kit = DrumKit {
            kick: vec![note("0:0:0", "8n"), note("4:0:0", "8n")],
            snare: Vec::new(),
            hihat: vec![note("3:3:3", "8n")],
        };

        let (sanitized, report) = sanitize_with_report(&EventCollection::Drums(kit), &LoopGrid::new(4));
        let EventCollection::Drums(sanitized) = sanitized else {
            panic!("Expected drum kit");
        };
        assert_eq!(sanitized.kick.len(), 1);
        assert!(sanitized.snare.is_empty());
        assert_eq!(sanitized.hihat[0].duration, "48i");
        assert_eq!(report.truncated, 1);
        assert_eq!(report.discarded_out_of_range, 1);
    }

    #[test]
    fn test_unrecognized_collection_passes_through() {
        let value = serde_json::json!({"tempo": 120});
        let collection = EventCollection::Unrecognized(value.clone());
        assert_eq!(sanitize(&collection, 4), EventCollection::Unrecognized(value));
    }

    #[test]
    fn test_zero_length_loop_retains_nothing() {
        let collection = EventCollection::Flat(vec![note("0:0:0", "4n").into()]);
        assert_eq!(sanitize(&collection, 0), EventCollection::Flat(Vec::new()));
    }

    #[test]
    fn test_resolution_comes_from_grid() {
        let grid = LoopGrid::with_base(1, TimeBase::new(480, 120.0));
        let sanitized = sanitize_event(&note("0:3:2", "4n"), &grid).unwrap();
        // 1920 - 1680
        assert_eq!(sanitized.duration, "240i");
    }

    #[test]
    fn test_sanitize_is_idempotent_for_truncated_events() {
        let collection = EventCollection::Flat(vec![
            note("3:3:2", "2n").into(),
            note("0:0:0", "16n").into(),
        ]);
        let once = sanitize(&collection, 4);
        assert_eq!(sanitize(&once, 4), once);
    }
}
