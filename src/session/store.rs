// Pattern session - Per-role sanitized patterns and track selection
// Holds each role's latest generation until it is replaced or cleared

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::events::{ingest_collection, DrumKit, EventCollection, PatternEvent};
use crate::export::{archive_name, export_track, ExportBundle, ExportError, ExportedFile, TrackId};
use crate::looping::{order_collection, sanitize_with_report};
use crate::timing::LoopGrid;

use super::models::{Generation, PatternRole};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid data format for {0} received from generator")]
    MissingRole(PatternRole),

    #[error("Unexpected {role} data shape: expected {expected}")]
    UnexpectedShape {
        role: PatternRole,
        expected: &'static str,
    },

    #[error("{0} generation requires a chord progression")]
    MissingHarmonicContext(PatternRole),

    #[error("Invalid loop length: {0} bars")]
    InvalidLength(u32),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}

pub type SessionResult<T> = Result<T, SessionError>;

pub struct PatternSession {
    config: SessionConfig,
    generations: BTreeMap<PatternRole, Generation>,
    selected: BTreeSet<TrackId>,
    playback_bars: u32,
}

impl PatternSession {
    pub fn new(config: SessionConfig) -> Self {
        let playback_bars = config.loop_bars;
        PatternSession {
            config,
            generations: BTreeMap::new(),
            selected: BTreeSet::new(),
            playback_bars,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Check that a role can be generated now
    pub fn ensure_ready(&self, role: PatternRole) -> SessionResult<()> {
        if role.requires_harmonic_context() && self.harmonic_context().is_none() {
            return Err(SessionError::MissingHarmonicContext(role));
        }
        Ok(())
    }

    /// Sanitize, order and store a generator response for `role`
    ///
    /// The response is an object wrapping the role's data under its key
    /// (e.g. `{"bass": [...]}`). Individual bad events are dropped; only a
    /// missing key or a shape that does not fit the role is an error.
    pub fn apply_generation(
        &mut self,
        role: PatternRole,
        response: &Value,
        length_in_bars: u32,
    ) -> SessionResult<&Generation> {
        if length_in_bars == 0 {
            return Err(SessionError::InvalidLength(length_in_bars));
        }

        let raw = response
            .get(role.key())
            .ok_or(SessionError::MissingRole(role))?;

        let collection = ingest_collection(raw);
        let expected = if role.expects_drum_kit() {
            "a kick/snare/hihat mapping"
        } else {
            "a list of events"
        };
        let shape_matches = match &collection {
            EventCollection::Drums(_) => role.expects_drum_kit(),
            EventCollection::Flat(_) => !role.expects_drum_kit(),
            EventCollection::Unrecognized(_) => false,
        };
        if !shape_matches {
            log::warn!("Ignoring {} data with unexpected shape: {}", role, raw);
            return Err(SessionError::UnexpectedShape { role, expected });
        }

        let base = self.config.time_base();
        let grid = LoopGrid::with_base(length_in_bars, base);
        let (mut sanitized, report) = sanitize_with_report(&collection, &grid);
        order_collection(&mut sanitized, &base);

        log::info!(
            "Sanitized {} for {} bars: {} kept, {} truncated, {} discarded",
            role,
            length_in_bars,
            report.kept,
            report.truncated,
            report.discarded()
        );

        self.selected.extend(role.track_ids().iter().copied());
        self.playback_bars = length_in_bars;

        let generation = Generation::new(role, length_in_bars, sanitized, report);
        self.generations.insert(role, generation);
        Ok(&self.generations[&role])
    }

    pub fn generation(&self, role: PatternRole) -> Option<&Generation> {
        self.generations.get(&role)
    }

    pub fn drums(&self) -> Option<&DrumKit> {
        self.generation(PatternRole::Drums)
            .and_then(|g| g.collection.as_drums())
    }

    /// Flat events of a non-drum role
    pub fn events(&self, role: PatternRole) -> Option<&[PatternEvent]> {
        self.generation(role).and_then(|g| g.collection.as_flat())
    }

    /// Chord progression other roles are derived from
    pub fn harmonic_context(&self) -> Option<&[PatternEvent]> {
        self.events(PatternRole::Chords)
    }

    /// Length of the most recent generation
    pub fn playback_bars(&self) -> u32 {
        self.playback_bars
    }

    pub fn selected_tracks(&self) -> &BTreeSet<TrackId> {
        &self.selected
    }

    pub fn select_track(&mut self, track: TrackId) {
        self.selected.insert(track);
    }

    /// Flip a track's selection, returning whether it is now selected
    pub fn toggle_track(&mut self, track: TrackId) -> bool {
        if self.selected.remove(&track) {
            false
        } else {
            self.selected.insert(track);
            true
        }
    }

    /// Drop all generated data (track selection is kept)
    pub fn clear(&mut self) {
        self.generations.clear();
    }

    pub fn has_content(&self) -> bool {
        !self.generations.is_empty()
    }

    /// Events a track would export
    pub fn track_events(&self, track: TrackId) -> Option<Vec<PatternEvent>> {
        match track {
            TrackId::FullDrums => {
                let kit = self.drums()?;
                Some(kit.all_notes().into_iter().map(PatternEvent::Note).collect())
            }
            TrackId::Kick | TrackId::Snare | TrackId::Hihat => {
                let kit = self.drums()?;
                let role = track.drum_role()?;
                Some(kit.lane(role).iter().cloned().map(PatternEvent::Note).collect())
            }
            _ => self
                .events(PatternRole::for_track(track))
                .map(|events| events.to_vec()),
        }
    }

    /// Export every selected track that has events
    pub fn export_selected(&self) -> SessionResult<ExportBundle> {
        let base = self.config.time_base();
        let tempo = self.config.tempo_bpm;
        let mut files = Vec::new();

        for &track in &self.selected {
            let Some(events) = self.track_events(track).filter(|e| !e.is_empty()) else {
                log::debug!("Skipping empty track {}", track.key());
                continue;
            };
            let loop_end = self
                .generation(PatternRole::for_track(track))
                .map(|g| LoopGrid::with_base(g.length_in_bars, base).end_ticks());

            let options = self.config.export_options(track, loop_end);
            let data = export_track(&events, track.midi_name(), &options)?;
            files.push(ExportedFile::new(track.file_name(tempo), data));
        }

        log::info!("Exported {} tracks", files.len());
        Ok(ExportBundle {
            archive_name: archive_name(tempo),
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn chords_response() -> Value {
        json!({"chords": [
            {"time": "2:0:0", "notes": ["F4", "A4", "C5"], "duration": "1m", "velocity": 0.7},
            {"time": "0:0:0", "notes": ["C4", "E4", "G4"], "duration": "1m", "velocity": 0.7},
            {"time": "3:2:0", "notes": ["G4", "B4", "D5"], "duration": "1m", "velocity": 0.7},
        ]})
    }

    fn drums_response() -> Value {
        json!({"drums": {
            "kick": [
                {"time": "1:0:0", "note": "C2", "duration": "8n", "velocity": 1.0},
                {"time": "0:0:0", "note": "C2", "duration": "8n", "velocity": 1.0},
            ],
            "snare": null,
            "hihat": [{"time": "4:0:0", "note": "F#2", "duration": "16n", "velocity": 0.5}],
        }})
    }

    #[test]
    fn test_apply_chords_sanitizes_and_orders() {
        let mut session = PatternSession::new(SessionConfig::default());
        let generation = session
            .apply_generation(PatternRole::Chords, &chords_response(), 4)
            .unwrap();

        assert_eq!(generation.report.truncated, 1);
        let events = session.events(PatternRole::Chords).unwrap();
        let times: Vec<&str> = events.iter().map(|e| e.time()).collect();
        assert_eq!(times, vec!["0:0:0", "2:0:0", "3:2:0"]);
        assert_eq!(events[2].duration(), "384i");
        assert!(session.selected_tracks().contains(&TrackId::Chords));
    }

    #[test]
    fn test_drum_lanes_default_to_empty() {
        let mut session = PatternSession::new(SessionConfig::default());
        session
            .apply_generation(PatternRole::Drums, &drums_response(), 4)
            .unwrap();

        let kit = session.drums().unwrap();
        assert_eq!(kit.kick.len(), 2);
        // Drum lanes keep generator order
        assert_eq!(kit.kick[0].time, "1:0:0");
        assert!(kit.snare.is_empty());
        assert!(kit.hihat.is_empty());
        assert_eq!(session.selected_tracks().len(), 4);
    }

    #[test]
    fn test_missing_role_key() {
        let mut session = PatternSession::new(SessionConfig::default());
        let result = session.apply_generation(PatternRole::Bass, &json!({"melody": []}), 4);
        assert!(matches!(result, Err(SessionError::MissingRole(PatternRole::Bass))));
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let mut session = PatternSession::new(SessionConfig::default());
        let flat_drums = json!({"drums": [{"time": "0:0:0", "note": "C2", "duration": "8n", "velocity": 1.0}]});
        assert!(matches!(
            session.apply_generation(PatternRole::Drums, &flat_drums, 4),
            Err(SessionError::UnexpectedShape { .. })
        ));
        assert!(matches!(
            session.apply_generation(PatternRole::Melody, &json!({"melody": "la la"}), 4),
            Err(SessionError::UnexpectedShape { .. })
        ));
        assert!(!session.has_content());
    }

    #[test]
    fn test_harmonic_context_gate() {
        let mut session = PatternSession::new(SessionConfig::default());
        assert!(session.ensure_ready(PatternRole::Drums).is_ok());
        assert!(matches!(
            session.ensure_ready(PatternRole::Bass),
            Err(SessionError::MissingHarmonicContext(PatternRole::Bass))
        ));

        session
            .apply_generation(PatternRole::Chords, &chords_response(), 4)
            .unwrap();
        assert!(session.ensure_ready(PatternRole::Bass).is_ok());
        assert_eq!(session.harmonic_context().unwrap().len(), 3);
    }

    #[test]
    fn test_regeneration_replaces_role_data() {
        let mut session = PatternSession::new(SessionConfig::default());
        session
            .apply_generation(PatternRole::Chords, &chords_response(), 4)
            .unwrap();
        let first_id = session.generation(PatternRole::Chords).unwrap().id;

        let shorter = json!({"chords": [
            {"time": "0:0:0", "notes": ["A3", "C4", "E4"], "duration": "2m", "velocity": 0.6},
        ]});
        session
            .apply_generation(PatternRole::Chords, &shorter, 2)
            .unwrap();

        let generation = session.generation(PatternRole::Chords).unwrap();
        assert_ne!(generation.id, first_id);
        assert_eq!(generation.length_in_bars, 2);
        assert_eq!(session.playback_bars(), 2);
        assert_eq!(session.events(PatternRole::Chords).unwrap().len(), 1);
    }

    #[test]
    fn test_export_selected_skips_empty_tracks() {
        let mut session = PatternSession::new(SessionConfig::default());
        session
            .apply_generation(PatternRole::Drums, &drums_response(), 4)
            .unwrap();
        session
            .apply_generation(PatternRole::Chords, &chords_response(), 4)
            .unwrap();

        let bundle = session.export_selected().unwrap();
        let names: Vec<&str> = bundle.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Kick_120bpm.mid", "Drums_Full_Loop_120bpm.mid", "Chords_120bpm.mid"]
        );
        assert_eq!(bundle.archive_name, "midi_kit_120bpm.zip");
        assert!(bundle.files.iter().all(|f| f.data.starts_with(b"MThd")));
    }

    /// Absolute (tick, is_note_on) of every note message, plus the track end
    fn note_ticks(bytes: &[u8]) -> (Vec<(u32, bool)>, u32) {
        use midly::{MidiMessage, Smf, TrackEventKind};

        let smf = Smf::parse(bytes).unwrap();
        let mut tick = 0;
        let mut notes = Vec::new();
        for event in &smf.tracks[1] {
            tick += event.delta.as_int();
            if let TrackEventKind::Midi { message, .. } = event.kind {
                match message {
                    MidiMessage::NoteOn { .. } => notes.push((tick, true)),
                    MidiMessage::NoteOff { .. } => notes.push((tick, false)),
                    _ => {}
                }
            }
        }
        (notes, tick)
    }

    #[test]
    fn test_clock_times_export_inside_loop_at_session_tempo() {
        let response = json!({"bass": [
            {"time": "15s", "note": "C2", "duration": "4n", "velocity": 0.9},
            {"time": "0.5", "note": "E2", "duration": "8n", "velocity": 0.9},
            {"time": "3:3:2", "note": "G2", "duration": "2n", "velocity": 0.9},
            {"time": "16s", "note": "C3", "duration": "4n", "velocity": 0.9},
        ]});

        for include_tempo in [true, false] {
            let config = SessionConfig {
                tempo_bpm: 60.0,
                include_tempo,
                ..SessionConfig::default()
            };
            let mut session = PatternSession::new(config);
            let generation = session
                .apply_generation(PatternRole::Bass, &response, 4)
                .unwrap();
            // 16 s at 60 BPM is exactly four bars
            assert_eq!(generation.report.retained(), 3);
            assert_eq!(generation.report.discarded_out_of_range, 1);

            let bundle = session.export_selected().unwrap();
            assert_eq!(bundle.files.len(), 1);

            // 3072 internal ticks at 480 PPQ
            let loop_end = 7680;
            let (notes, track_end) = note_ticks(&bundle.files[0].data);
            assert_eq!(notes.len(), 6);
            assert!(
                notes.iter().all(|&(tick, _)| tick <= loop_end),
                "note past loop end with include_tempo={}: {:?}",
                include_tempo,
                notes
            );
            assert!(notes.contains(&(15 * 480, true)));
            assert!(notes.contains(&(240, true)));
            assert_eq!(track_end, loop_end);
        }
    }

    #[test]
    fn test_toggle_track_controls_export() {
        let mut session = PatternSession::new(SessionConfig::default());
        session
            .apply_generation(PatternRole::Chords, &chords_response(), 4)
            .unwrap();

        assert!(!session.toggle_track(TrackId::Chords));
        assert!(session.export_selected().unwrap().is_empty());

        assert!(session.toggle_track(TrackId::Chords));
        assert_eq!(session.export_selected().unwrap().files.len(), 1);
    }

    #[test]
    fn test_clear_keeps_selection() {
        let mut session = PatternSession::new(SessionConfig::default());
        session
            .apply_generation(PatternRole::Chords, &chords_response(), 4)
            .unwrap();
        session.clear();

        assert!(!session.has_content());
        assert!(session.selected_tracks().contains(&TrackId::Chords));
        assert!(session.export_selected().unwrap().is_empty());
    }
}
