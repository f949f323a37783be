// MIDI Export - Serialize sanitized events to Standard MIDI Files using midly
// Rescales ticks from the editing resolution to the file's own PPQ

use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::PatternEvent;
use crate::timing::{rescale_ticks, to_ticks, TimeBase, DEFAULT_BPM, DEFAULT_INTERNAL_PPQ};

use super::pitch::note_name_to_midi;

/// Largest tick a MIDI delta can express (28 bits)
const MAX_MIDI_TICK: u128 = 0x0FFF_FFFF;

/// Highest metrical PPQ a MIDI header can carry (15 bits)
const MAX_HEADER_PPQ: u16 = 0x7FFF;

/// Errors that can occur while writing a MIDI file
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid PPQ {0}: must be between 1 and 32767")]
    InvalidPpq(u32),

    #[error("Invalid MIDI channel {0}: must be between 0 and 15")]
    InvalidChannel(u8),

    #[error("Invalid tempo {0} BPM")]
    InvalidTempo(f64),

    #[error("Tick {0} exceeds the MIDI delta-time range")]
    TickOverflow(u128),

    #[error("Failed to write MIDI: {0}")]
    Write(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// MIDI export options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiExportOptions {
    /// Resolution the event times are written in
    pub internal_ppq: u32,

    /// Pulses per quarter note of the output file
    pub ppq: u16,

    /// Tempo that clock-time values (`"1.5s"`) resolve against
    pub tempo_bpm: f64,

    /// Write a tempo meta event
    pub include_tempo: bool,

    /// Write a 4/4 time signature meta event
    pub include_time_signature: bool,

    /// MIDI channel (0-indexed; 9 is General MIDI percussion)
    pub channel: u8,

    /// Loop end in internal ticks; the track ends no earlier than this
    pub loop_end_ticks: Option<u64>,
}

impl Default for MidiExportOptions {
    fn default() -> Self {
        MidiExportOptions {
            internal_ppq: DEFAULT_INTERNAL_PPQ,
            ppq: 480,
            tempo_bpm: DEFAULT_BPM,
            include_tempo: false,
            include_time_signature: false,
            channel: 0,
            loop_end_ticks: None,
        }
    }
}

impl MidiExportOptions {
    fn validate(&self) -> ExportResult<()> {
        if self.internal_ppq == 0 {
            return Err(ExportError::InvalidPpq(self.internal_ppq));
        }
        if self.ppq == 0 || self.ppq > MAX_HEADER_PPQ {
            return Err(ExportError::InvalidPpq(self.ppq as u32));
        }
        if self.channel > 15 {
            return Err(ExportError::InvalidChannel(self.channel));
        }
        if !(self.tempo_bpm.is_finite() && self.tempo_bpm > 0.0) {
            return Err(ExportError::InvalidTempo(self.tempo_bpm));
        }
        Ok(())
    }

    fn time_base(&self) -> TimeBase {
        TimeBase::new(self.internal_ppq, self.tempo_bpm)
    }

    /// Internal ticks to output ticks, checked against the MIDI range
    fn export_ticks(&self, ticks: u64) -> ExportResult<u32> {
        let scaled = rescale_ticks(ticks, self.internal_ppq, self.ppq as u32);
        if scaled > MAX_MIDI_TICK {
            return Err(ExportError::TickOverflow(scaled));
        }
        Ok(scaled as u32)
    }
}

/// One single-pitch note at output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub key: u8,
    pub start: u32,
    pub duration: u32,
    pub velocity: u8,
}

impl NoteRecord {
    pub fn end(&self) -> u32 {
        self.start + self.duration
    }
}

/// Map a (0, 1] velocity to MIDI 1..=127
///
/// Non-finite input maps to 1; a note-on with velocity 0 would be a note-off.
pub fn to_midi_velocity(velocity: f64) -> u8 {
    if !velocity.is_finite() {
        return 1;
    }
    (velocity.clamp(0.0, 1.0) * 127.0).round().clamp(1.0, 127.0) as u8
}

/// Expand events into note records at output resolution
///
/// Chords become one record per pitch sharing start, duration and velocity.
/// Records keep input order. Events whose times cannot be resolved, and
/// pitches that are not valid note names, are skipped.
pub fn note_records(
    events: &[PatternEvent],
    options: &MidiExportOptions,
) -> ExportResult<Vec<NoteRecord>> {
    options.validate()?;
    let base = options.time_base();
    let mut records = Vec::new();

    for event in events {
        let (Ok(start), Ok(duration)) = (to_ticks(event.time(), &base), to_ticks(event.duration(), &base))
        else {
            log::warn!("Skipping event with unresolvable timing at {:?}", event.time());
            continue;
        };

        let start = options.export_ticks(start)?;
        // Keep note-off strictly after note-on
        let duration = options.export_ticks(duration)?.max(1);
        if start as u128 + duration as u128 > MAX_MIDI_TICK {
            return Err(ExportError::TickOverflow(start as u128 + duration as u128));
        }
        let velocity = to_midi_velocity(event.velocity());

        for pitch in event.pitches() {
            match note_name_to_midi(pitch) {
                Ok(key) => records.push(NoteRecord {
                    key,
                    start,
                    duration,
                    velocity,
                }),
                Err(e) => log::warn!("Skipping note: {}", e),
            }
        }
    }

    Ok(records)
}

/// Export events as a single named track
///
/// Returns the MIDI file as a Vec<u8>: a conductor track carrying optional
/// tempo and time signature, followed by the note track.
pub fn export_track(
    events: &[PatternEvent],
    track_name: &str,
    options: &MidiExportOptions,
) -> ExportResult<Vec<u8>> {
    let records = note_records(events, options)?;
    let loop_end = options
        .loop_end_ticks
        .map(|ticks| options.export_ticks(ticks))
        .transpose()?;

    let header = Header {
        format: Format::Parallel,
        timing: Timing::Metrical(options.ppq.into()),
    };

    let mut meta_track = Track::new();
    if options.include_tempo {
        add_tempo(&mut meta_track, 0, options.tempo_bpm);
    }
    if options.include_time_signature {
        add_time_signature(&mut meta_track, 0);
    }
    add_end_of_track(&mut meta_track, 0);

    let note_track = create_note_track(&records, track_name, options.channel, loop_end);

    let smf = Smf {
        header,
        tracks: vec![meta_track, note_track],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| ExportError::Write(e.to_string()))?;

    log::debug!(
        "Exported track {:?}: {} notes, {} bytes",
        track_name,
        records.len(),
        bytes.len()
    );
    Ok(bytes)
}

/// Serialize events with only the tick rescaling and a track name
pub fn serialize_track(
    events: &[PatternEvent],
    track_name: &str,
    internal_ppq: u32,
    export_ppq: u16,
) -> ExportResult<Vec<u8>> {
    let options = MidiExportOptions {
        internal_ppq,
        ppq: export_ppq,
        ..MidiExportOptions::default()
    };
    export_track(events, track_name, &options)
}

/// Build the note track: name, note on/off pairs, end of track
fn create_note_track<'a>(
    records: &[NoteRecord],
    track_name: &'a str,
    channel: u8,
    loop_end: Option<u32>,
) -> Track<'a> {
    let mut track = Track::new();
    add_track_name(&mut track, 0, track_name);

    // (tick, note-off before note-on, event)
    let mut events: Vec<(u32, u8, TrackEventKind<'a>)> = Vec::with_capacity(records.len() * 2);

    for record in records {
        events.push((
            record.start,
            1,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOn {
                    key: record.key.into(),
                    vel: record.velocity.into(),
                },
            },
        ));
        events.push((
            record.end(),
            0,
            TrackEventKind::Midi {
                channel: channel.into(),
                message: MidiMessage::NoteOff {
                    key: record.key.into(),
                    vel: 0u8.into(),
                },
            },
        ));
    }

    // Stable, so simultaneous notes keep record order
    events.sort_by_key(|(tick, order, _)| (*tick, *order));

    let mut last_tick = 0;
    for (tick, _, kind) in events {
        track.push(TrackEvent {
            delta: (tick - last_tick).into(),
            kind,
        });
        last_tick = tick;
    }

    let end_tick = loop_end.map_or(last_tick, |end| end.max(last_tick));
    add_end_of_track(&mut track, end_tick - last_tick);

    track
}

/// Add track name to track
fn add_track_name<'a>(track: &mut Track<'a>, delta: u32, name: &'a str) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    });
}

/// Add tempo meta message
fn add_tempo(track: &mut Track<'_>, delta: u32, bpm: f64) {
    // Microseconds per quarter note, 24-bit
    let us_per_quarter = (60_000_000.0 / bpm).round().clamp(1.0, 0xFF_FFFF as f64) as u32;

    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter.into())),
    });
}

/// Add a 4/4 time signature meta message
fn add_time_signature(track: &mut Track<'_>, delta: u32) {
    // 4 beats, 2^2 = quarter note, 24 clocks per click, 8 32nds per quarter
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(4, 2, 24, 8)),
    });
}

/// Add end of track message
fn add_end_of_track(track: &mut Track<'_>, delta: u32) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
}
