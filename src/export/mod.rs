// Export - Track Serializer and download bundle
// Converts sanitized events into Standard MIDI Files, one per selected track

pub mod bundle;
pub mod midi;
pub mod pitch;
pub mod tracks;

pub use bundle::{calculate_sha256, write_bundle, ExportBundle, ExportedFile};
pub use midi::{
    export_track, note_records, serialize_track, to_midi_velocity, ExportError, ExportResult,
    MidiExportOptions, NoteRecord,
};
pub use pitch::{note_name_to_midi, PitchError};
pub use tracks::{archive_name, TrackId, DRUM_CHANNEL, MELODIC_CHANNEL};
