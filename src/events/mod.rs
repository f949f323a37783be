// Pattern events module
// Event data model and ingestion of generator output

pub mod ingest;
pub mod types;

pub use ingest::{ingest_collection, ingest_event, ingest_json, ingest_note, IngestError};
pub use types::{ChordEvent, DrumKit, DrumRole, EventCollection, NoteEvent, PatternEvent};
