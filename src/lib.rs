// Midian - Loop sanitizer and MIDI track serializer for generated patterns
// Module declarations

pub mod commands;
pub mod config;
pub mod events;
pub mod export;
pub mod looping;
pub mod pipeline;
pub mod session;
pub mod timing;

pub use config::SessionConfig;
pub use events::{EventCollection, PatternEvent};
pub use export::{export_track, serialize_track, MidiExportOptions, TrackId};
pub use looping::{order_collection, sanitize, sanitize_with_report, SanitizeReport};
pub use session::{PatternRole, PatternSession};
pub use timing::{LoopGrid, TimeBase};
