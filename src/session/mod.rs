// Session - Latest sanitized pattern per role, track selection and export
// Generator responses enter here and leave as MIDI bundles

pub mod models;
pub mod store;

pub use models::{Generation, PatternRole};
pub use store::{PatternSession, SessionError, SessionResult};
