// Looping - Loop sanitization and post-sanitization ordering
// Guarantees every retained event starts and ends inside the loop

pub mod order;
pub mod sanitize;

pub use order::{order_collection, order_events};
pub use sanitize::{
    sanitize, sanitize_event, sanitize_events, sanitize_events_with_report, sanitize_with_base,
    sanitize_with_report, LoopEvent, SanitizeReport,
};
