// Event ordering - Deterministic start-time order for sanitized sequences

use crate::events::EventCollection;
use crate::timing::{to_ticks, TimeBase};

use super::sanitize::LoopEvent;

/// Stable sort by integer start ticks
///
/// Events with equal starts keep their input order. Start times that cannot
/// be resolved sort after everything else.
pub fn order_events<E: LoopEvent>(events: &mut [E], base: &TimeBase) {
    events.sort_by_cached_key(|event| to_ticks(event.start_time(), base).unwrap_or(u64::MAX));
}

/// Order a sanitized collection
///
/// Only flat sequences are re-sorted; drum lanes are left as generated.
pub fn order_collection(collection: &mut EventCollection, base: &TimeBase) {
    if let EventCollection::Flat(events) = collection {
        order_events(events, base);
    }
}
