// Pipeline tracing
// Records what each ingest, sanitize and export run did

pub mod trace;

pub use trace::{read_trace_file, TraceEntry, TraceError, TraceStage, TraceWriter};
