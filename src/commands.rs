// CLI commands
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::config::SessionConfig;
use crate::export::{write_bundle, ExportBundle, TrackId};
use crate::pipeline::{TraceEntry, TraceStage, TraceWriter};
use crate::session::{Generation, PatternRole, PatternSession};

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

impl CommandError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

/// Load the config file if given, defaults otherwise
pub fn load_config(path: Option<&Path>) -> CommandResult<SessionConfig> {
    match path {
        Some(path) => Ok(SessionConfig::load(path)?),
        None => Ok(SessionConfig::default()),
    }
}

// ==================== SANITIZE ====================

#[derive(Debug)]
pub struct SanitizeInput {
    pub role: PatternRole,

    /// Generator response JSON text
    pub response: String,

    /// Loop length; the configured loop length when absent
    pub length_in_bars: Option<u32>,
}

pub fn sanitize_command(
    config: &SessionConfig,
    input: SanitizeInput,
    trace: Option<&TraceWriter>,
) -> CommandResult<Generation> {
    let mut session = PatternSession::new(config.clone());
    let length = input.length_in_bars.unwrap_or(config.loop_bars);

    apply_response(&mut session, input.role, &input.response, length, trace)?;

    session
        .generation(input.role)
        .cloned()
        .ok_or_else(|| CommandError {
            message: format!("No {} data after sanitizing", input.role),
        })
}

// ==================== EXPORT ====================

#[derive(Debug)]
pub struct ExportInput {
    /// Generator response JSON text per role
    pub responses: Vec<(PatternRole, String)>,

    pub length_in_bars: Option<u32>,

    /// Tracks to export; every generated track when empty
    pub tracks: Vec<TrackId>,

    pub out_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct ExportOutput {
    pub bundle: ExportBundle,
    pub paths: Vec<PathBuf>,
}

pub fn export_command(
    config: &SessionConfig,
    mut input: ExportInput,
    trace: Option<&TraceWriter>,
) -> CommandResult<ExportOutput> {
    let mut session = PatternSession::new(config.clone());
    let length = input.length_in_bars.unwrap_or(config.loop_bars);

    // Chords first so dependent roles see their harmonic context
    input.responses.sort_by_key(|(role, _)| *role);
    for (role, response) in &input.responses {
        session.ensure_ready(*role)?;
        apply_response(&mut session, *role, response, length, trace)?;
    }

    if !input.tracks.is_empty() {
        for track in session.selected_tracks().clone() {
            if !input.tracks.contains(&track) {
                session.toggle_track(track);
            }
        }
        for &track in &input.tracks {
            session.select_track(track);
        }
    }

    let bundle = session.export_selected()?;
    if bundle.is_empty() {
        return Err(CommandError {
            message: "No tracks with events to export".to_string(),
        });
    }

    let paths = write_bundle(&bundle, &input.out_dir)?;
    record(trace, TraceEntry::exported(&bundle));

    Ok(ExportOutput { bundle, paths })
}

/// Read a response file into text
pub fn read_response(path: &Path) -> CommandResult<String> {
    fs::read_to_string(path).map_err(|e| CommandError {
        message: format!("Failed to read {}: {}", path.display(), e),
    })
}

fn apply_response(
    session: &mut PatternSession,
    role: PatternRole,
    response: &str,
    length_in_bars: u32,
    trace: Option<&TraceWriter>,
) -> CommandResult<()> {
    let value: Value = serde_json::from_str(response)?;
    record(
        trace,
        TraceEntry::new(TraceStage::Ingest, format!("{} bytes", response.len())).for_role(role),
    );

    let generation = session.apply_generation(role, &value, length_in_bars)?;
    record(
        trace,
        TraceEntry::sanitized(role, length_in_bars, &generation.report),
    );
    Ok(())
}

/// Tracing failures are logged, never fatal
fn record(trace: Option<&TraceWriter>, entry: TraceEntry) {
    if let Some(writer) = trace {
        if let Err(e) = writer.write(&entry) {
            log::warn!("Failed to write trace to {}: {}", writer.path().display(), e);
        }
    }
}
