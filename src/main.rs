//! Midian CLI - sanitize generated patterns and export them as MIDI

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use midian_lib::commands::{self, CommandResult, ExportInput, SanitizeInput};
use midian_lib::export::TrackId;
use midian_lib::pipeline::TraceWriter;
use midian_lib::session::PatternRole;

#[derive(Parser)]
#[command(name = "midian")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Session config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Append a JSONL trace of each stage to this file
    #[arg(long, global = true)]
    trace: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sanitize one generator response and print the result as JSON
    Sanitize {
        /// Pattern role (drums, chords, melody, bass, layers)
        #[arg(short, long, value_parser = parse_role)]
        role: PatternRole,

        /// Generator response file
        #[arg(short, long)]
        input: PathBuf,

        /// Loop length in bars
        #[arg(short, long)]
        bars: Option<u32>,

        /// Pretty-print the output JSON
        #[arg(short, long)]
        pretty: bool,
    },

    /// Sanitize generator responses and write one MIDI file per track
    Export {
        /// Response file per role, as ROLE=PATH (repeatable)
        #[arg(long = "part", required = true, value_parser = parse_part)]
        parts: Vec<(PatternRole, PathBuf)>,

        /// Loop length in bars
        #[arg(short, long)]
        bars: Option<u32>,

        /// Track to export (repeatable); all generated tracks by default
        #[arg(long = "track", value_parser = parse_track)]
        tracks: Vec<TrackId>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
}

fn parse_role(value: &str) -> Result<PatternRole, String> {
    PatternRole::from_key(value).ok_or_else(|| format!("unknown role '{}'", value))
}

fn parse_track(value: &str) -> Result<TrackId, String> {
    TrackId::from_key(value).ok_or_else(|| format!("unknown track '{}'", value))
}

fn parse_part(value: &str) -> Result<(PatternRole, PathBuf), String> {
    let (role, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ROLE=PATH, got '{}'", value))?;
    Ok((parse_role(role)?, PathBuf::from(path)))
}

fn run(cli: Cli) -> CommandResult<()> {
    let config = commands::load_config(cli.config.as_deref())?;
    let trace = cli.trace.map(TraceWriter::new);

    match cli.command {
        Commands::Sanitize {
            role,
            input,
            bars,
            pretty,
        } => {
            let input = SanitizeInput {
                role,
                response: commands::read_response(&input)?,
                length_in_bars: bars,
            };
            let generation = commands::sanitize_command(&config, input, trace.as_ref())?;
            let json = if pretty {
                serde_json::to_string_pretty(&generation)?
            } else {
                serde_json::to_string(&generation)?
            };
            println!("{}", json);
        }
        Commands::Export {
            parts,
            bars,
            tracks,
            out,
        } => {
            let mut responses = Vec::with_capacity(parts.len());
            for (role, path) in parts {
                responses.push((role, commands::read_response(&path)?));
            }
            let input = ExportInput {
                responses,
                length_in_bars: bars,
                tracks,
                out_dir: out,
            };
            let output = commands::export_command(&config, input, trace.as_ref())?;
            for (file, path) in output.bundle.files.iter().zip(&output.paths) {
                println!("{}  {}", file.sha256, path.display());
            }
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e.message());
            eprintln!("error: {}", e.message());
            ExitCode::FAILURE
        }
    }
}
