// Pipeline tracing
// Append-only JSONL log of ingest, sanitize and export runs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::export::ExportBundle;
use crate::looping::SanitizeReport;
use crate::session::PatternRole;

#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStage {
    Ingest,
    Sanitize,
    Export,
}

/// One line of the trace file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub timestamp: DateTime<Utc>,
    pub stage: TraceStage,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<PatternRole>,

    pub message: String,

    /// Stage-specific counters (e.g. a sanitize report)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn new(stage: TraceStage, message: impl Into<String>) -> Self {
        TraceEntry {
            timestamp: Utc::now(),
            stage,
            role: None,
            message: message.into(),
            data: None,
        }
    }

    pub fn for_role(mut self, role: PatternRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Entry summarizing one sanitization pass
    pub fn sanitized(role: PatternRole, length_in_bars: u32, report: &SanitizeReport) -> Self {
        let message = format!(
            "{} of {} events kept in {} bars",
            report.retained(),
            report.total(),
            length_in_bars
        );
        let data = serde_json::to_value(report).unwrap_or(serde_json::Value::Null);
        TraceEntry::new(TraceStage::Sanitize, message)
            .for_role(role)
            .with_data(data)
    }

    /// Entry listing the files of an export
    pub fn exported(bundle: &ExportBundle) -> Self {
        let message = format!("{} files for {}", bundle.files.len(), bundle.archive_name);
        let data = serde_json::to_value(bundle).unwrap_or(serde_json::Value::Null);
        TraceEntry::new(TraceStage::Export, message).with_data(data)
    }

    /// Serialize to a JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append an entry, creating the file if needed
    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        self.write_batch(std::slice::from_ref(entry))
    }

    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        for entry in entries {
            file.write_all(entry.to_json_line()?.as_bytes())?;
        }

        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Read trace entries from a JSONL file, skipping blank lines
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line)?);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportedFile;
    use tempfile::TempDir;

    #[test]
    fn test_sanitized_entry() {
        let report = SanitizeReport {
            kept: 5,
            truncated: 2,
            discarded_out_of_range: 1,
            ..SanitizeReport::default()
        };
        let entry = TraceEntry::sanitized(PatternRole::Bass, 4, &report);

        assert_eq!(entry.stage, TraceStage::Sanitize);
        assert_eq!(entry.role, Some(PatternRole::Bass));
        assert_eq!(entry.message, "7 of 8 events kept in 4 bars");
        assert_eq!(entry.data.unwrap()["truncated"], 2);
    }

    #[test]
    fn test_exported_entry_omits_file_bytes() {
        let bundle = ExportBundle {
            archive_name: "midi_kit_120bpm.zip".to_string(),
            files: vec![ExportedFile::new("Bass_120bpm.mid", vec![1, 2, 3])],
        };
        let entry = TraceEntry::exported(&bundle);
        let data = entry.data.unwrap();

        assert_eq!(data["files"][0]["name"], "Bass_120bpm.mid");
        assert!(data["files"][0].get("data").is_none());
    }

    #[test]
    fn test_json_line_format() {
        let entry = TraceEntry::new(TraceStage::Ingest, "Testing");
        let json_line = entry.to_json_line().unwrap();

        assert!(json_line.ends_with('\n'));
        assert!(!json_line.contains("\"role\""));
        let parsed: TraceEntry = serde_json::from_str(json_line.trim()).unwrap();
        assert_eq!(parsed.stage, TraceStage::Ingest);
    }

    #[test]
    fn test_trace_writer_appends() {
        let temp_dir = TempDir::new().unwrap();
        let trace_path = temp_dir.path().join("trace.jsonl");
        let writer = TraceWriter::new(trace_path.clone());

        writer
            .write(&TraceEntry::new(TraceStage::Ingest, "Start").for_role(PatternRole::Drums))
            .unwrap();
        writer
            .write_batch(&[
                TraceEntry::new(TraceStage::Sanitize, "Sanitized"),
                TraceEntry::new(TraceStage::Export, "Done"),
            ])
            .unwrap();

        let entries = read_trace_file(writer.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].role, Some(PatternRole::Drums));
        assert_eq!(entries[2].stage, TraceStage::Export);
    }
}
