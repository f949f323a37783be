// Export bundle - Named MIDI blobs ready for an archiver, and writing them to disk

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::midi::ExportResult;

/// One exported track file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    /// Suggested file name (e.g. "Bass_120bpm.mid")
    pub name: String,

    /// Standard MIDI File bytes
    #[serde(skip)]
    pub data: Vec<u8>,

    /// Hex SHA256 of `data`
    pub sha256: String,
}

impl ExportedFile {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let sha256 = calculate_sha256(&data);
        ExportedFile {
            name: name.into(),
            data,
            sha256,
        }
    }
}

/// Everything produced by one download request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportBundle {
    /// Suggested name for the archive bundling these files
    pub archive_name: String,

    pub files: Vec<ExportedFile>,
}

impl ExportBundle {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Write every file of a bundle into `dir`, returning the written paths
pub fn write_bundle(bundle: &ExportBundle, dir: &Path) -> ExportResult<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(bundle.files.len());
    for file in &bundle.files {
        let path = dir.join(&file.name);
        let mut out = fs::File::create(&path)?;
        out.write_all(&file.data)?;
        paths.push(path);
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_calculate_sha256() {
        let hash = calculate_sha256(b"hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_write_bundle() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("kit");
        let bundle = ExportBundle {
            archive_name: "midi_kit_120bpm.zip".to_string(),
            files: vec![
                ExportedFile::new("Kick_120bpm.mid", vec![1, 2, 3]),
                ExportedFile::new("Bass_120bpm.mid", vec![4, 5]),
            ],
        };

        let paths = write_bundle(&bundle, &out_dir).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(fs::read(&paths[0]).unwrap(), vec![1, 2, 3]);
        assert_eq!(fs::read(out_dir.join("Bass_120bpm.mid")).unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_exported_file_hash_tracks_data() {
        let a = ExportedFile::new("a.mid", vec![0; 8]);
        let b = ExportedFile::new("b.mid", vec![0; 8]);
        let c = ExportedFile::new("c.mid", vec![1; 8]);
        assert_eq!(a.sha256, b.sha256);
        assert_ne!(a.sha256, c.sha256);
    }
}
