//! Directory scanner
//!
//! Finds the magnitude, phase and sidecar files of a BIDS `anat` style folder.
//! Only the top level of the directory is listed.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::bids::{EchoIndex, Extension, Modality};
use crate::error::Result;

/// One discovered file, with its echo key parsed up front
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub echo: Option<EchoIndex>,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let echo = EchoIndex::parse(&file_name_of(&path));
        FileEntry { path, echo }
    }

    /// Bare filename, lossily converted for key matching and messages
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Files found for one (modality, extension) filter
pub type FileList = Vec<FileEntry>;

/// List files in `dir` whose name contains `pattern` and ends with `extension`.
///
/// Matching ignores case. Subdirectories are not entered. An empty result is
/// not an error; the caller decides whether it matters. Entries come back
/// sorted by filename so logs and error messages are stable.
pub fn scan(dir: &Path, pattern: &str, extension: Extension) -> Result<FileList> {
    let pattern = pattern.to_ascii_lowercase();
    let mut files = FileList::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        // follows symlinks
        if !entry.path().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.to_ascii_lowercase().contains(&pattern) && extension.matches(&name) {
            files.push(FileEntry::new(entry.path()));
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!("scan {} for '{}' {:?}: {} match(es)", dir.display(), pattern, extension, files.len());
    Ok(files)
}

/// Scan for one modality using its BIDS key and extension family
pub fn scan_modality(dir: &Path, modality: Modality) -> Result<FileList> {
    scan(dir, modality.part_key(), modality.extension())
}
