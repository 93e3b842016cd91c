//! Output manifest: the four-slot file list handed to the QSM pipeline
//!
//! Each entry holds, in order: phase volume, magnitude volume, a reserved
//! slot that is always empty, and the header file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix of the merged phase output
pub const PHASE_SUFFIX: &str = "part-phase";
/// Suffix of the merged magnitude output
pub const MAGNITUDE_SUFFIX: &str = "part-mag";
/// Header filename suffix, shared by every volume
pub const HEADER_SUFFIX: &str = "header.mat";
const NIFTI_GZ: &str = ".nii.gz";

/// One output volume's file set
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub phase: PathBuf,
    pub magnitude: PathBuf,
    /// Reserved slot; never populated
    pub reserved: PathBuf,
    pub header: PathBuf,
}

impl ManifestEntry {
    /// The four slots in pipeline order
    pub fn slots(&self) -> [&Path; 4] {
        [
            self.phase.as_path(),
            self.magnitude.as_path(),
            self.reserved.as_path(),
            self.header.as_path(),
        ]
    }
}

/// One entry per output volume (a single entry for single-volume data)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputManifest {
    entries: Vec<ManifestEntry>,
}

/// `<prefix><suffix>` as plain string concatenation on the OS path
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = prefix.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Header path written for any conversion with this prefix
pub fn header_path(prefix: &Path) -> PathBuf {
    with_suffix(prefix, HEADER_SUFFIX)
}

impl OutputManifest {
    /// Single-echo inputs: the source volumes are the outputs.
    pub fn from_sources(phase: &Path, magnitude: &Path, prefix: &Path) -> Self {
        OutputManifest {
            entries: vec![ManifestEntry {
                phase: phase.to_path_buf(),
                magnitude: magnitude.to_path_buf(),
                reserved: PathBuf::new(),
                header: header_path(prefix),
            }],
        }
    }

    /// Merged 3D-per-echo inputs: `<prefix>part-phase.nii.gz` etc.
    pub fn single_volume(prefix: &Path) -> Self {
        OutputManifest {
            entries: vec![ManifestEntry {
                phase: with_suffix(prefix, &format!("{PHASE_SUFFIX}{NIFTI_GZ}")),
                magnitude: with_suffix(prefix, &format!("{MAGNITUDE_SUFFIX}{NIFTI_GZ}")),
                reserved: PathBuf::new(),
                header: header_path(prefix),
            }],
        }
    }

    /// Merged 4D-per-echo inputs: one `_vol-<v>` pair per volume, `v = 1..=n_volumes`.
    ///
    /// All entries share the same header filename.
    pub fn multi_volume(prefix: &Path, n_volumes: usize) -> Self {
        let entries = (1..=n_volumes)
            .map(|v| ManifestEntry {
                phase: with_suffix(prefix, &format!("{PHASE_SUFFIX}_vol-{v}{NIFTI_GZ}")),
                magnitude: with_suffix(prefix, &format!("{MAGNITUDE_SUFFIX}_vol-{v}{NIFTI_GZ}")),
                reserved: PathBuf::new(),
                header: header_path(prefix),
            })
            .collect();
        OutputManifest { entries }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Phase outputs in volume order
    pub fn phase_paths(&self) -> Vec<&Path> {
        self.entries.iter().map(|e| e.phase.as_path()).collect()
    }

    /// Magnitude outputs in volume order
    pub fn magnitude_paths(&self) -> Vec<&Path> {
        self.entries.iter().map(|e| e.magnitude.as_path()).collect()
    }
}
