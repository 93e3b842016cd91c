//! Error types for BIDS discovery, echo validation and volume merging

use std::path::PathBuf;

use thiserror::Error;

use crate::bids::Modality;

/// Errors that abort a conversion.
///
/// Every variant is fatal to the current call; nothing is retried and
/// already-written outputs are left in place.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("no {modality} files found in {}", dir.display())]
    MissingInput { modality: Modality, dir: PathBuf },

    #[error("multi-echo input but no {modality} file carries an 'echo-' key")]
    NoEchoKey { modality: Modality },

    #[error("{modality} files belong to different acquisitions: '{first}' vs '{second}'")]
    MixedAcquisition {
        modality: Modality,
        first: String,
        second: String,
    },

    #[error("number of magnitude echoes ({magnitude}) does not match number of phase echoes ({phase})")]
    CountMismatch { magnitude: usize, phase: usize },

    #[error("{} has {ndim} dimensions; only 3D or 4D echoes are supported", path.display())]
    UnsupportedDimensionality { path: PathBuf, ndim: usize },

    #[error("{modality} echo indices {found:?} do not form the complete set 1..={expected}")]
    EchoIndexGap {
        modality: Modality,
        expected: usize,
        found: Vec<u32>,
    },

    #[error("'{file}' has an 'echo-' key without a positive echo number")]
    MalformedEchoKey { file: String },

    #[error("{} has shape {found:?}, expected {expected:?}", path.display())]
    ShapeMismatch {
        path: PathBuf,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("NIfTI error in {}: {source}", path.display())]
    Nifti {
        path: PathBuf,
        #[source]
        source: nifti::NiftiError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON sidecar {}: {source}", path.display())]
    Sidecar {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("sidecar {} has no '{field}' entry", path.display())]
    MissingSidecarField { path: PathBuf, field: &'static str },

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConvertError>;

impl ConvertError {
    pub(crate) fn nifti(path: impl Into<PathBuf>, source: nifti::NiftiError) -> Self {
        ConvertError::Nifti {
            path: path.into(),
            source,
        }
    }
}
