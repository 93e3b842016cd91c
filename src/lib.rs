//! QSM-BIDS: BIDS GRE data to SEPIA-ready QSM inputs
//!
//! This crate turns a BIDS folder of multi-echo gradient-echo magnitude and
//! phase NIfTI files into the four-slot file list the SEPIA QSM pipeline reads.
//!
//! # Modules
//! - `bids`: filename key grammar (`part-mag`, `part-phase`, `echo-<n>`)
//! - `scan`: non-recursive directory discovery
//! - `validate`: single/multi-echo routing and acquisition checks
//! - `merge`: echo stacking into 4D volumes (or per-volume 4D sets)
//! - `phase`: conversion of stored phase to radians
//! - `sepia_header`: SEPIA `header.mat` generation from JSON sidecars
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! let manifest = qsm_bids::convert(Path::new("sub-01/anat"), Path::new("out/sub-01_")).unwrap();
//! for entry in manifest.entries() {
//!     println!("{} {}", entry.phase.display(), entry.magnitude.display());
//! }
//! ```

// Discovery and validation
pub mod bids;
pub mod scan;
pub mod validate;

// Volume handling
pub mod merge;
pub mod nifti_io;
pub mod phase;

// Outputs
pub mod manifest;
pub mod sepia_header;
pub mod sidecar;

pub mod cli;
pub mod config;
pub mod convert;
pub mod error;

pub use config::ConvertConfig;
pub use convert::{convert, convert_with_config};
pub use error::{ConvertError, Result};
pub use manifest::{ManifestEntry, OutputManifest};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
