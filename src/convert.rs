//! BIDS to SEPIA conversion
//!
//! Scan -> route -> (validate -> merge) -> header. Any failure aborts the
//! conversion; files already written are left on disk.

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::bids::Modality;
use crate::config::ConvertConfig;
use crate::error::{ConvertError, Result};
use crate::manifest::OutputManifest;
use crate::merge::{echo_geometry, merge_echoes, merge_echoes_by_volume};
use crate::scan::scan_modality;
use crate::sepia_header::{write_sepia_header, AcquisitionParams, SepiaHeader};
use crate::sidecar::load_sidecars;
use crate::validate::{select_route, validate_multi_echo, Discovered, Route, ValidatedEchoes};

/// Convert a BIDS GRE directory using default settings.
///
/// `output_prefix` is a path plus filename stem; output names are formed by
/// appending to it directly (`<prefix>part-phase.nii.gz`, `<prefix>header.mat`).
pub fn convert(input_dir: &Path, output_prefix: &Path) -> Result<OutputManifest> {
    convert_with_config(input_dir, output_prefix, &ConvertConfig::default())
}

/// Convert a BIDS GRE directory.
///
/// # Errors
///
/// Returns the first discovery, validation, NIfTI or sidecar error met.
pub fn convert_with_config(
    input_dir: &Path,
    output_prefix: &Path,
    config: &ConvertConfig,
) -> Result<OutputManifest> {
    info!("scanning {}", input_dir.display());
    let discovered = Discovered {
        magnitude: scan_modality(input_dir, Modality::Magnitude)?,
        phase: scan_modality(input_dir, Modality::Phase)?,
        sidecars: scan_modality(input_dir, Modality::Sidecar)?,
    };
    info!(
        "found {} magnitude, {} phase and {} sidecar file(s)",
        discovered.magnitude.len(),
        discovered.phase.len(),
        discovered.sidecars.len()
    );

    // sidecar contents are checked before any output is written
    let (manifest, params) = match select_route(input_dir, discovered)? {
        Route::SingleEcho {
            magnitude,
            phase,
            sidecar,
        } => {
            let sidecars = load_sidecars([sidecar.path.as_path()])?;
            let params = AcquisitionParams::from_sidecars(&sidecars, config)?;
            ensure_parent_dir(output_prefix)?;
            let manifest = OutputManifest::from_sources(&phase.path, &magnitude.path, output_prefix);
            (manifest, params)
        }
        Route::MultiEcho(discovered) => {
            let echoes = validate_multi_echo(discovered)?;
            let sidecars = load_sidecars(echoes.sidecars.iter().map(|e| e.path.as_path()))?;
            let params = AcquisitionParams::from_sidecars(&sidecars, config)?;
            ensure_parent_dir(output_prefix)?;
            let manifest = merge_multi_echo(&echoes, output_prefix, config)?;
            (manifest, params)
        }
    };

    let first = &manifest.entries()[0];
    let header = SepiaHeader::with_geometry(params, &first.magnitude, config)?;
    write_sepia_header(&first.header, &header)?;

    info!("conversion finished: {} output volume(s)", manifest.len());
    Ok(manifest)
}

/// Route on the first phase echo's dimensionality and merge both modalities.
fn merge_multi_echo(
    echoes: &ValidatedEchoes,
    output_prefix: &Path,
    config: &ConvertConfig,
) -> Result<OutputManifest> {
    let first_phase = echoes.phase.first().ok_or(ConvertError::NoEchoKey {
        modality: Modality::Phase,
    })?;
    let geometry = echo_geometry(&first_phase.path)?;
    let tolerance = config.phase_tolerance;

    let manifest = match geometry.n_volumes() {
        None => {
            info!("3D echoes {:?}: merging into a single 4D volume", geometry.shape);
            let manifest = OutputManifest::single_volume(output_prefix);
            let entry = &manifest.entries()[0];
            merge_echoes(&echoes.phase, &geometry, &entry.phase, tolerance)?;
            merge_echoes(&echoes.magnitude, &geometry, &entry.magnitude, tolerance)?;
            manifest
        }
        Some(n_volumes) => {
            info!("4D echoes {:?}: writing {} volume(s)", geometry.shape, n_volumes);
            let manifest = OutputManifest::multi_volume(output_prefix, n_volumes);
            merge_echoes_by_volume(&echoes.phase, &geometry, &manifest, tolerance)?;
            merge_echoes_by_volume(&echoes.magnitude, &geometry, &manifest, tolerance)?;
            manifest
        }
    };
    Ok(manifest)
}

/// Create the directory outputs land in; a prefix ending in a separator is itself that directory.
fn ensure_parent_dir(output_prefix: &Path) -> Result<()> {
    let is_dir_prefix = output_prefix
        .as_os_str()
        .to_string_lossy()
        .ends_with(std::path::is_separator);
    let dir = if is_dir_prefix {
        Some(output_prefix)
    } else {
        output_prefix.parent()
    };

    if let Some(dir) = dir {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            debug!("creating output directory {}", dir.display());
            fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}
