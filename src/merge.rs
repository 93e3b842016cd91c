//! Echo merging
//!
//! Per-echo volumes are stacked along a new trailing echo axis:
//! - 3D echoes become one 4D `[x, y, z, echo]` volume
//! - 4D echoes become a 5D `[x, y, z, vol, echo]` stack which is permuted to
//!   `[x, y, z, echo, vol]` and written out as one 4D file per volume
//!
//! The stack is allocated once the first echo is loaded and each echo is
//! assigned straight into its slot, so only one input echo is held at a time
//! besides the output buffer.

use std::path::{Path, PathBuf};

use log::info;
use ndarray::{ArrayD, Axis, IxDyn};
use nifti::NiftiHeader;

use crate::bids::Modality;
use crate::error::{ConvertError, Result};
use crate::manifest::OutputManifest;
use crate::nifti_io::{self, LoadedVolume};
use crate::phase;
use crate::validate::EchoSeries;

/// Shape of a single echo, taken from the first phase file's header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EchoGeometry {
    pub shape: Vec<usize>,
}

impl EchoGeometry {
    /// Volumes per echo when each echo file is 4D
    pub fn n_volumes(&self) -> Option<usize> {
        (self.shape.len() == 4).then(|| self.shape[3])
    }
}

/// Read the header of `path` and decide how echoes will be merged.
///
/// Fails for anything with more than four dimensions or an empty axis.
pub fn echo_geometry(path: &Path) -> Result<EchoGeometry> {
    let header = nifti_io::read_header(path)?;
    let ndim = nifti_io::ndim(&header);
    if ndim == 0 || ndim > 4 {
        return Err(ConvertError::UnsupportedDimensionality {
            path: path.to_path_buf(),
            ndim,
        });
    }
    let shape: Vec<usize> = header.dim[1..=ndim].iter().map(|&d| d as usize).collect();
    if shape.contains(&0) {
        return Err(ConvertError::UnsupportedDimensionality {
            path: path.to_path_buf(),
            ndim,
        });
    }
    Ok(EchoGeometry { shape })
}

/// Load every echo of `series` into an `[echo_shape..., n_echoes]` buffer.
///
/// Phase echoes outside `[-π, π]` are converted to radians. Returns the
/// stack and the header of the last echo, used as the output template.
fn stack_echoes(
    series: &EchoSeries,
    geometry: &EchoGeometry,
    tolerance: f64,
) -> Result<(ArrayD<f64>, NiftiHeader)> {
    let is_phase = series.modality() == Modality::Phase;
    let mut stack_shape = geometry.shape.clone();
    stack_shape.push(series.len());
    let echo_axis = Axis(geometry.shape.len());

    let mut stack = ArrayD::<f64>::zeros(IxDyn(&stack_shape));
    let mut template = None;

    for (slot, entry) in series.iter().enumerate() {
        let LoadedVolume { data, header } = nifti_io::load_volume(&entry.path)?;
        if data.shape() != geometry.shape.as_slice() {
            return Err(ConvertError::ShapeMismatch {
                path: entry.path.clone(),
                expected: geometry.shape.clone(),
                found: data.shape().to_vec(),
            });
        }

        let data = if is_phase && phase::needs_radian_conversion(&data, tolerance) {
            info!("echo {}: converting phase to radians ({})", slot + 1, entry.file_name());
            phase::to_radians(data)
        } else {
            data
        };

        info!("echo {}: {} {}", slot + 1, series.modality(), entry.file_name());
        stack.index_axis_mut(echo_axis, slot).assign(&data);
        template = Some(header);
    }

    let template = template.ok_or(ConvertError::NoEchoKey {
        modality: series.modality(),
    })?;
    Ok((stack, template))
}

/// Merge echoes into a single volume with a trailing echo axis.
pub fn merge_echoes(
    series: &EchoSeries,
    geometry: &EchoGeometry,
    output: &Path,
    tolerance: f64,
) -> Result<()> {
    let (stack, template) = stack_echoes(series, geometry, tolerance)?;
    nifti_io::write_volume(output, &stack, &template)?;
    info!("wrote {} ({} echoes)", output.display(), series.len());
    Ok(())
}

/// Merge 4D echoes and split the result into one `[x, y, z, echo]` file per volume.
///
/// Targets are the manifest's phase or magnitude paths depending on the
/// series modality.
pub fn merge_echoes_by_volume(
    series: &EchoSeries,
    geometry: &EchoGeometry,
    manifest: &OutputManifest,
    tolerance: f64,
) -> Result<()> {
    if geometry.n_volumes().is_none() {
        return Err(ConvertError::UnsupportedDimensionality {
            path: series.first().map(|e| e.path.clone()).unwrap_or_default(),
            ndim: geometry.shape.len(),
        });
    }
    let (stack, template) = stack_echoes(series, geometry, tolerance)?;
    // [x, y, z, vol, echo] -> [x, y, z, echo, vol]
    let per_volume = stack.permuted_axes(IxDyn(&[0, 1, 2, 4, 3]));

    let targets: Vec<PathBuf> = match series.modality() {
        Modality::Phase => manifest.phase_paths(),
        _ => manifest.magnitude_paths(),
    }
    .into_iter()
    .map(Path::to_path_buf)
    .collect();

    let n_volumes = per_volume.len_of(Axis(4));
    if targets.len() != n_volumes {
        return Err(ConvertError::ShapeMismatch {
            path: series.first().map(|e| e.path.clone()).unwrap_or_default(),
            expected: vec![targets.len()],
            found: vec![n_volumes],
        });
    }

    for (v, target) in targets.iter().enumerate() {
        let volume = per_volume.index_axis(Axis(4), v).to_owned();
        nifti_io::write_volume(target, &volume, &template)?;
        info!("wrote {} (volume {} of {})", target.display(), v + 1, n_volumes);
    }
    Ok(())
}
