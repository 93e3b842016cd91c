//! SEPIA header generation
//!
//! SEPIA expects a MATLAB `.mat` file next to the phase/magnitude volumes with
//! the acquisition parameters it cannot read from NIfTI:
//! - `B0` field strength (T), `CF` centre frequency (Hz)
//! - `TE` echo times (s) and `delta_TE`
//! - `B0_dir` main field direction in voxel coordinates
//! - `matrixSize` and `voxelSize` (mm)
//!
//! The file is written as a Level 5 MAT-file containing only real double
//! matrices, which is all SEPIA needs.

use std::io::Write;
use std::path::Path;

use log::{debug, info};

use crate::bids::Modality;
use crate::config::ConvertConfig;
use crate::error::{ConvertError, Result};
use crate::nifti_io;
use crate::sidecar::LoadedSidecar;

// MAT-file data types and array classes
const MI_INT8: u32 = 1;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_DOUBLE: u32 = 9;
const MI_MATRIX: u32 = 14;
const MX_DOUBLE_CLASS: u32 = 6;

const MAT_TEXT_LEN: usize = 116;

/// Acquisition parameters consumed by SEPIA
#[derive(Debug, Clone, PartialEq)]
pub struct SepiaHeader {
    pub b0: f64,
    pub b0_dir: [f64; 3],
    pub cf: f64,
    pub te: Vec<f64>,
    pub delta_te: f64,
    pub matrix_size: [usize; 3],
    pub voxel_size: [f64; 3],
}

/// Main field direction in voxel coordinates.
///
/// This is the world z axis mapped through the inverse of the affine's
/// rotation, i.e. the third row of the column-normalised 3x3 block.
pub fn b0_direction(affine: &[f64; 16]) -> [f64; 3] {
    let mut dir = [0.0; 3];
    for (j, d) in dir.iter_mut().enumerate() {
        let norm = (affine[j].powi(2) + affine[4 + j].powi(2) + affine[8 + j].powi(2)).sqrt();
        if norm > 0.0 {
            *d = affine[8 + j] / norm;
        }
    }
    dir
}

/// Header fields taken from the JSON sidecars alone
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionParams {
    pub b0: f64,
    pub cf: f64,
    pub te: Vec<f64>,
    pub delta_te: f64,
}

impl AcquisitionParams {
    /// Read TE, B0 and CF from echo-ordered sidecars.
    ///
    /// Needs no volume on disk, so conversion can fail on bad sidecars
    /// before anything is written.
    pub fn from_sidecars(sidecars: &[LoadedSidecar], config: &ConvertConfig) -> Result<Self> {
        let first = sidecars.first().ok_or_else(|| ConvertError::MissingInput {
            modality: Modality::Sidecar,
            dir: Default::default(),
        })?;

        let te = sidecars
            .iter()
            .map(|s| {
                s.sidecar.echo_time.ok_or_else(|| ConvertError::MissingSidecarField {
                    path: s.path.clone(),
                    field: "EchoTime",
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let gamma = config.gyromagnetic_ratio;
        let b0 = match (first.sidecar.magnetic_field_strength, first.sidecar.imaging_frequency) {
            (Some(b0), _) => b0,
            (None, Some(mhz)) => mhz * 1e6 / gamma,
            (None, None) => {
                return Err(ConvertError::MissingSidecarField {
                    path: first.path.clone(),
                    field: "MagneticFieldStrength",
                })
            }
        };
        let cf = first
            .sidecar
            .imaging_frequency
            .map(|mhz| mhz * 1e6)
            .unwrap_or(b0 * gamma);

        let delta_te = if te.len() >= 2 { te[1] - te[0] } else { te[0] };
        debug!("acquisition: B0={b0} T, CF={cf} Hz, {} echo time(s)", te.len());
        Ok(AcquisitionParams { b0, cf, te, delta_te })
    }
}

impl SepiaHeader {
    /// Build the header from the magnitude volume and echo-ordered sidecars.
    pub fn build(
        magnitude: &Path,
        sidecars: &[LoadedSidecar],
        config: &ConvertConfig,
    ) -> Result<Self> {
        let params = AcquisitionParams::from_sidecars(sidecars, config)?;
        Self::with_geometry(params, magnitude, config)
    }

    /// Complete `params` with the geometry of the magnitude volume.
    pub fn with_geometry(
        params: AcquisitionParams,
        magnitude: &Path,
        config: &ConvertConfig,
    ) -> Result<Self> {
        let header = nifti_io::read_header(magnitude)?;
        let b0_dir = config
            .b0_direction
            .unwrap_or_else(|| b0_direction(&nifti_io::get_affine(&header)));

        let AcquisitionParams { b0, cf, te, delta_te } = params;
        Ok(SepiaHeader {
            b0,
            b0_dir,
            cf,
            te,
            delta_te,
            matrix_size: nifti_io::matrix_size(&header),
            voxel_size: nifti_io::voxel_size(&header),
        })
    }

    /// Variables in the order they are written
    fn variables(&self) -> Vec<(&'static str, Vec<f64>)> {
        vec![
            ("B0", vec![self.b0]),
            ("B0_dir", self.b0_dir.to_vec()),
            ("CF", vec![self.cf]),
            ("TE", self.te.clone()),
            ("delta_TE", vec![self.delta_te]),
            ("matrixSize", self.matrix_size.iter().map(|&n| n as f64).collect()),
            ("voxelSize", self.voxel_size.to_vec()),
        ]
    }

    /// Serialise as a Level 5 MAT-file
    pub fn to_mat_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(512);

        let mut text = format!(
            "MATLAB 5.0 MAT-file, Platform: {}, Created by: qsm-bids {}",
            std::env::consts::OS,
            env!("CARGO_PKG_VERSION")
        )
        .into_bytes();
        text.resize(MAT_TEXT_LEN, b' ');
        buffer.write_all(&text)?;
        // subsystem data offset (unused)
        buffer.write_all(&[0u8; 8])?;
        buffer.write_all(&0x0100u16.to_le_bytes())?;
        buffer.write_all(b"IM")?;

        for (name, values) in self.variables() {
            write_double_row(&mut buffer, name, &values)?;
        }
        Ok(buffer)
    }
}

fn padding(len: usize) -> usize {
    (8 - len % 8) % 8
}

fn write_tag<W: Write>(w: &mut W, data_type: u32, n_bytes: usize) -> std::io::Result<()> {
    w.write_all(&data_type.to_le_bytes())?;
    w.write_all(&(n_bytes as u32).to_le_bytes())
}

/// Write a `1 x n` double matrix element
fn write_double_row<W: Write>(w: &mut W, name: &str, values: &[f64]) -> std::io::Result<()> {
    let name_bytes = name.as_bytes();
    let flags_len = 8 + 8;
    let dims_len = 8 + 8;
    let name_len = 8 + name_bytes.len() + padding(name_bytes.len());
    let data_len = 8 + values.len() * 8;

    write_tag(w, MI_MATRIX, flags_len + dims_len + name_len + data_len)?;

    write_tag(w, MI_UINT32, 8)?;
    w.write_all(&MX_DOUBLE_CLASS.to_le_bytes())?;
    w.write_all(&0u32.to_le_bytes())?;

    write_tag(w, MI_INT32, 8)?;
    w.write_all(&1i32.to_le_bytes())?;
    w.write_all(&(values.len() as i32).to_le_bytes())?;

    write_tag(w, MI_INT8, name_bytes.len())?;
    w.write_all(name_bytes)?;
    w.write_all(&vec![0u8; padding(name_bytes.len())])?;

    write_tag(w, MI_DOUBLE, values.len() * 8)?;
    for v in values {
        w.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

/// Write `header` to `path` as a MAT-file
pub fn write_sepia_header(path: &Path, header: &SepiaHeader) -> Result<()> {
    let bytes = header.to_mat_bytes()?;
    std::fs::write(path, bytes)?;
    debug!("{:?}", header);
    info!(
        "wrote SEPIA header {} (B0 = {} T, {} echo time(s))",
        path.display(),
        header.b0,
        header.te.len()
    );
    Ok(())
}
