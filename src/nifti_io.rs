//! NIfTI file I/O
//!
//! Thin layer over the `nifti` crate: header-only reads for routing and
//! header generation, scaled voxel loads for merging, and f64 writes that
//! reuse an input header as a template.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use flate2::read::GzDecoder;
use log::debug;
use ndarray::ArrayD;
use nifti::writer::WriterOptions;
use nifti::{InMemNiftiObject, IntoNdArray, NiftiHeader, NiftiObject};

use crate::error::{ConvertError, Result};

/// A loaded volume with `scl_slope`/`scl_inter` already applied
#[derive(Clone, Debug)]
pub struct LoadedVolume {
    pub data: ArrayD<f64>,
    pub header: NiftiHeader,
}

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Read only the header of a `.nii` or `.nii.gz` file.
///
/// Compression is detected from the content, not the extension.
pub fn read_header(path: &Path) -> Result<NiftiHeader> {
    let mut reader = BufReader::new(File::open(path)?);
    let gz = is_gzip(reader.fill_buf()?);
    let header = if gz {
        NiftiHeader::from_reader(GzDecoder::new(reader))
    } else {
        NiftiHeader::from_reader(reader)
    };
    header.map_err(|e| ConvertError::nifti(path, e))
}

/// Load a volume and its header, applying the intensity scaling.
pub fn load_volume(path: &Path) -> Result<LoadedVolume> {
    let bytes = std::fs::read(path)?;
    let obj = if is_gzip(&bytes) {
        InMemNiftiObject::from_reader(GzDecoder::new(Cursor::new(bytes)))
    } else {
        InMemNiftiObject::from_reader(Cursor::new(bytes))
    }
    .map_err(|e| ConvertError::nifti(path, e))?;

    let header = obj.header().clone();
    let data = obj
        .into_volume()
        .into_ndarray::<f64>()
        .map_err(|e| ConvertError::nifti(path, e))?;

    debug!("loaded {} with shape {:?}", path.display(), data.shape());
    Ok(LoadedVolume { data, header })
}

/// Write `data` as float64, copying geometry and metadata from `template`.
///
/// The stored voxels are final values, so the template's scaling is reset.
/// A `.gz` suffix on `path` selects gzip output.
pub fn write_volume(path: &Path, data: &ArrayD<f64>, template: &NiftiHeader) -> Result<()> {
    let mut header = template.clone();
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;

    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(data)
        .map_err(|e| ConvertError::nifti(path, e))?;
    debug!("wrote {} with shape {:?}", path.display(), data.shape());
    Ok(())
}

/// Number of dimensions recorded in `dim[0]`
pub fn ndim(header: &NiftiHeader) -> usize {
    header.dim[0] as usize
}

/// First three spatial extents
pub fn matrix_size(header: &NiftiHeader) -> [usize; 3] {
    [header.dim[1] as usize, header.dim[2] as usize, header.dim[3] as usize]
}

/// Voxel size in mm along the three spatial axes
pub fn voxel_size(header: &NiftiHeader) -> [f64; 3] {
    [header.pixdim[1] as f64, header.pixdim[2] as f64, header.pixdim[3] as f64]
}

/// Get affine transformation matrix from header (4x4, row-major)
pub fn get_affine(header: &NiftiHeader) -> [f64; 16] {
    // Prefer sform if available (sform_code > 0)
    if header.sform_code > 0 {
        let s = &header.srow_x;
        let t = &header.srow_y;
        let u = &header.srow_z;
        [
            s[0] as f64, s[1] as f64, s[2] as f64, s[3] as f64,
            t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64,
            u[0] as f64, u[1] as f64, u[2] as f64, u[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else {
        // Fall back to identity with voxel scaling
        let [vsx, vsy, vsz] = voxel_size(header);
        [
            vsx, 0.0, 0.0, 0.0,
            0.0, vsy, 0.0, 0.0,
            0.0, 0.0, vsz, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}
