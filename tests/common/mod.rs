//! Common test utilities for qsm-bids integration tests
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

/// Fixture volume description
pub struct RawNifti<'a> {
    /// Voxels in Fortran order (x varies fastest)
    pub data: &'a [f32],
    pub dims: &'a [usize],
    pub voxel_size: (f32, f32, f32),
    pub scl_slope: f32,
    pub scl_inter: f32,
}

impl<'a> RawNifti<'a> {
    pub fn new(data: &'a [f32], dims: &'a [usize]) -> Self {
        RawNifti {
            data,
            dims,
            voxel_size: (1.0, 1.0, 2.0),
            scl_slope: 1.0,
            scl_inter: 0.0,
        }
    }

    pub fn scaled(mut self, slope: f32, inter: f32) -> Self {
        self.scl_slope = slope;
        self.scl_inter = inter;
        self
    }

    /// NIfTI-1 single-file bytes with float32 voxels
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut header = [0u8; 348];

        // sizeof_hdr = 348
        header[0..4].copy_from_slice(&348i32.to_le_bytes());

        // dim[0..7]
        let mut dim = [1i16; 8];
        dim[0] = self.dims.len() as i16;
        for (i, &d) in self.dims.iter().enumerate() {
            dim[i + 1] = d as i16;
        }
        for (i, &d) in dim.iter().enumerate() {
            let offset = 40 + i * 2;
            header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
        }

        // datatype = 16 (FLOAT32), bitpix = 32
        header[70..72].copy_from_slice(&16i16.to_le_bytes());
        header[72..74].copy_from_slice(&32i16.to_le_bytes());

        // pixdim[0..7]
        let (vsx, vsy, vsz) = self.voxel_size;
        let pixdim: [f32; 8] = [1.0, vsx, vsy, vsz, 1.0, 1.0, 1.0, 1.0];
        for (i, &p) in pixdim.iter().enumerate() {
            let offset = 76 + i * 4;
            header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
        }

        // vox_offset = 352 (header + 4 bytes extension)
        header[108..112].copy_from_slice(&352.0f32.to_le_bytes());
        header[112..116].copy_from_slice(&self.scl_slope.to_le_bytes());
        header[116..120].copy_from_slice(&self.scl_inter.to_le_bytes());

        // sform_code = 1 with a diagonal affine
        header[254..256].copy_from_slice(&1i16.to_le_bytes());
        let rows: [[f32; 4]; 3] = [
            [vsx, 0.0, 0.0, 0.0],
            [0.0, vsy, 0.0, 0.0],
            [0.0, 0.0, vsz, 0.0],
        ];
        for (r, row) in rows.iter().enumerate() {
            for (c, v) in row.iter().enumerate() {
                let offset = 280 + r * 16 + c * 4;
                header[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
            }
        }

        header[344..348].copy_from_slice(b"n+1\0");

        let mut buffer = Vec::with_capacity(352 + self.data.len() * 4);
        buffer.extend_from_slice(&header);
        buffer.extend_from_slice(&[0u8; 4]);
        for &v in self.data {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        buffer
    }

    /// Write to `path`, gzip compressed when it ends in `.gz`
    pub fn write(&self, path: &Path) {
        let bytes = self.to_bytes();
        if path.to_string_lossy().ends_with(".gz") {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&bytes).unwrap();
            fs::write(path, encoder.finish().unwrap()).unwrap();
        } else {
            fs::write(path, bytes).unwrap();
        }
    }
}

/// Write a BIDS magnitude sidecar
pub fn write_sidecar(dir: &Path, name: &str, echo_time: f64, field_strength: f64) -> PathBuf {
    let path = dir.join(name);
    let json = format!(
        "{{\n  \"EchoTime\": {echo_time},\n  \"MagneticFieldStrength\": {field_strength},\n  \"ImagingFrequency\": 123.2,\n  \"Manufacturer\": \"Siemens\"\n}}\n"
    );
    fs::write(&path, json).unwrap();
    path
}

/// Constant volume of `n` voxels
pub fn constant(n: usize, value: f32) -> Vec<f32> {
    vec![value; n]
}

/// Read `(name, values)` pairs from a MAT-file holding only real double matrices
pub fn read_mat_variables(path: &Path) -> Vec<(String, Vec<f64>)> {
    let bytes = fs::read(path).unwrap();
    assert!(bytes.starts_with(b"MATLAB 5.0 MAT-file"), "not a MAT-file");
    let u32_at = |o: usize| u32::from_le_bytes(bytes[o..o + 4].try_into().unwrap()) as usize;

    let mut vars = Vec::new();
    let mut offset = 128;
    while offset < bytes.len() {
        let size = u32_at(offset + 4);
        let body = offset + 8;
        let name_len = u32_at(body + 36);
        let name = String::from_utf8(bytes[body + 40..body + 40 + name_len].to_vec()).unwrap();
        let data_tag = body + 40 + name_len + (8 - name_len % 8) % 8;
        let n = u32_at(data_tag + 4) / 8;
        let values = (0..n)
            .map(|i| {
                let o = data_tag + 8 + i * 8;
                f64::from_le_bytes(bytes[o..o + 8].try_into().unwrap())
            })
            .collect();
        vars.push((name, values));
        offset = body + size;
    }
    vars
}

/// Look up one MAT variable by name
pub fn mat_variable(vars: &[(String, Vec<f64>)], name: &str) -> Vec<f64> {
    vars.iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.clone())
        .unwrap_or_else(|| panic!("variable {name} missing"))
}

/// Largest absolute difference between two slices
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
