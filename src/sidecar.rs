//! BIDS JSON sidecar metadata

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Acquisition fields used for the SEPIA header.
///
/// Keys use BIDS names; anything else in the file is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sidecar {
    /// Echo time in seconds
    #[serde(default)]
    pub echo_time: Option<f64>,

    /// Main field strength in Tesla
    #[serde(default)]
    pub magnetic_field_strength: Option<f64>,

    /// Centre frequency in MHz
    #[serde(default)]
    pub imaging_frequency: Option<f64>,

    #[serde(default)]
    pub echo_number: Option<u32>,
}

/// A sidecar together with the file it came from, for error messages
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSidecar {
    pub path: PathBuf,
    pub sidecar: Sidecar,
}

impl Sidecar {
    pub fn from_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|source| ConvertError::Sidecar {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Load sidecars in the given order.
pub fn load_sidecars<'a, I>(paths: I) -> Result<Vec<LoadedSidecar>>
where
    I: IntoIterator<Item = &'a Path>,
{
    paths
        .into_iter()
        .map(|path| {
            Ok(LoadedSidecar {
                path: path.to_path_buf(),
                sidecar: Sidecar::from_file(path)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bids_keys() {
        let json = r#"{
            "EchoTime": 0.004,
            "MagneticFieldStrength": 3,
            "ImagingFrequency": 123.259,
            "EchoNumber": 1,
            "Manufacturer": "Siemens"
        }"#;
        let sidecar: Sidecar = serde_json::from_str(json).unwrap();
        assert_eq!(sidecar.echo_time, Some(0.004));
        assert_eq!(sidecar.magnetic_field_strength, Some(3.0));
        assert_eq!(sidecar.imaging_frequency, Some(123.259));
        assert_eq!(sidecar.echo_number, Some(1));
    }

    #[test]
    fn test_missing_keys_are_none() {
        let sidecar: Sidecar = serde_json::from_str("{}").unwrap();
        assert_eq!(sidecar, Sidecar::default());
    }

    #[test]
    fn test_invalid_json_reports_path() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad_part-mag.json");
        std::fs::write(&path, "{ not json").unwrap();
        match Sidecar::from_file(&path) {
            Err(ConvertError::Sidecar { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected sidecar error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_sidecars_keeps_order() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.json");
        let b = tmp.path().join("b.json");
        std::fs::write(&a, r#"{"EchoTime": 0.02}"#).unwrap();
        std::fs::write(&b, r#"{"EchoTime": 0.01}"#).unwrap();

        let loaded = load_sidecars([b.as_path(), a.as_path()]).unwrap();
        assert_eq!(loaded[0].sidecar.echo_time, Some(0.01));
        assert_eq!(loaded[1].path, a);
    }
}
