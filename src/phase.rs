//! Phase range detection and conversion to radians
//!
//! Scanner-exported phase is often stored as integers (e.g. Siemens
//! `[-4096, 4095]` or `[0, 4095]`). QSM needs radians in `[-π, π]`, so any
//! phase volume whose range is not already `[-π, π]` (within a tolerance) is
//! rescaled linearly from `[min, max]` onto `[-π, π]`.

use std::f64::consts::PI;

use log::{debug, warn};
use ndarray::{ArrayD, Zip};

/// Default tolerance when deciding whether phase is already in radians
pub const DEFAULT_RADIAN_TOLERANCE: f64 = 1e-4;

/// Minimum and maximum of the finite values (NaN is skipped)
pub fn value_range(data: &ArrayD<f64>) -> (f64, f64) {
    data.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

/// True when `min` and `max` both sit within `tolerance` of `-π` and `π`
pub fn is_radian_range(min: f64, max: f64, tolerance: f64) -> bool {
    (max - PI).abs() <= tolerance && (min + PI).abs() <= tolerance
}

/// True when the volume must be rescaled before use as phase
pub fn needs_radian_conversion(data: &ArrayD<f64>, tolerance: f64) -> bool {
    let (min, max) = value_range(data);
    !is_radian_range(min, max, tolerance)
}

/// Map `[min, max]` linearly onto `[-π, π]`.
///
/// A constant (or empty) volume carries no phase information and becomes zeros.
pub fn to_radians(mut data: ArrayD<f64>) -> ArrayD<f64> {
    let (min, max) = value_range(&data);
    let range = max - min;
    if !(range.is_finite() && range > 0.0) {
        warn!("phase volume has no usable range [{min}, {max}]; writing zeros");
        data.fill(0.0);
        return data;
    }

    debug!("rescaling phase [{min:.1}, {max:.1}] -> [-pi, pi]");
    Zip::from(&mut data).for_each(|v| {
        *v = (*v - min) / range * 2.0 * PI - PI;
    });
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn volume(values: Vec<f64>) -> ArrayD<f64> {
        let n = values.len();
        ArrayD::from_shape_vec(IxDyn(&[n, 1, 1]), values).unwrap()
    }

    #[test]
    fn test_radians_bypass_conversion() {
        let data = volume(vec![-PI, -1.0, 0.0, 2.0, PI]);
        assert!(!needs_radian_conversion(&data, DEFAULT_RADIAN_TOLERANCE));
    }

    #[test]
    fn test_within_tolerance_bypasses() {
        let data = volume(vec![-PI + 5e-5, 0.0, PI - 5e-5]);
        assert!(!needs_radian_conversion(&data, DEFAULT_RADIAN_TOLERANCE));
    }

    #[test]
    fn test_outside_tolerance_converts() {
        // a narrower range than [-pi, pi] is still not accepted as radians
        let data = volume(vec![-3.0, 0.0, 3.0]);
        assert!(needs_radian_conversion(&data, DEFAULT_RADIAN_TOLERANCE));

        let data = volume(vec![-PI, 0.0, PI + 2e-4]);
        assert!(needs_radian_conversion(&data, DEFAULT_RADIAN_TOLERANCE));
    }

    #[test]
    fn test_integer_phase_converts() {
        let data = volume(vec![0.0, 2048.0, 4095.0]);
        assert!(needs_radian_conversion(&data, DEFAULT_RADIAN_TOLERANCE));

        let out = to_radians(data);
        let (min, max) = value_range(&out);
        assert!((min + PI).abs() < 1e-12);
        assert!((max - PI).abs() < 1e-12);
        assert!(!needs_radian_conversion(&out, DEFAULT_RADIAN_TOLERANCE));
    }

    #[test]
    fn test_signed_phase_maps_midpoint_to_zero() {
        let out = to_radians(volume(vec![-4096.0, 0.0, 4096.0]));
        assert!(out[[1, 0, 0]].abs() < 1e-12);
    }

    #[test]
    fn test_constant_phase_becomes_zero() {
        let out = to_radians(volume(vec![7.0, 7.0, 7.0]));
        assert!(out.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_value_range_skips_nan() {
        let (min, max) = value_range(&volume(vec![f64::NAN, -1.0, 2.0]));
        assert_eq!((min, max), (-1.0, 2.0));
    }
}
