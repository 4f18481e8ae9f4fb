//! Statistical helpers for level computations

use crate::error::{CalResult, CalibrationError};

/// Compute RMS (Root Mean Square)
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f64 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// Mean square value
pub fn mean_square(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64
}

/// Compute peak amplitude
pub fn peak_amplitude(samples: &[f64]) -> f64 {
    samples.iter().map(|s| s.abs()).fold(0.0f64, f64::max)
}

/// Power ratio in dB, `10*log10(x)`, rejecting non-positive input
pub fn power_db(power: f64) -> CalResult<f64> {
    if power > 0.0 && power.is_finite() {
        Ok(10.0 * power.log10())
    } else {
        Err(CalibrationError::Domain(format!(
            "cannot express power {power} in dB"
        )))
    }
}

/// Linearly interpolated quantile of sorted data, `q` in [0, 1]
///
/// Uses the same rule as the "linear" method of common numeric libraries:
/// position `q * (n - 1)` between neighbouring order statistics.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}
