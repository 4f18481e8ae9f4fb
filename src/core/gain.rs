//! End-to-end gain model
//!
//! Maps the raw, full-scale-normalised sample amplitude of a recorder to
//! micro-Pascals from the hydrophone sensitivity (dB re 1 V/µPa), the
//! preamplifier gain (dB) and the peak-to-peak input range of the ADC.

use crate::error::{CalResult, CalibrationError};

/// Convert a dB value to a linear multiplier scaled by the reference pressure
pub fn db_to_linear(db: f64, p_ref: f64) -> f64 {
    10.0_f64.powf(db / 20.0) * p_ref
}

/// Linear µPa per unit of normalised sample amplitude
pub fn gain_upa(sensitivity: f64, preamp_gain: f64, vpp: f64, p_ref: f64) -> CalResult<f64> {
    let mv = db_to_linear(sensitivity, p_ref);
    let ma = db_to_linear(preamp_gain, p_ref);
    let denominator = mv * ma;
    if denominator == 0.0 {
        return Err(CalibrationError::Domain(format!(
            "sensitivity {sensitivity} dB and preamp gain {preamp_gain} dB give a zero gain denominator"
        )));
    }
    Ok((vpp / 2.0) / denominator)
}

/// End-to-end gain in dB, power form `10*log10(gain_upa²)`
///
/// Adding this to a dB-scaled measurement of the raw waveform yields the
/// calibrated sound-pressure level.
pub fn end_to_end_gain_db(sensitivity: f64, preamp_gain: f64, vpp: f64, p_ref: f64) -> CalResult<f64> {
    let gain = gain_upa(sensitivity, preamp_gain, vpp, p_ref)?;
    Ok(10.0 * (gain * gain).log10())
}

/// End-to-end gain in dB computed as a difference of dB terms
///
/// Numerically identical to [`end_to_end_gain_db`] for finite inputs with
/// `vpp > 0`.
pub fn end_to_end_gain_db_difference(sensitivity: f64, preamp_gain: f64, vpp: f64, p_ref: f64) -> f64 {
    20.0 * (vpp / 2.0).log10() - sensitivity - preamp_gain - 40.0 * p_ref.log10()
}

/// Preamp gain in dB from a linear amplification (V/V or V/Pa × 1e-6)
pub fn amplification_to_db(amplification: f64) -> f64 {
    10.0 * (amplification * amplification).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_and_difference_forms_agree() {
        let sensitivities = [-220.0, -199.0, -180.0, -164.0, -120.5, 0.0];
        let gains = [-170.0, -12.0, 0.0, 1.0, 11.0, 16.0, 40.0];
        let vpps = [0.5, 2.0, 5.0, 6.0, 20.0];

        for &s in &sensitivities {
            for &g in &gains {
                for &v in &vpps {
                    let power = end_to_end_gain_db(s, g, v, 1.0).unwrap();
                    let diff = end_to_end_gain_db_difference(s, g, v, 1.0);
                    assert!(
                        (power - diff).abs() < 1e-9,
                        "s={s} g={g} v={v}: {power} vs {diff}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_amplitude_and_power_forms_agree() {
        let gain = gain_upa(-180.0, 0.0, 5.0, 1.0).unwrap();
        let amplitude = 20.0 * gain.log10();
        let power = end_to_end_gain_db(-180.0, 0.0, 5.0, 1.0).unwrap();
        assert!((amplitude - power).abs() < 1e-9);
    }

    #[test]
    fn test_known_value() {
        // 20*log10(2.5) + 180
        let db = end_to_end_gain_db(-180.0, 0.0, 5.0, 1.0).unwrap();
        assert!((db - 187.958_800_173_440_75).abs() < 1e-9);
    }

    #[test]
    fn test_monotonic_in_sensitivity_and_gain() {
        let base = end_to_end_gain_db(-180.0, 10.0, 2.0, 1.0).unwrap();
        let more_sensitive = end_to_end_gain_db(-179.0, 10.0, 2.0, 1.0).unwrap();
        let more_gain = end_to_end_gain_db(-180.0, 11.0, 2.0, 1.0).unwrap();
        assert!(more_sensitive < base);
        assert!(more_gain < base);
    }

    #[test]
    fn test_zero_denominator_is_domain_error() {
        let result = gain_upa(-180.0, 0.0, 2.0, 0.0);
        assert!(matches!(result, Err(CalibrationError::Domain(_))));
    }

    #[test]
    fn test_amplification_to_db() {
        assert!((amplification_to_db(1.0)).abs() < 1e-12);
        assert!((amplification_to_db(10.0) - 20.0).abs() < 1e-12);
    }
}
