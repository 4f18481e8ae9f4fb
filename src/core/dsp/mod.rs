//! Digital Signal Processing utilities

pub mod stats;

use num_complex::Complex;
use rustfft::FftPlanner;

/// Amplitude envelope of a real-valued signal
///
/// The tone detector thresholds whatever envelope it is given; the default is
/// the analytic-signal magnitude.
pub trait Envelope {
    /// One envelope value per input sample
    fn envelope(&self, samples: &[f64]) -> Vec<f64>;
}

/// Magnitude of the analytic signal, computed in the frequency domain
///
/// The spectrum of the input is one-sided (negative frequencies zeroed,
/// positive frequencies doubled) and transformed back, giving
/// `x + j·H{x}` for the whole buffer at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct HilbertEnvelope;

impl HilbertEnvelope {
    /// Analytic signal `x + j·H{x}` of the whole buffer
    pub fn analytic_signal(samples: &[f64]) -> Vec<Complex<f64>> {
        let n = samples.len();
        if n == 0 {
            return Vec::new();
        }

        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(n);
        let inverse = planner.plan_fft_inverse(n);

        let mut buffer: Vec<Complex<f64>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        forward.process(&mut buffer);

        // One-sided spectrum weights: DC (and Nyquist for even n) kept once
        let half = n / 2;
        for (k, bin) in buffer.iter_mut().enumerate() {
            let weight = if k == 0 || (n % 2 == 0 && k == half) {
                1.0
            } else if k < (n + 1) / 2 {
                2.0
            } else {
                0.0
            };
            *bin *= weight;
        }

        inverse.process(&mut buffer);

        // rustfft does not normalise the inverse transform
        let scale = 1.0 / n as f64;
        buffer.iter().map(|&c| c * scale).collect()
    }
}

impl Envelope for HilbertEnvelope {
    fn envelope(&self, samples: &[f64]) -> Vec<f64> {
        Self::analytic_signal(samples).iter().map(|c| c.norm()).collect()
    }
}

/// Absolute sample value, no smoothing
#[derive(Debug, Clone, Copy, Default)]
pub struct RectifiedEnvelope;

impl Envelope for RectifiedEnvelope {
    fn envelope(&self, samples: &[f64]) -> Vec<f64> {
        samples.iter().map(|s| s.abs()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_analytic_real_part_is_input() {
        let samples: Vec<f64> = (0..257).map(|i| (i as f64 * 0.37).sin() + 0.1).collect();
        let analytic = HilbertEnvelope::analytic_signal(&samples);
        assert_eq!(analytic.len(), samples.len());
        for (a, &s) in analytic.iter().zip(samples.iter()) {
            assert!((a.re - s).abs() < 1e-9);
        }
    }

    #[test]
    fn test_envelope_of_periodic_cosine_is_flat() {
        // 32 whole periods: the FFT sees a pure tone, so the envelope is exact
        let n = 1024;
        let amplitude = 0.5;
        let samples: Vec<f64> = (0..n)
            .map(|i| amplitude * (2.0 * PI * 32.0 * i as f64 / n as f64).cos())
            .collect();

        let envelope = HilbertEnvelope.envelope(&samples);
        for &e in &envelope {
            assert!((e - amplitude).abs() < 1e-9);
        }
    }

    #[test]
    fn test_envelope_of_silence_is_zero() {
        let envelope = HilbertEnvelope.envelope(&vec![0.0; 100]);
        assert!(envelope.iter().all(|&e| e == 0.0));
        assert!(HilbertEnvelope.envelope(&[]).is_empty());
    }

    #[test]
    fn test_rectified_envelope() {
        let envelope = RectifiedEnvelope.envelope(&[-0.5, 0.25, 0.0]);
        assert_eq!(envelope, vec![0.5, 0.25, 0.0]);
    }
}
