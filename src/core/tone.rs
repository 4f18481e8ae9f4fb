//! Calibration tone detection and gain correction
//!
//! A recorder is self-calibrated by recording a known tone, usually at the
//! start of a file. [`ToneDetector`] locates the longest stretch of signal
//! whose envelope stays above a threshold; [`apply_tone`] measures that stretch
//! and corrects the device preamp gain with one of two strategies.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;

use super::device::Device;
use super::dsp::stats::rms;
use super::dsp::{Envelope, HilbertEnvelope};
use crate::error::{CalResult, CalibrationError};

/// Default envelope threshold, fraction of full scale
pub const DEFAULT_THRESHOLD: f64 = 0.05;

/// Half-open sample range `[start, end)` covered by a calibration tone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToneSegment {
    pub start: usize,
    pub end: usize,
}

impl ToneSegment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn duration_secs(&self, sample_rate: f64) -> f64 {
        self.len() as f64 / sample_rate
    }

    /// Samples of the segment within `signal`
    pub fn slice<'a>(&self, signal: &'a [f64]) -> CalResult<&'a [f64]> {
        signal.get(self.start..self.end).ok_or_else(|| {
            CalibrationError::Domain(format!(
                "tone segment {}..{} outside a {}-sample signal",
                self.start,
                self.end,
                signal.len()
            ))
        })
    }
}

/// Locates the calibration tone in a recording
#[derive(Debug, Clone)]
pub struct ToneDetector<E: Envelope = HilbertEnvelope> {
    envelope: E,
    threshold: f64,
    min_duration_secs: f64,
    max_duration_secs: Option<f64>,
}

impl ToneDetector {
    pub fn new(min_duration_secs: f64) -> Self {
        Self {
            envelope: HilbertEnvelope,
            threshold: DEFAULT_THRESHOLD,
            min_duration_secs,
            max_duration_secs: None,
        }
    }
}

impl<E: Envelope> ToneDetector<E> {
    /// Replace the envelope primitive
    pub fn with_envelope<F: Envelope>(self, envelope: F) -> ToneDetector<F> {
        ToneDetector {
            envelope,
            threshold: self.threshold,
            min_duration_secs: self.min_duration_secs,
            max_duration_secs: self.max_duration_secs,
        }
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Only search the first `secs` seconds of the signal
    pub fn max_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = Some(secs);
        self
    }

    pub fn min_duration_secs(&self) -> f64 {
        self.min_duration_secs
    }

    /// Find the longest above-threshold segment
    ///
    /// Returns [`CalibrationError::ToneNotFound`] when the envelope never rises
    /// above the threshold and [`CalibrationError::ToneTooShort`] when the
    /// longest segment is shorter than the minimum duration.
    pub fn detect(&self, samples: &[f64], sample_rate: f64) -> CalResult<ToneSegment> {
        if !(sample_rate > 0.0) {
            return Err(CalibrationError::Configuration(format!(
                "invalid sample rate {sample_rate}"
            )));
        }

        let search = match self.max_duration_secs {
            Some(secs) => {
                let limit = ((secs * sample_rate) as usize).min(samples.len());
                &samples[..limit]
            }
            None => samples,
        };

        let envelope = self.envelope.envelope(search);
        let mask: Vec<bool> = envelope.iter().map(|&e| e >= self.threshold).collect();
        let pairs = matched_edges(&mask);

        let segment = longest_segment(&pairs).ok_or(CalibrationError::ToneNotFound)?;
        let duration_secs = segment.duration_secs(sample_rate);
        if duration_secs < self.min_duration_secs {
            return Err(CalibrationError::ToneTooShort {
                duration_secs,
                min_duration_secs: self.min_duration_secs,
            });
        }

        info!(
            "Calibration tone at samples {}..{} ({:.3}s)",
            segment.start, segment.end, duration_secs
        );
        Ok(segment)
    }
}

/// Pair rising and falling edges of a threshold mask
///
/// A falling edge before the first rising edge is dropped, then the longer
/// edge list is truncated to the shorter one.
fn matched_edges(mask: &[bool]) -> Vec<ToneSegment> {
    let mut rising = Vec::new();
    let mut falling = Vec::new();
    for (i, pair) in mask.windows(2).enumerate() {
        match (pair[0], pair[1]) {
            (false, true) => rising.push(i + 1),
            (true, false) => falling.push(i + 1),
            _ => {}
        }
    }

    debug!("Tone mask: {} rising, {} falling edges", rising.len(), falling.len());

    if rising.is_empty() {
        return Vec::new();
    }
    if let (Some(&first_fall), Some(&first_rise)) = (falling.first(), rising.first()) {
        if first_fall < first_rise {
            falling.remove(0);
        }
    }

    rising
        .into_iter()
        .zip(falling)
        .map(|(start, end)| ToneSegment { start, end })
        .collect()
}

/// Longest segment, first one on ties
fn longest_segment(pairs: &[ToneSegment]) -> Option<ToneSegment> {
    let mut best: Option<ToneSegment> = None;
    for &segment in pairs {
        match best {
            Some(b) if segment.len() <= b.len() => {}
            _ => best = Some(segment),
        }
    }
    best
}

/// Kind of tone emitted by a conditioning amplifier's calibrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToneType {
    /// Reference tone, amplification already normalised
    #[serde(rename = "ref")]
    Reference,
    /// Test tone of the conditioning amplifier
    #[serde(rename = "test")]
    Test,
}

impl ToneType {
    pub fn from_name(name: &str) -> CalResult<Self> {
        match name.to_lowercase().as_str() {
            "ref" | "reference" => Ok(ToneType::Reference),
            "test" => Ok(ToneType::Test),
            other => Err(CalibrationError::Configuration(format!(
                "tone type '{other}' is not implemented"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToneType::Reference => "ref",
            ToneType::Test => "test",
        }
    }
}

/// How a measured tone updates the preamp gain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ToneCalibration {
    /// Conditioning-amplifier convention, depends on the tone type
    TypedTone { tone: ToneType },
    /// Tone of known level in dB re 1 µPa measured through the full chain
    FlatReference { expected_level_db: f64 },
}

impl ToneCalibration {
    /// Preamp gain implied by a tone of the given RMS
    pub fn updated_preamp_gain(&self, device: &Device, tone_rms: f64) -> CalResult<f64> {
        if !(tone_rms > 0.0) || !tone_rms.is_finite() {
            return Err(CalibrationError::Domain(format!(
                "calibration tone RMS {tone_rms} cannot be expressed in dB"
            )));
        }

        let preamp_gain = device.preamp_gain();
        match *self {
            ToneCalibration::TypedTone { tone } => {
                let amplif = 10.0_f64.powf(preamp_gain / 10.0).sqrt() * 1e6;
                let ref_v = match tone {
                    ToneType::Reference => 1.0,
                    ToneType::Test => 100.0 * amplif * SQRT_2,
                };
                Ok(10.0 * ((amplif / 1e6).powi(2)).log10() + 10.0 * ((tone_rms / ref_v).powi(2)).log10())
            }
            ToneCalibration::FlatReference { expected_level_db } => {
                let gain = device.gain_upa()?;
                let real_db = 20.0 * (tone_rms * gain).log10();
                let correction = real_db - expected_level_db;
                Ok(preamp_gain + correction)
            }
        }
    }
}

/// Update the device preamp gain from a detected tone segment
///
/// Returns the new preamp gain.
pub fn apply_tone(
    device: &mut Device,
    signal: &[f64],
    segment: ToneSegment,
    calibration: &ToneCalibration,
) -> CalResult<f64> {
    let tone = segment.slice(signal)?;
    if tone.is_empty() {
        return Err(CalibrationError::Domain("empty calibration tone segment".into()));
    }

    let previous = device.preamp_gain();
    let updated = calibration.updated_preamp_gain(device, rms(tone))?;
    device.set_preamp_gain(updated);
    device.recompute();

    info!(
        "{}: preamp gain {:.3} dB -> {:.3} dB from tone {}..{}",
        device.name(),
        previous,
        updated,
        segment.start,
        segment.end
    );
    Ok(updated)
}
