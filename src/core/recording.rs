//! A recording bound to the device that made it

use chrono::NaiveDateTime;
use log::debug;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::decoder::{decode_audio, AudioData};
use super::device::Device;
use super::dsp::stats::{mean_square, quantile_sorted};
use super::dsp::Envelope;
use super::tone::{ToneDetector, ToneSegment};
use crate::error::{CalResult, CalibrationError};

/// Summary of per-sample sound-pressure levels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelDistribution {
    pub min_db: f64,
    pub max_db: f64,
    /// `(percentile, level)` pairs in request order
    pub percentiles: Vec<(f64, f64)>,
}

/// One channel of a decoded recording and its calibrated device
#[derive(Debug, Clone)]
pub struct Recording {
    path: PathBuf,
    signal: Vec<f64>,
    sample_rate: f64,
    device: Device,
    start: Option<NaiveDateTime>,
}

impl Recording {
    /// Decode `path` and keep the given channel
    pub fn open(path: &Path, device: Device, channel: usize) -> CalResult<Self> {
        let audio = decode_audio(path)?;
        Self::from_audio(path, &audio, device, channel)
    }

    pub fn from_audio(path: &Path, audio: &AudioData, device: Device, channel: usize) -> CalResult<Self> {
        let signal = audio.channel(channel)?;
        Ok(Self::from_samples(path, signal, audio.sample_rate as f64, device))
    }

    /// Wrap samples already normalised to full scale
    pub fn from_samples(path: &Path, signal: Vec<f64>, sample_rate: f64, device: Device) -> Self {
        let start = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|name| match device.recording_datetime(name) {
                Ok(start) => Some(start),
                Err(e) => {
                    debug!("No recording time for {}: {}", path.display(), e);
                    None
                }
            });

        Self {
            path: path.to_path_buf(),
            signal,
            sample_rate,
            device,
            start,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn signal(&self) -> &[f64] {
        &self.signal
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.start
    }

    pub fn duration_secs(&self) -> f64 {
        self.signal.len() as f64 / self.sample_rate
    }

    /// Recalibrate the device from the tone recorded in this file
    pub fn calibrate<E: Envelope>(&mut self, detector: &ToneDetector<E>) -> CalResult<ToneSegment> {
        self.device.calibrate(&self.signal, self.sample_rate, detector)
    }

    /// Sound pressure in µPa
    pub fn to_upa(&self) -> CalResult<Vec<f64>> {
        let gain = self.device.gain_upa()?;
        Ok(self.signal.iter().map(|&s| s * gain).collect())
    }

    /// Per-sample level `20*log10(|p| / p_ref)`, `-inf` for silent samples
    pub fn spl_db(&self) -> CalResult<Vec<f64>> {
        let p_ref = self.device.p_ref();
        Ok(self
            .to_upa()?
            .into_iter()
            .map(|p| 20.0 * (p.abs() / p_ref).log10())
            .collect())
    }

    /// Broadband RMS level `10*log10(mean(p²) / p_ref²)`
    pub fn rms_db(&self) -> CalResult<f64> {
        if self.signal.is_empty() {
            return Err(CalibrationError::Domain("RMS level of an empty recording".into()));
        }
        let p_ref = self.device.p_ref();
        let power = mean_square(&self.to_upa()?) / (p_ref * p_ref);
        if !(power > 0.0) {
            return Err(CalibrationError::Domain(format!(
                "{} is silent, RMS level undefined",
                self.path.display()
            )));
        }
        Ok(10.0 * power.log10())
    }

    /// Minimum, maximum and percentiles (0-100) of the finite per-sample levels
    pub fn level_distribution(&self, percentiles: &[f64]) -> CalResult<LevelDistribution> {
        if let Some(bad) = percentiles.iter().find(|p| !(0.0..=100.0).contains(*p)) {
            return Err(CalibrationError::Configuration(format!(
                "percentile {bad} outside 0..=100"
            )));
        }

        let mut levels: Vec<f64> = self.spl_db()?.into_iter().filter(|l| l.is_finite()).collect();
        if levels.is_empty() {
            return Err(CalibrationError::Domain(format!(
                "{} has no finite sound-pressure levels",
                self.path.display()
            )));
        }
        levels.sort_by(f64::total_cmp);

        let percentiles = percentiles
            .iter()
            .map(|&p| -> CalResult<(f64, f64)> {
                let level = quantile_sorted(&levels, p / 100.0)
                    .ok_or_else(|| CalibrationError::Domain(format!("percentile {p} undefined")))?;
                Ok((p, level))
            })
            .collect::<CalResult<Vec<_>>>()?;

        Ok(LevelDistribution {
            min_db: levels[0],
            max_db: levels[levels.len() - 1],
            percentiles,
        })
    }

    /// Add the device's frequency increments to a `(frequency, dB)` spectrum
    ///
    /// The output keeps the order of `spectrum`.
    pub fn apply_frequency_increments(&self, spectrum: &[(f64, f64)]) -> CalResult<Vec<(f64, f64)>> {
        spectrum
            .iter()
            .map(|&(f, level)| -> CalResult<(f64, f64)> {
                let increment = self
                    .device
                    .increment_for(&[f])?
                    .first()
                    .map_or(0.0, |&(_, inc)| inc);
                Ok((f, level + increment))
            })
            .collect()
    }
}
