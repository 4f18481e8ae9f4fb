//! Mission-level batch processing
//!
//! A mission is every recording a deployment produced. The shared options are
//! checked once with [`MissionOptions::validate`]; an invalid template aborts
//! the batch before any file is read. After that, files are processed
//! independently and in parallel, and anything that goes wrong with one file
//! (unreadable audio, a malformed header, no usable tone, a channel the file
//! does not have) becomes a [`FileOutcome::Failed`] entry while the rest of
//! the batch goes on.

use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::device::{devices_from_header, Device, HeaderDeviceParams};
use super::header::decode_header_file;
use super::recording::Recording;
use super::tone::ToneDetector;
use crate::error::{CalResult, CalibrationError};
use crate::report::{FileOutcome, FileReport, MissionReport};

/// Extensions recognised as recordings
pub const AUDIO_EXTENSIONS: [&str; 2] = ["wav", "flac"];

/// Where each file's device comes from
#[derive(Debug, Clone)]
pub enum DeviceSource {
    /// The same device for every file
    Fixed(Device),
    /// Derived from each file's embedded header
    Header(HeaderDeviceParams),
}

/// What to do with every file of a mission
#[derive(Debug, Clone)]
pub struct MissionOptions {
    pub source: DeviceSource,
    /// Recalibrate from the tone recorded in each file
    pub detector: Option<ToneDetector>,
    pub percentiles: Vec<f64>,
    pub channel: usize,
}

impl MissionOptions {
    pub fn new(device: Device) -> Self {
        Self::with_source(DeviceSource::Fixed(device))
    }

    pub fn from_header(params: HeaderDeviceParams) -> Self {
        Self::with_source(DeviceSource::Header(params))
    }

    fn with_source(source: DeviceSource) -> Self {
        Self {
            source,
            detector: None,
            percentiles: vec![5.0, 50.0, 95.0],
            channel: 0,
        }
    }

    pub fn calibrate(mut self, detector: ToneDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.percentiles = percentiles;
        self
    }

    pub fn channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    /// Check the parameters shared by every file
    pub fn validate(&self) -> CalResult<()> {
        if let Some(bad) = self.percentiles.iter().find(|p| !(0.0..=100.0).contains(*p)) {
            return Err(CalibrationError::Configuration(format!(
                "percentile {bad} outside 0..=100"
            )));
        }

        let Some(detector) = &self.detector else {
            return Ok(());
        };
        let min_duration = detector.min_duration_secs();
        if !min_duration.is_finite() || min_duration < 0.0 {
            return Err(CalibrationError::Configuration(format!(
                "minimum tone duration must be a non-negative number of seconds, got {min_duration}"
            )));
        }
        let has_strategy = match &self.source {
            DeviceSource::Fixed(device) => device.tone_calibration().is_some(),
            DeviceSource::Header(params) => params.tone_calibration.is_some(),
        };
        if !has_strategy {
            return Err(CalibrationError::Configuration(
                "tone calibration requested but the device has no tone calibration strategy".into(),
            ));
        }
        Ok(())
    }
}

fn is_recording(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Recordings under `root`, sorted by path
pub fn collect_recordings(root: &Path) -> CalResult<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(CalibrationError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "mission path does not exist"),
        ));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_recording(entry.path()))
        .map(|entry| entry.path().to_path_buf())
        .collect();
    files.sort();
    Ok(files)
}

/// Runs a mission over many recordings
#[derive(Debug, Clone)]
pub struct MissionProcessor {
    options: MissionOptions,
    show_progress: bool,
}

impl MissionProcessor {
    pub fn new(options: MissionOptions) -> Self {
        Self {
            options,
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn options(&self) -> &MissionOptions {
        &self.options
    }

    fn device_for(&self, path: &Path) -> CalResult<Device> {
        let params = match &self.options.source {
            DeviceSource::Fixed(device) => return Ok(device.clone()),
            DeviceSource::Header(params) => params,
        };

        let record = decode_header_file(path)?;
        let mut devices = devices_from_header(&record, params)?.into_vec();
        if devices.len() == 1 {
            return Ok(devices.remove(0));
        }
        let count = devices.len();
        devices.into_iter().nth(self.options.channel).ok_or_else(|| {
            CalibrationError::Configuration(format!(
                "{}: channel index {} but the header derives {} devices",
                path.display(),
                self.options.channel,
                count
            ))
        })
    }

    /// Calibrate and summarise one recording
    pub fn process_file(&self, path: &Path) -> CalResult<FileReport> {
        let device = self.device_for(path)?;
        let mut recording = Recording::open(path, device, self.options.channel)?;

        let tone = match &self.options.detector {
            Some(detector) => Some(recording.calibrate(detector)?),
            None => None,
        };

        let rms_db = match recording.rms_db() {
            Ok(level) => Some(level),
            Err(CalibrationError::Domain(reason)) => {
                info!("{}: no RMS level ({})", path.display(), reason);
                None
            }
            Err(e) => return Err(e),
        };
        let levels = if self.options.percentiles.is_empty() || rms_db.is_none() {
            None
        } else {
            Some(recording.level_distribution(&self.options.percentiles)?)
        };

        let device = recording.device();
        Ok(FileReport {
            path: path.to_path_buf(),
            device: device.name().to_string(),
            start: recording.start(),
            sample_rate: recording.sample_rate(),
            duration_secs: recording.duration_secs(),
            sensitivity_db: device.sensitivity(),
            preamp_gain_db: device.preamp_gain(),
            end_to_end_gain_db: device.end_to_end_gain_db()?,
            tone,
            rms_db,
            levels,
        })
    }

    fn outcome(&self, path: &Path) -> FileOutcome {
        match self.process_file(path) {
            Ok(report) => FileOutcome::Processed(report),
            Err(e) => {
                if e.is_recoverable() {
                    warn!("Skipping {}: {}", path.display(), e);
                } else {
                    error!("Skipping {} ({} error): {}", path.display(), e.kind(), e);
                }
                FileOutcome::failed(path, &e)
            }
        }
    }

    /// Process files in parallel; outcomes keep the input order
    ///
    /// Only an invalid set of options is an error. Every file, however it
    /// ends, has one outcome in the report.
    pub fn process(&self, files: &[PathBuf]) -> CalResult<MissionReport> {
        self.options.validate()?;

        let outcomes: Vec<FileOutcome> = if self.show_progress {
            let pb = ProgressBar::new(files.len() as u64);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            let outcomes = files
                .par_iter()
                .progress_with(pb.clone())
                .map(|path| self.outcome(path))
                .collect::<Vec<_>>();
            pb.finish_and_clear();
            outcomes
        } else {
            files.par_iter().map(|path| self.outcome(path)).collect()
        };

        let report = MissionReport::new(outcomes);
        info!(
            "Mission: {} processed, {} failed",
            report.processed_count(),
            report.failed_count()
        );
        Ok(report)
    }

    /// Collect and process every recording under `root`
    pub fn process_dir(&self, root: &Path) -> CalResult<MissionReport> {
        let files = collect_recordings(root)?;
        info!("Found {} recording(s) under {}", files.len(), root.display());
        self.process(&files)
    }
}
