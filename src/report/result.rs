//! Per-file and per-mission result types

use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::PathBuf;

use crate::core::recording::LevelDistribution;
use crate::core::tone::ToneSegment;
use crate::error::CalibrationError;

/// Calibrated summary of one recording
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub device: String,
    pub start: Option<NaiveDateTime>,
    pub sample_rate: f64,
    pub duration_secs: f64,
    pub sensitivity_db: f64,
    pub preamp_gain_db: f64,
    pub end_to_end_gain_db: f64,
    /// Tone used to recalibrate the device for this file
    pub tone: Option<ToneSegment>,
    pub rms_db: Option<f64>,
    pub levels: Option<LevelDistribution>,
}

/// Outcome of processing one file of a mission
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Processed(FileReport),
    Failed {
        path: PathBuf,
        kind: String,
        message: String,
    },
}

impl FileOutcome {
    pub fn failed(path: impl Into<PathBuf>, error: &CalibrationError) -> Self {
        FileOutcome::Failed {
            path: path.into(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        match self {
            FileOutcome::Processed(report) => &report.path,
            FileOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, FileOutcome::Processed(_))
    }
}

/// All file outcomes of a mission, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct MissionReport {
    pub outcomes: Vec<FileOutcome>,
}

impl MissionReport {
    pub fn new(outcomes: Vec<FileOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn processed(&self) -> impl Iterator<Item = &FileReport> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Processed(report) => Some(report),
            FileOutcome::Failed { .. } => None,
        })
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_processed())
    }

    pub fn processed_count(&self) -> usize {
        self.processed().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}
