//! Frequency-dependent calibration
//!
//! A [`CalibrationCurve`] holds the tabulated sensitivity of a hydrophone as a
//! function of frequency. [`FrequencyCalibrationTable::increment_for`] turns it
//! into a per-frequency dB increment relative to the flat, single-number
//! calibration of the owning device.
//!
//! ## Ordering contract
//!
//! `increment_for` splits the query into three partitions (below the table,
//! inside it, above it), processes each independently and concatenates them
//! in that fixed order. Each output pair carries its frequency, so the
//! association is never lost, but the *positions* only match the input when
//! the query is sorted ascending. Callers with unsorted queries must sort
//! first or look results up by frequency.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{CalResult, CalibrationError};

/// Ordered (frequency, sensitivity) points, frequency strictly increasing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationCurve {
    frequencies: Vec<f64>,
    sensitivities: Vec<f64>,
}

impl CalibrationCurve {
    /// Build from points already sorted by frequency
    pub fn new(points: Vec<(f64, f64)>) -> CalResult<Self> {
        if points.len() < 2 {
            return Err(CalibrationError::Format(format!(
                "calibration curve needs at least 2 points, got {}",
                points.len()
            )));
        }

        for (i, &(f, s)) in points.iter().enumerate() {
            if !f.is_finite() || !s.is_finite() {
                return Err(CalibrationError::Format(format!(
                    "non-finite calibration point at row {i}: ({f}, {s})"
                )));
            }
        }

        for pair in points.windows(2) {
            let (prev, next) = (pair[0].0, pair[1].0);
            if next == prev {
                return Err(CalibrationError::Format(format!(
                    "duplicate calibration frequency {next} Hz"
                )));
            }
            if next < prev {
                return Err(CalibrationError::Format(format!(
                    "calibration frequencies not increasing: {prev} Hz before {next} Hz"
                )));
            }
        }

        let (frequencies, sensitivities) = points.into_iter().unzip();
        Ok(Self {
            frequencies,
            sensitivities,
        })
    }

    /// Sort points by frequency, then validate
    pub fn from_unsorted(mut points: Vec<(f64, f64)>) -> CalResult<Self> {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self::new(points)
    }

    pub fn min_frequency(&self) -> f64 {
        self.frequencies[0]
    }

    pub fn max_frequency(&self) -> f64 {
        self.frequencies[self.frequencies.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.frequencies
            .iter()
            .copied()
            .zip(self.sensitivities.iter().copied())
    }

    /// Linearly interpolated sensitivity, `None` outside the table range
    pub fn sensitivity_at(&self, frequency: f64) -> Option<f64> {
        if frequency < self.min_frequency() || frequency > self.max_frequency() {
            return None;
        }

        // First knot >= frequency
        let upper = self.frequencies.partition_point(|&f| f < frequency);
        if self.frequencies[upper] == frequency {
            return Some(self.sensitivities[upper]);
        }

        let lower = upper - 1;
        let (f0, f1) = (self.frequencies[lower], self.frequencies[upper]);
        let (s0, s1) = (self.sensitivities[lower], self.sensitivities[upper]);
        Some(s0 + (s1 - s0) * (frequency - f0) / (f1 - f0))
    }
}

impl<'de> Deserialize<'de> for CalibrationCurve {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            frequencies: Vec<f64>,
            sensitivities: Vec<f64>,
        }

        let raw = Raw::deserialize(deserializer)?;
        if raw.frequencies.len() != raw.sensitivities.len() {
            return Err(serde::de::Error::custom(
                "frequencies and sensitivities differ in length",
            ));
        }
        let points = raw.frequencies.into_iter().zip(raw.sensitivities).collect();
        CalibrationCurve::new(points).map_err(serde::de::Error::custom)
    }
}

/// Column layout of a delimited calibration table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableFormat {
    /// Field separator, e.g. ',' ';' or '\t'
    pub separator: char,
    /// Zero-based column holding the frequency in Hz
    pub frequency_column: usize,
    /// Zero-based column holding the sensitivity in dB
    pub sensitivity_column: usize,
    /// Zero-based index of the first row that may contain data
    pub first_data_row: usize,
}

impl Default for TableFormat {
    fn default() -> Self {
        Self {
            separator: ',',
            frequency_column: 0,
            sensitivity_column: 1,
            first_data_row: 0,
        }
    }
}

impl TableFormat {
    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn columns(mut self, frequency: usize, sensitivity: usize) -> Self {
        self.frequency_column = frequency;
        self.sensitivity_column = sensitivity;
        self
    }

    pub fn first_data_row(mut self, row: usize) -> Self {
        self.first_data_row = row;
        self
    }
}

/// Parse delimited text into a calibration curve
///
/// Rows before `first_data_row`, blank rows and rows whose selected cells are
/// not numeric (labels, units, repeated headers) are dropped.
pub fn parse_calibration_table(text: &str, format: &TableFormat) -> CalResult<CalibrationCurve> {
    let mut points = Vec::new();

    for (row, line) in text.lines().enumerate().skip(format.first_data_row) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let cells: Vec<&str> = line.split(format.separator).map(str::trim).collect();
        let frequency = cells.get(format.frequency_column).and_then(|c| c.parse::<f64>().ok());
        let sensitivity = cells.get(format.sensitivity_column).and_then(|c| c.parse::<f64>().ok());

        match (frequency, sensitivity) {
            (Some(f), Some(s)) => points.push((f, s)),
            _ => debug!("Stripping non-numeric calibration row {}: {:?}", row, line),
        }
    }

    CalibrationCurve::from_unsorted(points)
}

/// Load a delimited calibration table from disk
pub fn load_calibration_table(path: &Path, format: &TableFormat) -> CalResult<CalibrationCurve> {
    let text = fs::read_to_string(path).map_err(|e| CalibrationError::io(path, e))?;
    parse_calibration_table(&text, format)
        .map_err(|e| CalibrationError::Format(format!("{}: {}", path.display(), e)))
}

/// A calibration curve bound to the flat end-to-end gain of its device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyCalibrationTable {
    curve: CalibrationCurve,
}

impl FrequencyCalibrationTable {
    pub fn new(curve: CalibrationCurve) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> &CalibrationCurve {
        &self.curve
    }

    /// Per-frequency increment relative to the flat calibration
    ///
    /// In-range frequencies get `sensitivity(f) - (-flat_gain_db)`; frequencies
    /// outside the table get exactly `0.0`. See the module docs for the
    /// output ordering contract.
    pub fn increment_for(&self, frequencies: &[f64], flat_gain_db: f64) -> CalResult<Vec<(f64, f64)>> {
        if let Some(bad) = frequencies.iter().find(|f| !f.is_finite()) {
            return Err(CalibrationError::Domain(format!(
                "cannot compute increment for frequency {bad}"
            )));
        }

        let min = self.curve.min_frequency();
        let max = self.curve.max_frequency();

        let below = frequencies.iter().filter(|&&f| f < min).map(|&f| (f, 0.0));
        let above = frequencies.iter().filter(|&&f| f > max).map(|&f| (f, 0.0));

        // sensitivity_at is the range test for the middle partition
        let flat_sensitivity = -flat_gain_db;
        let within = frequencies.iter().filter_map(|&f| {
            self.curve
                .sensitivity_at(f)
                .map(|sensitivity| (f, sensitivity - flat_sensitivity))
        });

        Ok(below.chain(within).chain(above).collect())
    }
}
