//! Calibration sensitivity lookup by serial number
//!
//! Manufacturers that calibrate every unit publish the sensitivity per serial
//! number. [`CalibrationLookup`] is the seam between device construction and
//! wherever those numbers live; [`StaticLookup`] serves them from a JSON file.

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::device::GainType;
use crate::error::{CalResult, CalibrationError};

/// Source of per-unit sensitivities (dB re 1 V/µPa)
pub trait CalibrationLookup {
    /// High-gain sensitivity of a unit
    fn fetch(&self, serial_number: &str, model: &str) -> CalResult<f64>;

    /// Sensitivity for a gain setting, high gain unless overridden
    fn fetch_for_gain(&self, serial_number: &str, model: &str, gain: GainType) -> CalResult<f64> {
        match gain {
            GainType::High => self.fetch(serial_number, model),
            GainType::Low => Err(CalibrationError::Configuration(format!(
                "no low-gain sensitivity available for {model} {serial_number}"
            ))),
        }
    }
}

/// One unit in a static calibration table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub serial_number: String,
    /// Restricts the entry to one model when set
    #[serde(default)]
    pub model: Option<String>,
    pub high_gain: f64,
    #[serde(default)]
    pub low_gain: Option<f64>,
}

/// In-memory calibration table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticLookup {
    entries: Vec<LookupEntry>,
}

impl StaticLookup {
    pub fn new(entries: Vec<LookupEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json_str(text: &str) -> CalResult<Self> {
        let entries: Vec<LookupEntry> = serde_json::from_str(text)
            .map_err(|e| CalibrationError::Format(format!("calibration lookup: {e}")))?;
        Ok(Self::new(entries))
    }

    pub fn load(path: &Path) -> CalResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CalibrationError::io(path, e))?;
        let lookup = Self::from_json_str(&text)?;
        debug!("Loaded {} calibration entries from {}", lookup.entries.len(), path.display());
        Ok(lookup)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, serial_number: &str, model: &str) -> CalResult<&LookupEntry> {
        self.entries
            .iter()
            .find(|e| {
                e.serial_number == serial_number
                    && e.model.as_deref().map_or(true, |m| m.eq_ignore_ascii_case(model))
            })
            .ok_or_else(|| {
                CalibrationError::Configuration(format!(
                    "serial number {serial_number} ({model}) not in calibration lookup"
                ))
            })
    }
}

impl CalibrationLookup for StaticLookup {
    fn fetch(&self, serial_number: &str, model: &str) -> CalResult<f64> {
        Ok(self.entry(serial_number, model)?.high_gain)
    }

    fn fetch_for_gain(&self, serial_number: &str, model: &str, gain: GainType) -> CalResult<f64> {
        let entry = self.entry(serial_number, model)?;
        match gain {
            GainType::High => Ok(entry.high_gain),
            GainType::Low => entry.low_gain.ok_or_else(|| {
                CalibrationError::Configuration(format!(
                    "no low-gain sensitivity recorded for {model} {serial_number}"
                ))
            }),
        }
    }
}
