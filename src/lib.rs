//! hydrocal - Calibration engine for underwater acoustic recorders
//!
//! Converts raw hydrophone recordings into calibrated sound pressure from
//! the recorder's sensitivity, preamp gain and ADC voltage range.
//!
//! ## Features
//!
//! - **End-to-end gain model**: sensitivity, preamp gain and Vpp to µPa
//! - **Tone calibration**: locate a calibration tone and correct the preamp gain
//! - **Frequency response**: interpolated sensitivity curves and per-frequency increments
//! - **Embedded headers**: self-configure multi-channel recorders from their files
//! - **Mission batches**: process a whole deployment in parallel, skipping bad files
//!
//! ## Module Structure
//!
//! - `core` - Gain model, tone detector, calibration tables, header decoder, devices
//! - `cli` - Command-line interface
//! - `config` - Device presets and JSON device descriptions
//! - `report` - Per-file and mission result types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hydrocal::core::{Device, DeviceKind, ToneDetector};
//!
//! let device = Device::builder("uPam", "uPam")
//!     .kind(DeviceKind::UPam)
//!     .sensitivity(-196.0)
//!     .vpp(20.0)
//!     .build()?;
//! println!("End-to-end gain: {:.2} dB", device.end_to_end_gain_db()?);
//! ```
//!
//! ## Device Presets
//!
//! | Preset       | Recorder                       | Defaults                      |
//! |--------------|--------------------------------|-------------------------------|
//! | soundtrap    | Ocean Instruments SoundTrap    | 2 Vpp, 0 dB, per-unit lookup  |
//! | rtsys        | RTSys                          | 5 Vpp, header self-configured |
//! | bk           | B&K on Nexus amplifier         | gain from amplification       |
//! | upam         | Seiche uPam                    | 20 Vpp                        |
//! | iclisten     | Ocean Sonics icListen          | 6 Vpp                         |

// Core calibration functionality
pub mod core;

// Command-line interface
pub mod cli;

// Configuration and presets
pub mod config;

// Result types
pub mod report;

pub mod error;

// Re-export commonly used types at crate root for convenience
pub use config::{DeviceConfig, DevicePreset};
pub use core::{
    Device, DeviceBuilder, DeviceKind, FrequencyCalibrationTable, HeaderRecord, MissionOptions, MissionProcessor,
    ToneCalibration, ToneDetector, ToneSegment,
};
pub use error::{CalResult, CalibrationError};
pub use report::{FileOutcome, FileReport, MissionReport};
