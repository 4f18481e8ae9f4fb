//! Configuration module for hydrocal

mod devices;

pub use devices::{DeviceConfig, DevicePreset, HeaderSettings, TableSource};
