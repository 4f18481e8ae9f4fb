// src/config/devices.rs
//
// Recorder presets and JSON device descriptions

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::device::{
    ChannelSelector, Device, DeviceBuilder, DeviceKind, GainType, HeaderDeviceParams, RtSysMode,
    RTSYS_VPP,
};
use crate::core::frequency::{load_calibration_table, FrequencyCalibrationTable, TableFormat};
use crate::core::header::Channel;
use crate::core::tone::{ToneCalibration, ToneType};
use crate::error::{CalResult, CalibrationError};

/// Preset recorder families with their factory defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DevicePreset {
    /// Ocean Instruments SoundTrap
    #[serde(rename = "soundtrap")]
    SoundTrap,
    /// SoundTrap with the high-frequency option
    #[serde(rename = "soundtrap-hf")]
    SoundTrapHf,
    /// RTSys multi-channel recorder
    #[serde(rename = "rtsys")]
    RtSys,
    /// Brüel & Kjær hydrophone on a Nexus conditioning amplifier
    #[serde(rename = "bk")]
    Bk,
    /// Seiche recorder
    #[serde(rename = "seiche")]
    Seiche,
    /// Seiche uPam
    #[serde(rename = "upam")]
    Upam,
    /// MTE Aural
    #[serde(rename = "aural")]
    Aural,
    /// uAural
    #[serde(rename = "uaural")]
    Uaural,
    /// JASCO AMAR G3
    #[serde(rename = "amar")]
    Amar,
    /// AMAR G3 with a MEMS accelerometer
    #[serde(rename = "amar-mems")]
    AmarMems,
    /// Ocean Sonics icListen
    #[serde(rename = "iclisten")]
    Iclisten,
}

impl DevicePreset {
    pub fn all() -> Vec<Self> {
        vec![
            Self::SoundTrap,
            Self::SoundTrapHf,
            Self::RtSys,
            Self::Bk,
            Self::Seiche,
            Self::Upam,
            Self::Aural,
            Self::Uaural,
            Self::Amar,
            Self::AmarMems,
            Self::Iclisten,
        ]
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().replace('_', "-").as_str() {
            "soundtrap" | "st" => Some(Self::SoundTrap),
            "soundtrap-hf" | "st-hf" => Some(Self::SoundTrapHf),
            "rtsys" => Some(Self::RtSys),
            "bk" | "bruel-kjaer" | "nexus" => Some(Self::Bk),
            "seiche" => Some(Self::Seiche),
            "upam" => Some(Self::Upam),
            "aural" | "mte" => Some(Self::Aural),
            "uaural" => Some(Self::Uaural),
            "amar" => Some(Self::Amar),
            "amar-mems" => Some(Self::AmarMems),
            "iclisten" => Some(Self::Iclisten),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SoundTrap => "soundtrap",
            Self::SoundTrapHf => "soundtrap-hf",
            Self::RtSys => "rtsys",
            Self::Bk => "bk",
            Self::Seiche => "seiche",
            Self::Upam => "upam",
            Self::Aural => "aural",
            Self::Uaural => "uaural",
            Self::Amar => "amar",
            Self::AmarMems => "amar-mems",
            Self::Iclisten => "iclisten",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::SoundTrap => "SoundTrap, 2 Vpp, sensitivity per unit",
            Self::SoundTrapHf => "SoundTrap HF, 2 Vpp, sensitivity per unit",
            Self::RtSys => "RTSys, self-configured from the embedded header",
            Self::Bk => "B&K on Nexus amplifier, gain from amplification and tone",
            Self::Seiche => "Seiche recorder",
            Self::Upam => "Seiche uPam, 20 Vpp",
            Self::Aural => "MTE Aural M2",
            Self::Uaural => "uAural",
            Self::Amar => "AMAR G3",
            Self::AmarMems => "AMAR G3 with MEMS accelerometer",
            Self::Iclisten => "icListen, 6 Vpp",
        }
    }

    /// Model-specific parameters before overrides
    pub fn default_kind(&self) -> DeviceKind {
        match self {
            Self::SoundTrap => DeviceKind::SoundTrap {
                gain_type: GainType::High,
                high_frequency: false,
            },
            Self::SoundTrapHf => DeviceKind::SoundTrap {
                gain_type: GainType::High,
                high_frequency: true,
            },
            Self::RtSys => DeviceKind::RtSys {
                mode: RtSysMode::LowPower,
                channel: Channel::A,
            },
            Self::Bk => DeviceKind::BruelKjaer {
                amplification: 1.0,
                tone: ToneType::Reference,
            },
            Self::Seiche => DeviceKind::Seiche,
            Self::Upam => DeviceKind::UPam,
            Self::Aural => DeviceKind::Mte,
            Self::Uaural => DeviceKind::UAural,
            Self::Amar => DeviceKind::AmarG3 { mems_sensitivity: None },
            Self::AmarMems => DeviceKind::AmarG3 {
                mems_sensitivity: Some(0.0),
            },
            Self::Iclisten => DeviceKind::IcListen,
        }
    }

    pub fn default_vpp(&self) -> f64 {
        match self {
            Self::Upam => 20.0,
            Self::Iclisten => 6.0,
            Self::RtSys => RTSYS_VPP,
            _ => 2.0,
        }
    }

    /// Builder pre-filled with the preset defaults
    pub fn builder(&self, name: impl Into<String>, model: impl Into<String>) -> DeviceBuilder {
        DeviceBuilder::new(name, model)
            .kind(self.default_kind())
            .preamp_gain(0.0)
            .vpp(self.default_vpp())
    }
}

/// Calibration table file with its column layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSource {
    pub path: PathBuf,
    #[serde(default)]
    pub format: TableFormat,
}

/// Settings for deriving devices from an embedded header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderSettings {
    #[serde(default = "default_mode")]
    pub mode: RtSysMode,
    #[serde(default = "default_selector")]
    pub channel: ChannelSelector,
}

fn default_mode() -> RtSysMode {
    RtSysMode::LowPower
}

fn default_selector() -> ChannelSelector {
    ChannelSelector::All
}

/// JSON description of one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub preset: DevicePreset,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub sensitivity: Option<f64>,
    #[serde(default)]
    pub preamp_gain: Option<f64>,
    #[serde(default)]
    pub vpp: Option<f64>,
    #[serde(default)]
    pub p_ref: Option<f64>,
    /// SoundTrap gain setting
    #[serde(default)]
    pub gain_type: Option<GainType>,
    /// B&K amplification, V/Pa
    #[serde(default)]
    pub amplification: Option<f64>,
    /// B&K tone type
    #[serde(default)]
    pub tone: Option<ToneType>,
    #[serde(default)]
    pub mems_sensitivity: Option<f64>,
    #[serde(default)]
    pub mode: Option<RtSysMode>,
    #[serde(default)]
    pub channel: Option<Channel>,
    #[serde(default)]
    pub tone_calibration: Option<ToneCalibration>,
    #[serde(default)]
    pub calibration_table: Option<TableSource>,
    #[serde(default)]
    pub header: Option<HeaderSettings>,
}

impl DeviceConfig {
    pub fn new(preset: DevicePreset) -> Self {
        Self {
            preset,
            name: None,
            model: None,
            serial_number: None,
            sensitivity: None,
            preamp_gain: None,
            vpp: None,
            p_ref: None,
            gain_type: None,
            amplification: None,
            tone: None,
            mems_sensitivity: None,
            mode: None,
            channel: None,
            tone_calibration: None,
            calibration_table: None,
            header: None,
        }
    }

    pub fn from_json_str(text: &str) -> CalResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| CalibrationError::Configuration(format!("invalid device configuration: {e}")))
    }

    /// Load a configuration; relative table paths resolve against its directory
    pub fn load(path: &Path) -> CalResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CalibrationError::io(path, e))?;
        let mut config = Self::from_json_str(&text)?;
        if let (Some(table), Some(dir)) = (config.calibration_table.as_mut(), path.parent()) {
            if table.path.is_relative() {
                table.path = dir.join(&table.path);
            }
        }
        debug!("Loaded {} device configuration from {}", config.preset.name(), path.display());
        Ok(config)
    }

    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.preset.name().to_string())
    }

    fn model_name(&self) -> String {
        self.model.clone().unwrap_or_else(|| self.preset.name().to_string())
    }

    /// Preset kind with this configuration's overrides applied
    pub fn kind(&self) -> CalResult<DeviceKind> {
        let mut kind = self.preset.default_kind();
        match &mut kind {
            DeviceKind::SoundTrap { gain_type, .. } => {
                if let Some(g) = self.gain_type {
                    *gain_type = g;
                }
            }
            DeviceKind::BruelKjaer { amplification, tone } => {
                if let Some(a) = self.amplification {
                    *amplification = a;
                }
                if let Some(t) = self.tone {
                    *tone = t;
                }
            }
            DeviceKind::RtSys { mode, channel } => {
                if let Some(m) = self.mode {
                    *mode = m;
                }
                if let Some(c) = self.channel {
                    *channel = c;
                }
            }
            DeviceKind::AmarG3 { mems_sensitivity } => {
                if self.mems_sensitivity.is_some() {
                    *mems_sensitivity = self.mems_sensitivity;
                }
            }
            _ => {}
        }

        if self.amplification.is_some() && !matches!(kind, DeviceKind::BruelKjaer { .. }) {
            return Err(CalibrationError::Configuration(format!(
                "amplification only applies to B&K devices, not {}",
                self.preset.name()
            )));
        }
        Ok(kind)
    }

    fn frequency_table(&self) -> CalResult<Option<FrequencyCalibrationTable>> {
        self.calibration_table
            .as_ref()
            .map(|source| {
                load_calibration_table(&source.path, &source.format).map(FrequencyCalibrationTable::new)
            })
            .transpose()
    }

    /// Build the configured device
    pub fn build_device(&self) -> CalResult<Device> {
        let mut builder = self
            .preset
            .builder(self.display_name(), self.model_name())
            .kind(self.kind()?)
            .serial_number(self.serial_number.clone().unwrap_or_default());

        if let Some(s) = self.sensitivity {
            builder = builder.sensitivity(s);
        }
        if let Some(g) = self.preamp_gain {
            builder = builder.preamp_gain(g);
        }
        if let Some(v) = self.vpp {
            builder = builder.vpp(v);
        }
        if let Some(p) = self.p_ref {
            builder = builder.p_ref(p);
        }
        if let Some(calibration) = self.tone_calibration {
            builder = builder.tone_calibration(calibration);
        }
        if let Some(table) = self.frequency_table()? {
            builder = builder.frequency_table(table);
        }
        builder.build()
    }

    /// Header-derivation parameters, when this device self-configures
    pub fn header_params(&self) -> Option<HeaderDeviceParams> {
        self.header.as_ref().map(|settings| HeaderDeviceParams {
            name: self.display_name(),
            model: self.model_name(),
            serial_number: self.serial_number.clone(),
            vpp: self.vpp.unwrap_or_else(|| self.preset.default_vpp()),
            mode: settings.mode,
            channel: settings.channel,
            tone_calibration: self.tone_calibration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_names_round_trip() {
        for preset in DevicePreset::all() {
            assert_eq!(DevicePreset::from_name(preset.name()), Some(preset));
            assert!(!preset.description().is_empty());
        }
        assert_eq!(DevicePreset::from_name("SoundTrap_HF"), Some(DevicePreset::SoundTrapHf));
        assert_eq!(DevicePreset::from_name("hydromoth"), None);
    }

    #[test]
    fn test_upam_config() {
        let config = DeviceConfig::from_json_str(
            r#"{"preset": "upam", "name": "Seiche", "sensitivity": -196.0, "serial_number": "SN23"}"#,
        )
        .unwrap();
        let device = config.build_device().unwrap();
        assert_eq!(device.vpp(), 20.0);
        assert_eq!(device.sensitivity(), -196.0);
        assert_eq!(device.serial_number(), "SN23");
        assert!(config.header_params().is_none());
    }

    #[test]
    fn test_bk_config() {
        let config = DeviceConfig::from_json_str(
            r#"{"preset": "bk", "amplification": 3.16, "tone": "test"}"#,
        )
        .unwrap();
        let device = config.build_device().unwrap();
        assert_eq!(device.amplification(), Some(3.16));
        assert_eq!(
            device.tone_calibration(),
            Some(&ToneCalibration::TypedTone { tone: ToneType::Test })
        );

        let bad = DeviceConfig::from_json_str(r#"{"preset": "bk", "amplification": 2.0}"#).unwrap();
        assert!(matches!(bad.build_device(), Err(CalibrationError::Configuration(_))));
    }

    #[test]
    fn test_flat_reference_strategy() {
        let config = DeviceConfig::from_json_str(
            r#"{
                "preset": "soundtrap",
                "sensitivity": -172.0,
                "tone_calibration": {"strategy": "flat_reference", "expected_level_db": 120.0}
            }"#,
        )
        .unwrap();
        let device = config.build_device().unwrap();
        assert_eq!(
            device.tone_calibration(),
            Some(&ToneCalibration::FlatReference { expected_level_db: 120.0 })
        );
    }

    #[test]
    fn test_header_settings() {
        let config = DeviceConfig::from_json_str(
            r#"{"preset": "rtsys", "model": "RESEA320", "header": {"mode": "default", "channel": {"only": "B"}}}"#,
        )
        .unwrap();
        let params = config.header_params().unwrap();
        assert_eq!(params.mode, RtSysMode::Default);
        assert_eq!(params.channel, ChannelSelector::Only(Channel::B));
        assert_eq!(params.model, "RESEA320");
        assert_eq!(params.vpp, RTSYS_VPP);
        assert_eq!(params.vpp, DevicePreset::RtSys.default_vpp());

        let direct = HeaderDeviceParams::new("RESEA320", RtSysMode::LowPower, ChannelSelector::All);
        assert_eq!(direct.vpp, params.vpp);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            DeviceConfig::from_json_str(r#"{"preset": "hydromoth"}"#),
            Err(CalibrationError::Configuration(_))
        ));
        let missing = DeviceConfig::new(DevicePreset::Seiche);
        assert!(matches!(missing.build_device(), Err(CalibrationError::Configuration(_))));
        let misplaced = DeviceConfig {
            amplification: Some(1.0),
            sensitivity: Some(-170.0),
            ..DeviceConfig::new(DevicePreset::Seiche)
        };
        assert!(misplaced.build_device().is_err());
    }
}
