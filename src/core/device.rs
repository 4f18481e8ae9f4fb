//! Recording devices and their flat calibration
//!
//! A [`Device`] carries the hydrophone sensitivity, the preamp gain and the
//! ADC input range of one recorder channel. Model-specific parameters live in
//! [`DeviceKind`]; everything downstream only asks the device for its
//! end-to-end gain and, when a frequency table is attached, per-frequency
//! increments.

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::frequency::FrequencyCalibrationTable;
use super::gain::{self, amplification_to_db};
use super::header::{Channel, HeaderRecord};
use super::lookup::CalibrationLookup;
use super::naming;
use super::tone::{apply_tone, ToneCalibration, ToneDetector, ToneSegment, ToneType};
use super::dsp::Envelope;
use crate::error::{CalResult, CalibrationError};

/// Default reference pressure, 1 µPa
pub const DEFAULT_P_REF: f64 = 1.0;

/// Amplification settings (V/Pa) of a B&K Nexus conditioning amplifier
pub const BRUEL_KJAER_AMPLIFICATIONS: [f64; 11] = [
    100e-6, 316e-6, 1e-3, 3.16e-3, 10e-3, 31.6e-3, 100e-3, 316e-3, 1.0, 3.16, 10.0,
];

/// Reference voltage of the RTSys low-power mode
pub const LOWPOWER_REFERENCE_VOLTAGE: f64 = 5.0;

/// Full-scale peak-to-peak voltage of RTSys recorders
pub const RTSYS_VPP: f64 = 5.0;

/// Gain setting of a SoundTrap recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GainType {
    High,
    Low,
}

impl GainType {
    pub fn from_name(name: &str) -> CalResult<Self> {
        match name.to_lowercase().as_str() {
            "high" => Ok(GainType::High),
            "low" => Ok(GainType::Low),
            other => Err(CalibrationError::Configuration(format!(
                "gain type '{other}' must be 'high' or 'low'"
            ))),
        }
    }
}

/// Operating mode of an RTSys recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RtSysMode {
    /// Fixed reference voltage, no per-channel amplification
    LowPower,
    /// Per-channel amplification and correction factor from the header
    Default,
}

impl RtSysMode {
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("lowpower") {
            RtSysMode::LowPower
        } else {
            RtSysMode::Default
        }
    }

    /// Preamp gain of one channel in dB
    pub fn preamp_gain_db(&self, record: &HeaderRecord, channel: Channel) -> CalResult<f64> {
        match self {
            RtSysMode::LowPower => Ok(20.0 * (LOWPOWER_REFERENCE_VOLTAGE / std::f64::consts::SQRT_2).log10()),
            RtSysMode::Default => {
                let letter = channel.letter();
                let amplification = record.f32_field(&format!("amplification_{letter}"))? as f64;
                let correction = record.f32_field(&format!("correction_factor_{letter}"))? as f64;
                let product = amplification * correction;
                if product == 0.0 {
                    return Err(CalibrationError::Domain(format!(
                        "channel {letter}: amplification {amplification} x correction {correction} is zero"
                    )));
                }
                Ok(amplification_to_db(1.0 / product))
            }
        }
    }
}

/// Model-specific parameters of a recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceKind {
    Seiche,
    UPam,
    Mte,
    UAural,
    IcListen,
    AmarG3 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mems_sensitivity: Option<f64>,
    },
    SoundTrap {
        gain_type: GainType,
        #[serde(default)]
        high_frequency: bool,
    },
    BruelKjaer {
        amplification: f64,
        tone: ToneType,
    },
    RtSys {
        mode: RtSysMode,
        channel: Channel,
    },
}

impl DeviceKind {
    /// Tone calibration implied by the hardware, if any
    pub fn default_tone_calibration(&self) -> Option<ToneCalibration> {
        match self {
            DeviceKind::BruelKjaer { tone, .. } => Some(ToneCalibration::TypedTone { tone: *tone }),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeviceKind::Seiche => "seiche",
            DeviceKind::UPam => "upam",
            DeviceKind::Mte => "mte",
            DeviceKind::UAural => "uaural",
            DeviceKind::IcListen => "iclisten",
            DeviceKind::AmarG3 { .. } => "amar",
            DeviceKind::SoundTrap { .. } => "soundtrap",
            DeviceKind::BruelKjaer { .. } => "bk",
            DeviceKind::RtSys { .. } => "rtsys",
        }
    }
}

fn validate_amplification(amplification: f64) -> CalResult<()> {
    if BRUEL_KJAER_AMPLIFICATIONS.iter().any(|&a| (a - amplification).abs() <= a * 1e-9) {
        Ok(())
    } else {
        Err(CalibrationError::Configuration(format!(
            "amplification {amplification} V/Pa is not a B&K Nexus setting, choose one of {BRUEL_KJAER_AMPLIFICATIONS:?}"
        )))
    }
}

fn bruel_kjaer_preamp_gain(amplification: f64) -> f64 {
    amplification_to_db(amplification / 1e6)
}

fn require_finite(name: &str, value: f64) -> CalResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalibrationError::Configuration(format!("{name} must be finite, got {value}")))
    }
}

/// A recorder channel with its flat calibration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    name: String,
    model: String,
    serial_number: String,
    kind: DeviceKind,
    sensitivity: f64,
    preamp_gain: f64,
    vpp: f64,
    p_ref: f64,
    tone_calibration: Option<ToneCalibration>,
    #[serde(skip)]
    frequency_table: Option<FrequencyCalibrationTable>,
}

impl Device {
    pub fn builder(name: impl Into<String>, model: impl Into<String>) -> DeviceBuilder {
        DeviceBuilder::new(name, model)
    }

    /// SoundTrap whose sensitivity comes from a calibration database
    pub fn soundtrap_from_lookup(
        model: &str,
        serial_number: &str,
        gain_type: GainType,
        high_frequency: bool,
        lookup: &dyn CalibrationLookup,
    ) -> CalResult<Device> {
        let sensitivity = lookup.fetch_for_gain(serial_number, model, gain_type)?;
        debug!("{model} {serial_number}: {gain_type:?} gain sensitivity {sensitivity} dB from lookup");
        DeviceBuilder::new("SoundTrap", model)
            .serial_number(serial_number)
            .kind(DeviceKind::SoundTrap {
                gain_type,
                high_frequency,
            })
            .sensitivity(sensitivity)
            .preamp_gain(0.0)
            .vpp(2.0)
            .build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    pub fn kind(&self) -> &DeviceKind {
        &self.kind
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn preamp_gain(&self) -> f64 {
        self.preamp_gain
    }

    pub fn vpp(&self) -> f64 {
        self.vpp
    }

    pub fn p_ref(&self) -> f64 {
        self.p_ref
    }

    pub fn tone_calibration(&self) -> Option<&ToneCalibration> {
        self.tone_calibration.as_ref()
    }

    pub fn frequency_table(&self) -> Option<&FrequencyCalibrationTable> {
        self.frequency_table.as_ref()
    }

    /// Current B&K amplification, V/Pa
    pub fn amplification(&self) -> Option<f64> {
        match self.kind {
            DeviceKind::BruelKjaer { amplification, .. } => Some(amplification),
            _ => None,
        }
    }

    /// End-to-end gain in dB
    pub fn end_to_end_gain_db(&self) -> CalResult<f64> {
        gain::end_to_end_gain_db(self.sensitivity, self.preamp_gain, self.vpp, self.p_ref)
    }

    /// Linear µPa per unit of normalised sample amplitude
    pub fn gain_upa(&self) -> CalResult<f64> {
        gain::gain_upa(self.sensitivity, self.preamp_gain, self.vpp, self.p_ref)
    }

    /// Per-frequency increment relative to the flat end-to-end gain
    ///
    /// Without a frequency table the flat calibration applies everywhere and
    /// every increment is zero.
    pub fn increment_for(&self, frequencies: &[f64]) -> CalResult<Vec<(f64, f64)>> {
        match &self.frequency_table {
            Some(table) => table.increment_for(frequencies, self.end_to_end_gain_db()?),
            None => {
                if let Some(bad) = frequencies.iter().find(|f| !f.is_finite()) {
                    return Err(CalibrationError::Domain(format!(
                        "cannot compute increment for frequency {bad}"
                    )));
                }
                Ok(frequencies.iter().map(|&f| (f, 0.0)).collect())
            }
        }
    }

    /// Recording start encoded in a file name by this recorder's convention
    pub fn recording_datetime(&self, file_name: &str) -> CalResult<NaiveDateTime> {
        naming::recording_datetime(&self.kind, file_name)
    }

    /// `file_name` with its encoded start replaced by `new_start`
    pub fn renamed_file(&self, file_name: &str, new_start: NaiveDateTime) -> CalResult<String> {
        naming::renamed_with_datetime(&self.kind, file_name, new_start)
    }

    pub fn with_sensitivity(mut self, sensitivity: f64) -> CalResult<Self> {
        self.sensitivity = require_finite("sensitivity", sensitivity)?;
        Ok(self)
    }

    pub fn with_preamp_gain(mut self, preamp_gain: f64) -> CalResult<Self> {
        self.preamp_gain = require_finite("preamp gain", preamp_gain)?;
        self.recompute();
        Ok(self)
    }

    pub fn with_vpp(mut self, vpp: f64) -> CalResult<Self> {
        if !(vpp > 0.0) || !vpp.is_finite() {
            return Err(CalibrationError::Configuration(format!("Vpp must be positive, got {vpp}")));
        }
        self.vpp = vpp;
        Ok(self)
    }

    pub fn with_frequency_table(mut self, table: FrequencyCalibrationTable) -> Self {
        self.frequency_table = Some(table);
        self
    }

    pub fn with_tone_calibration(mut self, calibration: ToneCalibration) -> Self {
        self.tone_calibration = Some(calibration);
        self
    }

    /// Change the B&K amplification and the preamp gain that follows from it
    pub fn with_amplification(mut self, amplification: f64) -> CalResult<Self> {
        let DeviceKind::BruelKjaer {
            amplification: current,
            ..
        } = &mut self.kind
        else {
            return Err(CalibrationError::Configuration(format!(
                "{} recorders have no selectable amplification",
                self.kind.label()
            )));
        };
        validate_amplification(amplification)?;
        *current = amplification;
        self.preamp_gain = bruel_kjaer_preamp_gain(amplification);
        Ok(self)
    }

    /// Shift the preamp gain by `delta_db`
    pub fn adjust_preamp_gain(&mut self, delta_db: f64) {
        self.preamp_gain += delta_db;
        self.recompute();
    }

    pub(crate) fn set_preamp_gain(&mut self, preamp_gain: f64) {
        self.preamp_gain = preamp_gain;
    }

    /// Bring derived parameters back in line with the preamp gain
    pub fn recompute(&mut self) {
        if let DeviceKind::BruelKjaer { amplification, .. } = &mut self.kind {
            *amplification = 10.0_f64.powf(self.preamp_gain / 10.0).sqrt() * 1e6;
        }
    }

    /// Detect the calibration tone in `signal` and correct the preamp gain
    pub fn calibrate<E: Envelope>(
        &mut self,
        signal: &[f64],
        sample_rate: f64,
        detector: &ToneDetector<E>,
    ) -> CalResult<ToneSegment> {
        let calibration = self.tone_calibration.ok_or_else(|| {
            CalibrationError::Configuration(format!("{} has no tone calibration configured", self.name))
        })?;
        let segment = detector.detect(signal, sample_rate)?;
        apply_tone(self, signal, segment, &calibration)?;
        Ok(segment)
    }
}

/// Builder for [`Device`]
#[derive(Debug, Clone)]
pub struct DeviceBuilder {
    name: String,
    model: String,
    serial_number: String,
    kind: DeviceKind,
    sensitivity: Option<f64>,
    preamp_gain: f64,
    vpp: f64,
    p_ref: f64,
    tone_calibration: Option<ToneCalibration>,
    frequency_table: Option<FrequencyCalibrationTable>,
}

impl DeviceBuilder {
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            serial_number: String::new(),
            kind: DeviceKind::Seiche,
            sensitivity: None,
            preamp_gain: 0.0,
            vpp: 2.0,
            p_ref: DEFAULT_P_REF,
            tone_calibration: None,
            frequency_table: None,
        }
    }

    pub fn serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = serial_number.into();
        self
    }

    pub fn kind(mut self, kind: DeviceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn sensitivity(mut self, sensitivity: f64) -> Self {
        self.sensitivity = Some(sensitivity);
        self
    }

    pub fn preamp_gain(mut self, preamp_gain: f64) -> Self {
        self.preamp_gain = preamp_gain;
        self
    }

    pub fn vpp(mut self, vpp: f64) -> Self {
        self.vpp = vpp;
        self
    }

    pub fn p_ref(mut self, p_ref: f64) -> Self {
        self.p_ref = p_ref;
        self
    }

    pub fn tone_calibration(mut self, calibration: ToneCalibration) -> Self {
        self.tone_calibration = Some(calibration);
        self
    }

    pub fn frequency_table(mut self, table: FrequencyCalibrationTable) -> Self {
        self.frequency_table = Some(table);
        self
    }

    pub fn build(self) -> CalResult<Device> {
        let (sensitivity, preamp_gain) = match &self.kind {
            DeviceKind::BruelKjaer { amplification, .. } => {
                validate_amplification(*amplification)?;
                (self.sensitivity.unwrap_or(0.0), bruel_kjaer_preamp_gain(*amplification))
            }
            _ => {
                let sensitivity = self.sensitivity.ok_or_else(|| {
                    CalibrationError::Configuration(format!("{}: sensitivity is required", self.name))
                })?;
                (sensitivity, self.preamp_gain)
            }
        };

        let sensitivity = require_finite("sensitivity", sensitivity)?;
        let preamp_gain = require_finite("preamp gain", preamp_gain)?;
        if !(self.vpp > 0.0) || !self.vpp.is_finite() {
            return Err(CalibrationError::Configuration(format!(
                "Vpp must be positive, got {}",
                self.vpp
            )));
        }
        if !(self.p_ref > 0.0) || !self.p_ref.is_finite() {
            return Err(CalibrationError::Configuration(format!(
                "reference pressure must be positive, got {}",
                self.p_ref
            )));
        }
        if let DeviceKind::AmarG3 {
            mems_sensitivity: Some(mems),
        } = self.kind
        {
            require_finite("MEMS sensitivity", mems)?;
        }

        let tone_calibration = self
            .tone_calibration
            .or_else(|| self.kind.default_tone_calibration());

        Ok(Device {
            name: self.name,
            model: self.model,
            serial_number: self.serial_number,
            kind: self.kind,
            sensitivity,
            preamp_gain,
            vpp: self.vpp,
            p_ref: self.p_ref,
            tone_calibration,
            frequency_table: self.frequency_table,
        })
    }
}

/// Which channels of a header-configured recorder become devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelSelector {
    /// One device per active channel
    All,
    /// One given channel, which must be active
    Only(Channel),
    /// The channel named by the header's `channel` field
    Recorded,
}

/// Caller-supplied parameters for header-derived devices
#[derive(Debug, Clone)]
pub struct HeaderDeviceParams {
    pub name: String,
    pub model: String,
    pub serial_number: Option<String>,
    pub vpp: f64,
    pub mode: RtSysMode,
    pub channel: ChannelSelector,
    pub tone_calibration: Option<ToneCalibration>,
}

impl HeaderDeviceParams {
    pub fn new(model: impl Into<String>, mode: RtSysMode, channel: ChannelSelector) -> Self {
        Self {
            name: "RTSys".to_string(),
            model: model.into(),
            serial_number: None,
            vpp: RTSYS_VPP,
            mode,
            channel,
            tone_calibration: None,
        }
    }

    pub fn with_serial(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    pub fn with_vpp(mut self, vpp: f64) -> Self {
        self.vpp = vpp;
        self
    }

    pub fn with_tone_calibration(mut self, calibration: ToneCalibration) -> Self {
        self.tone_calibration = Some(calibration);
        self
    }
}

/// Devices derived from one configuration block
#[derive(Debug, Clone, PartialEq)]
pub enum DerivedDevices {
    Single(Device),
    PerChannel(Vec<Device>),
}

impl DerivedDevices {
    pub fn into_vec(self) -> Vec<Device> {
        match self {
            DerivedDevices::Single(device) => vec![device],
            DerivedDevices::PerChannel(devices) => devices,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DerivedDevices::Single(_) => 1,
            DerivedDevices::PerChannel(devices) => devices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn header_serial(record: &HeaderRecord) -> Option<String> {
    record.serial_number().map(|values| {
        values
            .iter()
            .map(|v| format!("{v}"))
            .collect::<Vec<_>>()
            .join("-")
    })
}

fn device_from_channel(
    record: &HeaderRecord,
    params: &HeaderDeviceParams,
    serial_number: &str,
    channel: Channel,
) -> CalResult<Device> {
    let letter = channel.letter();
    let sensitivity = record.f32_field(&format!("hydrophone_sensitivity_{letter}"))? as f64;
    let preamp_gain = params.mode.preamp_gain_db(record, channel)?;

    debug!("Channel {letter}: sensitivity {sensitivity} dB, preamp gain {preamp_gain:.3} dB");

    let mut builder = DeviceBuilder::new(format!("{} {letter}", params.name), params.model.clone())
        .serial_number(serial_number)
        .kind(DeviceKind::RtSys {
            mode: params.mode,
            channel,
        })
        .sensitivity(sensitivity)
        .preamp_gain(preamp_gain)
        .vpp(params.vpp);
    if let Some(calibration) = params.tone_calibration {
        builder = builder.tone_calibration(calibration);
    }
    builder.build()
}

/// Configure RTSys devices from a decoded header
///
/// The serial number comes from the header when the block carries it,
/// otherwise from the caller.
pub fn devices_from_header(record: &HeaderRecord, params: &HeaderDeviceParams) -> CalResult<DerivedDevices> {
    let active = record.active_channels()?;
    if active.is_empty() {
        return Err(CalibrationError::Format("header reports no active channel".into()));
    }

    let serial_number = match (header_serial(record), &params.serial_number) {
        (Some(from_header), _) => from_header,
        (None, Some(given)) => given.clone(),
        (None, None) => {
            warn!("Header carries no serial number and none was given");
            String::new()
        }
    };

    let wanted = match params.channel {
        ChannelSelector::All => None,
        ChannelSelector::Only(channel) => Some(channel),
        ChannelSelector::Recorded => Some(record.recorded_channel()?),
    };

    let devices = match wanted {
        Some(channel) => {
            if !active.contains(&channel) {
                return Err(CalibrationError::Configuration(format!(
                    "channel {channel} is not active, active channels: {active:?}"
                )));
            }
            DerivedDevices::Single(device_from_channel(record, params, &serial_number, channel)?)
        }
        None if active.len() == 1 => {
            DerivedDevices::Single(device_from_channel(record, params, &serial_number, active[0])?)
        }
        None => DerivedDevices::PerChannel(
            active
                .iter()
                .map(|&channel| device_from_channel(record, params, &serial_number, channel))
                .collect::<CalResult<Vec<_>>>()?,
        ),
    };

    info!(
        "Configured {} device(s) from a {}-byte header block",
        devices.len(),
        record.conf_size()
    );
    Ok(devices)
}
