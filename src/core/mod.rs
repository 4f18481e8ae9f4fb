//! Core calibration modules

pub mod decoder;
pub mod device;
pub mod dsp;
pub mod frequency;
pub mod gain;
pub mod header;
pub mod lookup;
pub mod mission;
pub mod naming;
pub mod recording;
pub mod tone;

pub use decoder::{decode_audio, AudioData};
pub use device::{
    devices_from_header, ChannelSelector, DerivedDevices, Device, DeviceBuilder, DeviceKind, GainType,
    HeaderDeviceParams, RtSysMode,
};
pub use dsp::{Envelope, HilbertEnvelope, RectifiedEnvelope};
pub use frequency::{CalibrationCurve, FrequencyCalibrationTable, TableFormat};
pub use gain::end_to_end_gain_db;
pub use header::{decode_header, decode_header_file, decode_header_from_reader, Channel, HeaderRecord, HeaderValue};
pub use lookup::{CalibrationLookup, LookupEntry, StaticLookup};
pub use mission::{collect_recordings, DeviceSource, MissionOptions, MissionProcessor};
pub use recording::{LevelDistribution, Recording};
pub use tone::{apply_tone, ToneCalibration, ToneDetector, ToneSegment, ToneType};
