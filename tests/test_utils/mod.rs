// tests/test_utils/mod.rs
//
// Shared fixtures for the integration tests: scratch directories, synthetic
// recordings and crafted configuration headers.

#![allow(dead_code)]

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Scratch directory removed on drop
pub struct TempDir {
    path: PathBuf,
}

impl TempDir {
    pub fn new(label: &str) -> Self {
        let path = std::env::temp_dir().join(format!("hydrocal-{}-{}", label, Uuid::new_v4()));
        fs::create_dir_all(&path).expect("Failed to create temp dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Sine of `frequency` Hz between `start_secs` and `end_secs`, silence elsewhere
pub fn tone_burst(
    sample_rate: u32,
    total_secs: f64,
    frequency: f64,
    amplitude: f64,
    start_secs: f64,
    end_secs: f64,
) -> Vec<f64> {
    let fs = sample_rate as f64;
    let total = (total_secs * fs).round() as usize;
    let start = (start_secs * fs).round() as usize;
    let end = (end_secs * fs).round() as usize;
    (0..total)
        .map(|i| {
            if i >= start && i < end {
                amplitude * (2.0 * PI * frequency * i as f64 / fs).sin()
            } else {
                0.0
            }
        })
        .collect()
}

/// Continuous sine over the whole recording
pub fn sine(sample_rate: u32, total_secs: f64, frequency: f64, amplitude: f64) -> Vec<f64> {
    tone_burst(sample_rate, total_secs, frequency, amplitude, 0.0, total_secs)
}

/// Write mono 16-bit PCM
pub fn write_wav_i16(path: &Path, samples: &[f64], sample_rate: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV");
    for &s in samples {
        let value = (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(value).expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV");
}

/// Write interleaved 32-bit float
pub fn write_wav_f32(path: &Path, samples: &[f64], sample_rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).expect("Failed to create WAV");
    for &s in samples {
        writer.write_sample(s as f32).expect("Failed to write sample");
    }
    writer.finalize().expect("Failed to finalize WAV");
}

/// A file with a recording extension that no decoder accepts
pub fn write_corrupt_file(path: &Path) {
    fs::write(path, b"this is not a RIFF stream, just some bytes").expect("Failed to write file");
}

/// Configuration header values for [`header_bytes`]
pub struct HeaderFixture {
    pub active: [u8; 4],
    pub sensitivities: [f32; 4],
    /// Amplification and correction factor per channel (80-byte block)
    pub amplification: Option<([f32; 4], [f32; 4])>,
    /// Serial number floats (96-byte block)
    pub serial: Option<[f32; 4]>,
    pub epoch_secs: f64,
    pub sample_rate: f32,
}

impl Default for HeaderFixture {
    fn default() -> Self {
        Self {
            active: [b'A', 0, 0, 0],
            sensitivities: [-180.0, -181.0, -182.0, -183.0],
            amplification: None,
            serial: None,
            epoch_secs: 1_633_957_869.0,
            sample_rate: 96_000.0,
        }
    }
}

/// Size field at byte 32, block from byte 40
pub fn header_bytes(fixture: &HeaderFixture) -> Vec<u8> {
    let conf_size: u32 = match (fixture.serial, fixture.amplification) {
        (Some(_), _) => 96,
        (None, Some(_)) => 80,
        (None, None) => 64,
    };
    let mut buffer = vec![0u8; 40 + conf_size as usize];
    buffer[32..36].copy_from_slice(&conf_size.to_le_bytes());

    let block = &mut buffer[40..];
    block[0..4].copy_from_slice(b"CONF");
    block[4..8].copy_from_slice(&conf_size.to_le_bytes());
    block[8..12].copy_from_slice(&2u32.to_le_bytes());
    block[12..20].copy_from_slice(&fixture.epoch_secs.to_le_bytes());
    block[20] = b'A';
    block[24..28].copy_from_slice(&fixture.sample_rate.to_le_bytes());
    block[28..32].copy_from_slice(&fixture.active);
    for (i, s) in fixture.sensitivities.iter().enumerate() {
        block[32 + 4 * i..36 + 4 * i].copy_from_slice(&s.to_le_bytes());
    }
    if let Some((amplification, correction)) = fixture.amplification {
        for i in 0..4 {
            block[48 + 4 * i..52 + 4 * i].copy_from_slice(&amplification[i].to_le_bytes());
            block[64 + 4 * i..68 + 4 * i].copy_from_slice(&correction[i].to_le_bytes());
        }
    }
    if let Some(serial) = fixture.serial {
        for (i, v) in serial.iter().enumerate() {
            block[80 + 4 * i..84 + 4 * i].copy_from_slice(&v.to_le_bytes());
        }
    }
    buffer
}

/// The configuration block as a RIFF `conf` chunk
pub fn conf_chunk(fixture: &HeaderFixture) -> Vec<u8> {
    let mut block = header_bytes(fixture).split_off(40);
    let body = (block.len() - 8) as u32;
    block[4..8].copy_from_slice(&body.to_le_bytes());
    block
}

/// Insert a `conf` chunk right after the RIFF header of an existing WAV
pub fn insert_conf_chunk(path: &Path, fixture: &HeaderFixture) {
    let mut bytes = fs::read(path).expect("Failed to read WAV");
    assert_eq!(&bytes[0..4], b"RIFF");
    let chunk = conf_chunk(fixture);
    let riff_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) + chunk.len() as u32;
    bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());
    bytes.splice(12..12, chunk);
    fs::write(path, bytes).expect("Failed to write WAV");
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
