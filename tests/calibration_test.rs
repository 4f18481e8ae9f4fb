// tests/calibration_test.rs
//
// End-to-end tone calibration: a device description on disk, a recording
// carrying a calibration tone, and the corrected preamp gain.

mod test_utils;

use std::fs;

use hydrocal::core::recording::Recording;
use hydrocal::core::tone::ToneDetector;
use hydrocal::{CalibrationError, DeviceConfig};
use test_utils::{assert_close, tone_burst, write_wav_i16, TempDir};

const FS: u32 = 8000;

#[test]
fn test_reference_tone_corrects_bk_gain() {
    let dir = TempDir::new("calibrate-bk");
    let config_path = dir.join("nexus.json");
    fs::write(&config_path, r#"{"preset": "bk", "amplification": 1.0, "tone": "ref"}"#).unwrap();

    let wav = dir.join("210504093040_ref.wav");
    write_wav_i16(&wav, &tone_burst(FS, 4.0, 1000.0, 0.5, 1.0, 3.0), FS);

    let device = DeviceConfig::load(&config_path).unwrap().build_device().unwrap();
    assert_close(device.preamp_gain(), -120.0, 1e-9);

    let mut recording = Recording::open(&wav, device, 0).unwrap();
    assert_eq!(
        recording.start().map(|t| t.to_string()),
        Some("2021-05-04 09:30:40".to_string())
    );

    let segment = recording.calibrate(&ToneDetector::new(1.0)).unwrap();
    assert!((segment.start as i64 - 8000).abs() <= 16, "start {}", segment.start);
    assert!((segment.end as i64 - 24000).abs() <= 16, "end {}", segment.end);

    // reference tone: gain moves by the tone level in dB re 1 V
    let expected = -120.0 + 20.0 * (0.5 / 2f64.sqrt()).log10();
    assert_close(recording.device().preamp_gain(), expected, 0.02);
    let amplification = recording.device().amplification().unwrap();
    assert_close(amplification, 0.5 / 2f64.sqrt(), 1e-3);
}

#[test]
fn test_flat_reference_on_seiche() {
    let dir = TempDir::new("calibrate-flat");
    let config_path = dir.join("seiche.json");
    fs::write(
        &config_path,
        r#"{
            "preset": "seiche",
            "sensitivity": -180.0,
            "tone_calibration": {"strategy": "flat_reference", "expected_level_db": 170.0}
        }"#,
    )
    .unwrap();
    let wav = dir.join("SEPAM_20200506_072841_170.wav");
    write_wav_i16(&wav, &tone_burst(FS, 3.0, 250.0, 0.25, 0.5, 2.5), FS);

    let device = DeviceConfig::load(&config_path).unwrap().build_device().unwrap();
    let mut recording = Recording::open(&wav, device, 0).unwrap();
    recording.calibrate(&ToneDetector::new(1.0)).unwrap();

    // measured tone: 20*log10(rms * 1e9)
    let measured = 20.0 * (0.25 / 2f64.sqrt() * 1e9).log10();
    assert_close(recording.device().preamp_gain(), measured - 170.0, 0.02);
}

#[test]
fn test_tone_failures_are_distinct() {
    let dir = TempDir::new("calibrate-fail");
    let config_path = dir.join("nexus.json");
    fs::write(&config_path, r#"{"preset": "bk", "amplification": 0.1}"#).unwrap();
    let device = DeviceConfig::load(&config_path).unwrap().build_device().unwrap();

    let silent = dir.join("210504093040_silent.wav");
    write_wav_i16(&silent, &vec![0.0; FS as usize * 2], FS);
    let mut recording = Recording::open(&silent, device.clone(), 0).unwrap();
    assert!(matches!(
        recording.calibrate(&ToneDetector::new(1.0)),
        Err(CalibrationError::ToneNotFound)
    ));
    assert_eq!(recording.device().preamp_gain(), device.preamp_gain());

    let short = dir.join("210504093040_short.wav");
    write_wav_i16(&short, &tone_burst(FS, 2.0, 1000.0, 0.5, 0.5, 0.9), FS);
    let mut recording = Recording::open(&short, device.clone(), 0).unwrap();
    match recording.calibrate(&ToneDetector::new(1.0)) {
        Err(CalibrationError::ToneTooShort { duration_secs, min_duration_secs }) => {
            assert_close(duration_secs, 0.4, 0.01);
            assert_eq!(min_duration_secs, 1.0);
        }
        other => panic!("expected a too-short tone, got {other:?}"),
    }
    assert_eq!(recording.device().preamp_gain(), device.preamp_gain());
}

#[test]
fn test_device_without_tone_calibration() {
    let dir = TempDir::new("calibrate-none");
    let config_path = dir.join("upam.json");
    fs::write(&config_path, r#"{"preset": "upam", "sensitivity": -196.0}"#).unwrap();
    let wav = dir.join("SEPAM_20200506_072841_170.wav");
    write_wav_i16(&wav, &tone_burst(FS, 2.0, 1000.0, 0.5, 0.2, 1.8), FS);

    let device = DeviceConfig::load(&config_path).unwrap().build_device().unwrap();
    let mut recording = Recording::open(&wav, device, 0).unwrap();
    assert!(matches!(
        recording.calibrate(&ToneDetector::new(1.0)),
        Err(CalibrationError::Configuration(_))
    ));
}
