//! Output formatting for CLI results

use colorful::Colorful;

use crate::config::DevicePreset;
use crate::core::device::Device;
use crate::core::header::{HeaderRecord, HeaderValue};
use crate::report::{FileOutcome, FileReport, MissionReport};

fn format_value(value: &HeaderValue) -> String {
    match value {
        HeaderValue::Text(s) => format!("{:?}", s),
        HeaderValue::Chars(bytes) => {
            let chars: Vec<String> = bytes
                .iter()
                .map(|&b| if b == 0 { "\\0".to_string() } else { (b as char).to_string() })
                .collect();
            format!("[{}]", chars.join(", "))
        }
        HeaderValue::U32(v) => v.to_string(),
        HeaderValue::F32(v) => v.to_string(),
        HeaderValue::F64(v) => v.to_string(),
        HeaderValue::F32Array(values) => format!("{:?}", values),
    }
}

/// Decoded header fields, one per line
pub fn format_header(record: &HeaderRecord) -> String {
    let mut output = format!("{} ({} bytes)\n", "Configuration block".bold(), record.conf_size());
    for (name, value) in record.fields() {
        output.push_str(&format!("  {:<28} {}\n", name, format_value(value)));
    }
    if let Ok(time) = record.recording_time() {
        output.push_str(&format!("  {:<28} {}\n", "recording start (UTC)", time));
    }
    output
}

/// Calibration parameters of one device
pub fn format_device(device: &Device) -> String {
    let gain = device
        .end_to_end_gain_db()
        .map(|g| format!("{:.3} dB", g))
        .unwrap_or_else(|e| e.to_string());
    format!(
        "{} {} [{}]\n  Sensitivity: {:.3} dB re 1 V/µPa\n  Preamp gain: {:.3} dB\n  Vpp: {} V\n  End-to-end gain: {}\n",
        device.name().cyan(),
        device.model(),
        device.serial_number(),
        device.sensitivity(),
        device.preamp_gain(),
        device.vpp(),
        gain
    )
}

fn format_file_report(report: &FileReport) -> String {
    let mut line = format!(
        "{} {}  gain {:.2} dB",
        "✓".green(),
        report.path.display(),
        report.end_to_end_gain_db
    );
    if let Some(tone) = report.tone {
        line.push_str(&format!("  tone {}..{}", tone.start, tone.end));
    }
    if let Some(rms) = report.rms_db {
        line.push_str(&format!("  rms {:.1} dB", rms));
    }
    if let Some(levels) = &report.levels {
        let percentiles: Vec<String> = levels
            .percentiles
            .iter()
            .map(|(p, l)| format!("p{}={:.1}", p, l))
            .collect();
        line.push_str(&format!("  [{}]", percentiles.join(" ")));
    }
    line
}

/// One line per file, failures last
pub fn format_mission(report: &MissionReport) -> String {
    let mut output = String::new();
    for outcome in &report.outcomes {
        match outcome {
            FileOutcome::Processed(file) => {
                output.push_str(&format_file_report(file));
                output.push('\n');
            }
            FileOutcome::Failed { path, kind, message } => {
                output.push_str(&format!(
                    "{} {}  {} ({})\n",
                    "✗".red(),
                    path.display(),
                    message.clone().yellow(),
                    kind
                ));
            }
        }
    }

    let summary = format!(
        "{} processed, {} failed",
        report.processed_count(),
        report.failed_count()
    );
    if report.failed_count() == 0 {
        output.push_str(&format!("\n{}\n", summary.green()));
    } else {
        output.push_str(&format!("\n{}\n", summary.yellow()));
    }
    output
}

/// List presets for `hydrocal presets`
pub fn format_presets() -> String {
    let mut output = format!("{}\n", "Device presets:".bold());
    for preset in DevicePreset::all() {
        output.push_str(&format!("  {:<14} {}\n", preset.name(), preset.description()));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CalibrationError;

    #[test]
    fn test_presets_listed() {
        let text = format_presets();
        for preset in DevicePreset::all() {
            assert!(text.contains(preset.name()));
        }
    }

    #[test]
    fn test_mission_lists_failures() {
        let error = CalibrationError::Format("truncated block".into());
        let report = MissionReport::new(vec![FileOutcome::failed("broken.wav", &error)]);
        let text = format_mission(&report);
        assert!(text.contains("broken.wav"));
        assert!(text.contains("format"));
        assert!(text.contains("0 processed, 1 failed"));
    }

    #[test]
    fn test_chars_value() {
        assert_eq!(format_value(&HeaderValue::Chars(vec![b'A', 0])), "[A, \\0]");
    }
}
