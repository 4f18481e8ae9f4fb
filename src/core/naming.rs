//! Recording start times encoded in file names
//!
//! Each recorder family names its files after the recording start. The
//! conventions, by [`DeviceKind`]:
//!
//! | Kind       | Example                              | Format              |
//! |------------|--------------------------------------|---------------------|
//! | SoundTrap  | `67416073.210504093040.wav`          | `%y%m%d%H%M%S`      |
//! | Seiche/uPam| `SEPAM_20200506_072841_170.wav`      | `%Y%m%d_%H%M%S_%3f` |
//! | RTSys      | `channelA_2021-10-11_13-11-09.wav`   | `%Y-%m-%d_%H-%M-%S` |
//! | MTE        | `AURAL_210504_093040.wav`            | `%y%m%d_%H%M%S`     |
//! | uAural     | `093040_20210504_0001.wav`           | `%H%M%S_%Y%m%d`     |
//! | AMAR       | `AMAR173.4.20190916T004248Z.wav`     | `%Y%m%dT%H%M%S`     |
//! | B&K        | `210504093040_ref.wav`               | `%y%m%d%H%M%S`      |
//!
//! icListen files carry no parseable time stamp.

use chrono::NaiveDateTime;

use super::device::DeviceKind;
use crate::error::{CalResult, CalibrationError};

fn malformed(file_name: &str, expected: &str) -> CalibrationError {
    CalibrationError::Format(format!(
        "file name '{file_name}' does not follow the {expected} naming convention"
    ))
}

fn stem(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

fn parse(text: &str, format: &str, file_name: &str) -> CalResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, format).map_err(|e| {
        CalibrationError::Format(format!("file name '{file_name}': '{text}' is not {format}: {e}"))
    })
}

/// Text after the first `_` of the stem
fn after_first_underscore<'a>(file_name: &'a str, expected: &str) -> CalResult<&'a str> {
    stem(file_name)
        .split_once('_')
        .map(|(_, rest)| rest)
        .ok_or_else(|| malformed(file_name, expected))
}

/// Timestamp layout inside the file names of one recorder family
fn timestamp_format(kind: &DeviceKind) -> CalResult<&'static str> {
    match kind {
        DeviceKind::SoundTrap { .. } | DeviceKind::BruelKjaer { .. } => Ok("%y%m%d%H%M%S"),
        DeviceKind::Seiche | DeviceKind::UPam => Ok("%Y%m%d_%H%M%S_%3f"),
        DeviceKind::RtSys { .. } => Ok("%Y-%m-%d_%H-%M-%S"),
        DeviceKind::Mte => Ok("%y%m%d_%H%M%S"),
        DeviceKind::UAural => Ok("%H%M%S_%Y%m%d"),
        DeviceKind::AmarG3 { .. } => Ok("%Y%m%dT%H%M%S"),
        DeviceKind::IcListen => Err(CalibrationError::Configuration(
            "icListen file names carry no recording time".into(),
        )),
    }
}

/// Parse the recording start from a file name (no directory part)
pub fn recording_datetime(kind: &DeviceKind, file_name: &str) -> CalResult<NaiveDateTime> {
    let format = timestamp_format(kind)?;
    match kind {
        DeviceKind::SoundTrap { .. } => {
            let stamp = file_name
                .split('.')
                .nth(1)
                .ok_or_else(|| malformed(file_name, "SoundTrap"))?;
            parse(stamp, format, file_name)
        }
        DeviceKind::Seiche | DeviceKind::UPam => {
            let stamp = after_first_underscore(file_name, "Seiche")?;
            parse(stamp, format, file_name)
        }
        DeviceKind::RtSys { .. } => {
            let stamp = after_first_underscore(file_name, "RTSys")?;
            parse(stamp, format, file_name)
        }
        DeviceKind::Mte => {
            let parts: Vec<&str> = stem(file_name).split('_').collect();
            if parts.len() < 3 {
                return Err(malformed(file_name, "MTE"));
            }
            parse(&format!("{}_{}", parts[1], parts[2]), format, file_name)
        }
        DeviceKind::UAural => {
            let parts: Vec<&str> = stem(file_name).split('_').collect();
            if parts.len() < 2 {
                return Err(malformed(file_name, "uAural"));
            }
            parse(&format!("{}_{}", parts[0], parts[1]), format, file_name)
        }
        DeviceKind::AmarG3 { .. } => {
            let parts: Vec<&str> = file_name.split('.').collect();
            let field = parts
                .len()
                .checked_sub(2)
                .map(|i| parts[i])
                .ok_or_else(|| malformed(file_name, "AMAR"))?;
            // Trailing time-zone designator is dropped
            let stamp = field
                .len()
                .checked_sub(16)
                .and_then(|start| field.get(start..field.len() - 1))
                .ok_or_else(|| malformed(file_name, "AMAR"))?;
            parse(stamp, format, file_name)
        }
        DeviceKind::BruelKjaer { .. } => {
            let stamp = stem(file_name).split('_').next().unwrap_or_default();
            parse(stamp, format, file_name)
        }
        DeviceKind::IcListen => Err(CalibrationError::Configuration(
            "icListen file names carry no recording time".into(),
        )),
    }
}

/// Replace the recording start in a file name with `new_start`
///
/// Everything around the timestamp (serial numbers, prefixes, counters,
/// extension) is kept as it is.
pub fn renamed_with_datetime(
    kind: &DeviceKind,
    file_name: &str,
    new_start: NaiveDateTime,
) -> CalResult<String> {
    let format = timestamp_format(kind)?;
    let old = recording_datetime(kind, file_name)?.format(format).to_string();
    if !file_name.contains(&old) {
        return Err(CalibrationError::Format(format!(
            "file name '{file_name}' does not spell its start time as '{old}'"
        )));
    }
    Ok(file_name.replacen(&old, &new_start.format(format).to_string(), 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::{GainType, RtSysMode};
    use crate::core::header::Channel;
    use crate::core::tone::ToneType;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32, ms: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_milli_opt(h, mi, s, ms)
            .unwrap()
    }

    #[test]
    fn test_soundtrap() {
        let kind = DeviceKind::SoundTrap {
            gain_type: GainType::High,
            high_frequency: false,
        };
        assert_eq!(
            recording_datetime(&kind, "67416073.210504093040.wav").unwrap(),
            at(2021, 5, 4, 9, 30, 40, 0)
        );
        assert!(matches!(
            recording_datetime(&kind, "nodots"),
            Err(CalibrationError::Format(_))
        ));
    }

    #[test]
    fn test_seiche_milliseconds() {
        assert_eq!(
            recording_datetime(&DeviceKind::Seiche, "SEPAM_20200506_072841_170.wav").unwrap(),
            at(2020, 5, 6, 7, 28, 41, 170)
        );
    }

    #[test]
    fn test_rtsys() {
        let kind = DeviceKind::RtSys {
            mode: RtSysMode::LowPower,
            channel: Channel::A,
        };
        assert_eq!(
            recording_datetime(&kind, "channelA_2021-10-11_13-11-09.wav").unwrap(),
            at(2021, 10, 11, 13, 11, 9, 0)
        );
    }

    #[test]
    fn test_mte_and_uaural() {
        assert_eq!(
            recording_datetime(&DeviceKind::Mte, "AURAL_210504_093040.wav").unwrap(),
            at(2021, 5, 4, 9, 30, 40, 0)
        );
        assert_eq!(
            recording_datetime(&DeviceKind::UAural, "093040_20210504_0001.wav").unwrap(),
            at(2021, 5, 4, 9, 30, 40, 0)
        );
        assert!(recording_datetime(&DeviceKind::Mte, "AURAL.wav").is_err());
    }

    #[test]
    fn test_amar() {
        let kind = DeviceKind::AmarG3 { mems_sensitivity: None };
        assert_eq!(
            recording_datetime(&kind, "AMAR173.4.20190916T004248Z.wav").unwrap(),
            at(2019, 9, 16, 0, 42, 48, 0)
        );
        assert!(recording_datetime(&kind, "short.wav").is_err());
    }

    #[test]
    fn test_bruel_kjaer() {
        let kind = DeviceKind::BruelKjaer {
            amplification: 1.0,
            tone: ToneType::Reference,
        };
        assert_eq!(
            recording_datetime(&kind, "210504093040_ref.wav").unwrap(),
            at(2021, 5, 4, 9, 30, 40, 0)
        );
    }

    #[test]
    fn test_iclisten_has_no_convention() {
        assert!(matches!(
            recording_datetime(&DeviceKind::IcListen, "whatever.wav"),
            Err(CalibrationError::Configuration(_))
        ));
        assert!(matches!(
            renamed_with_datetime(&DeviceKind::IcListen, "whatever.wav", at(2021, 1, 1, 0, 0, 0, 0)),
            Err(CalibrationError::Configuration(_))
        ));
    }

    #[test]
    fn test_rename_every_convention() {
        let new_start = at(2022, 12, 31, 23, 59, 58, 250);
        let cases = [
            (
                DeviceKind::SoundTrap {
                    gain_type: GainType::Low,
                    high_frequency: true,
                },
                "67416073.210504093040.wav",
                "67416073.221231235958.wav",
            ),
            (DeviceKind::Seiche, "SEPAM_20200506_072841_170.wav", "SEPAM_20221231_235958_250.wav"),
            (DeviceKind::UPam, "UPAM_20200506_072841_170.wav", "UPAM_20221231_235958_250.wav"),
            (
                DeviceKind::RtSys {
                    mode: RtSysMode::Default,
                    channel: Channel::B,
                },
                "channelB_2021-10-11_13-11-09.wav",
                "channelB_2022-12-31_23-59-58.wav",
            ),
            (DeviceKind::Mte, "AURAL_210504_093040.wav", "AURAL_221231_235958.wav"),
            (DeviceKind::UAural, "093040_20210504_0001.wav", "235958_20221231_0001.wav"),
            (
                DeviceKind::AmarG3 { mems_sensitivity: None },
                "AMAR173.4.20190916T004248Z.wav",
                "AMAR173.4.20221231T235958Z.wav",
            ),
            (
                DeviceKind::BruelKjaer {
                    amplification: 1.0,
                    tone: ToneType::Test,
                },
                "210504093040_ref.wav",
                "221231235958_ref.wav",
            ),
        ];

        for (kind, name, expected) in cases {
            let renamed = renamed_with_datetime(&kind, name, new_start).unwrap();
            assert_eq!(renamed, expected, "{}", kind.label());

            // the renamed file parses back to the new start, at the convention's precision
            let parsed = recording_datetime(&kind, &renamed).unwrap();
            let precision_ms = if matches!(kind, DeviceKind::Seiche | DeviceKind::UPam) { 250 } else { 0 };
            assert_eq!(parsed, at(2022, 12, 31, 23, 59, 58, precision_ms), "{}", kind.label());
        }
    }

    #[test]
    fn test_rename_rejects_unparseable_name() {
        assert!(matches!(
            renamed_with_datetime(&DeviceKind::Seiche, "SEPAM.wav", at(2021, 1, 1, 0, 0, 0, 0)),
            Err(CalibrationError::Format(_))
        ));
    }
}
