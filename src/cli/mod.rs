// src/cli/mod.rs
//
// Command-line interface module

mod args;
mod output;

pub use args::{parse_channel_selector, Cli, Command, ToneArgs};
pub use output::{format_device, format_header, format_mission, format_presets};

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::{DeviceConfig, HeaderSettings};
use crate::core::device::{devices_from_header, ChannelSelector, HeaderDeviceParams, RtSysMode};
use crate::core::gain::end_to_end_gain_db;
use crate::core::header::decode_header_file;
use crate::core::mission::{MissionOptions, MissionProcessor};
use crate::core::recording::Recording;

fn load_config(path: &Path) -> Result<DeviceConfig> {
    DeviceConfig::load(path).with_context(|| format!("Failed to load device configuration: {}", path.display()))
}

/// Run a parsed command
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Gain {
            sensitivity,
            preamp_gain,
            vpp,
            p_ref,
        } => {
            let gain = end_to_end_gain_db(sensitivity, preamp_gain, vpp, p_ref)?;
            println!("{:.6}", gain);
        }

        Command::Header {
            file,
            mode,
            channel,
            vpp,
            model,
            json,
        } => {
            let record = decode_header_file(&file)
                .with_context(|| format!("Failed to decode header of {}", file.display()))?;
            let params = HeaderDeviceParams::new(model, args::parse_mode(&mode), channel).with_vpp(vpp);
            let devices = devices_from_header(&record, &params)?.into_vec();

            if json {
                let value = serde_json::json!({ "header": record, "devices": devices });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print!("{}", format_header(&record));
                println!();
                for device in &devices {
                    print!("{}", format_device(device));
                }
            }
        }

        Command::Calibrate {
            file,
            config,
            tone,
            channel,
        } => {
            let device = load_config(&config)?.build_device()?;
            let before = device.preamp_gain();
            let mut recording = Recording::open(&file, device, channel)
                .with_context(|| format!("Failed to open recording: {}", file.display()))?;
            let segment = recording.calibrate(&tone.detector())?;

            println!(
                "Tone at samples {}..{} ({:.3}s)",
                segment.start,
                segment.end,
                segment.duration_secs(recording.sample_rate())
            );
            println!(
                "Preamp gain: {:.3} dB -> {:.3} dB",
                before,
                recording.device().preamp_gain()
            );
            print!("{}", format_device(recording.device()));
        }

        Command::Increments { config, frequencies } => {
            let device = load_config(&config)?.build_device()?;
            if device.frequency_table().is_none() {
                log::warn!("{} has no calibration table, increments are all zero", device.name());
            }
            for (frequency, increment) in device.increment_for(&frequencies)? {
                println!("{:>12.3}\t{:>10.4}", frequency, increment);
            }
        }

        Command::Mission {
            dir,
            config,
            from_header,
            calibrate,
            tone,
            percentiles,
            channel,
            json,
            no_progress,
        } => {
            let mut config = load_config(&config)?;
            let options = if from_header {
                if config.header.is_none() {
                    config.header = Some(HeaderSettings {
                        mode: RtSysMode::LowPower,
                        channel: ChannelSelector::All,
                    });
                }
                let params = config
                    .header_params()
                    .context("Device configuration has no header settings")?;
                MissionOptions::from_header(params)
            } else {
                MissionOptions::new(config.build_device()?)
            };

            let mut options = options.percentiles(percentiles).channel(channel);
            if calibrate {
                options = options.calibrate(tone.detector());
            }

            let processor = MissionProcessor::new(options).with_progress(!no_progress && !json);
            let report = processor
                .process_dir(&dir)
                .with_context(|| format!("Mission over {} aborted", dir.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", format_mission(&report));
            }
        }

        Command::Presets => print!("{}", format_presets()),
    }

    Ok(())
}
