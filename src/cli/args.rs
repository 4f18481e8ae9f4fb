//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::device::{ChannelSelector, RtSysMode};
use crate::core::header::Channel;
use crate::core::tone::{ToneDetector, DEFAULT_THRESHOLD};

#[derive(Parser, Debug)]
#[command(name = "hydrocal", version)]
#[command(about = "Calibrate underwater acoustic recordings")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the end-to-end gain of a parameter set
    Gain {
        /// Hydrophone sensitivity, dB re 1 V/µPa
        #[arg(short, long, allow_hyphen_values = true)]
        sensitivity: f64,

        /// Preamp gain, dB
        #[arg(short = 'g', long, allow_hyphen_values = true, default_value_t = 0.0)]
        preamp_gain: f64,

        /// Peak-to-peak input range, V
        #[arg(long, default_value_t = 2.0)]
        vpp: f64,

        /// Reference pressure, µPa
        #[arg(long, default_value_t = 1.0)]
        p_ref: f64,
    },

    /// Decode the embedded configuration header of a recording
    Header {
        file: PathBuf,

        /// Operating mode: lowpower or default
        #[arg(short, long, default_value = "lowpower")]
        mode: String,

        /// Channel selector: all, recorded or A-D
        #[arg(short, long, default_value = "all", value_parser = parse_channel_selector)]
        channel: ChannelSelector,

        /// Peak-to-peak input range of the derived devices, V
        #[arg(long, default_value_t = 5.0)]
        vpp: f64,

        #[arg(long, default_value = "RTSys")]
        model: String,

        /// JSON output format
        #[arg(long)]
        json: bool,
    },

    /// Detect the calibration tone in a recording and correct the preamp gain
    Calibrate {
        file: PathBuf,

        /// Device description (JSON)
        #[arg(short, long)]
        config: PathBuf,

        #[command(flatten)]
        tone: ToneArgs,

        /// Channel index within the recording
        #[arg(long, default_value_t = 0)]
        channel: usize,
    },

    /// Per-frequency increments relative to the flat calibration
    Increments {
        /// Device description (JSON) with a calibration table
        #[arg(short, long)]
        config: PathBuf,

        /// Frequencies, Hz
        #[arg(short, long = "freq", num_args = 1.., required = true)]
        frequencies: Vec<f64>,
    },

    /// Process every recording of a mission folder
    Mission {
        dir: PathBuf,

        /// Device description (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Configure each file's device from its embedded header
        #[arg(long)]
        from_header: bool,

        /// Recalibrate from the tone recorded in each file
        #[arg(long)]
        calibrate: bool,

        #[command(flatten)]
        tone: ToneArgs,

        /// Level percentiles to report
        #[arg(long, value_delimiter = ',', default_value = "5,50,95")]
        percentiles: Vec<f64>,

        /// Channel index within each recording
        #[arg(long, default_value_t = 0)]
        channel: usize,

        /// JSON output format
        #[arg(long)]
        json: bool,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// List available device presets
    Presets,
}

/// Tone detector settings
#[derive(Args, Debug, Clone)]
pub struct ToneArgs {
    /// Minimum tone duration, s
    #[arg(long, default_value_t = 1.0)]
    pub min_duration: f64,

    /// Envelope threshold, fraction of full scale
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Only search the first seconds of the recording
    #[arg(long)]
    pub max_duration: Option<f64>,
}

impl ToneArgs {
    pub fn detector(&self) -> ToneDetector {
        let detector = ToneDetector::new(self.min_duration).threshold(self.threshold);
        match self.max_duration {
            Some(secs) => detector.max_duration(secs),
            None => detector,
        }
    }
}

pub fn parse_mode(name: &str) -> RtSysMode {
    RtSysMode::from_name(name)
}

/// Parse `all`, `recorded` or a channel letter
pub fn parse_channel_selector(value: &str) -> Result<ChannelSelector, String> {
    match value.to_lowercase().as_str() {
        "all" => Ok(ChannelSelector::All),
        "recorded" => Ok(ChannelSelector::Recorded),
        other => Channel::from_name(other)
            .map(ChannelSelector::Only)
            .ok_or_else(|| format!("Unknown channel: {}. Use all, recorded or A-D", value)),
    }
}
