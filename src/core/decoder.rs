// src/core/decoder.rs
//
// Audio decoding for recordings. WAV files are read with hound so integer
// samples are scaled exactly by their bit depth; every other container goes
// through Symphonia.

use log::debug;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use std::fs::File;
use std::path::Path;

use crate::error::{CalResult, CalibrationError};

/// Container for decoded audio data and metadata
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Interleaved samples normalized to [-1.0, 1.0]
    pub samples: Vec<f64>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of audio channels
    pub channels: usize,
    /// Bit depth as reported by the file
    pub bits_per_sample: Option<u32>,
    /// Duration in seconds
    pub duration_secs: f64,
    /// Original codec name
    pub codec_name: String,
}

impl AudioData {
    /// Build from interleaved samples
    pub fn new(samples: Vec<f64>, sample_rate: u32, channels: usize) -> CalResult<Self> {
        if channels == 0 {
            return Err(CalibrationError::Configuration("audio must have at least one channel".into()));
        }
        if sample_rate == 0 {
            return Err(CalibrationError::Configuration("sample rate must be positive".into()));
        }
        let duration_secs = samples.len() as f64 / (sample_rate as f64 * channels as f64);
        Ok(Self {
            samples,
            sample_rate,
            channels,
            bits_per_sample: None,
            duration_secs,
            codec_name: "pcm".to_string(),
        })
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// De-interleave one channel
    pub fn channel(&self, index: usize) -> CalResult<Vec<f64>> {
        if index >= self.channels {
            return Err(CalibrationError::Configuration(format!(
                "channel {} requested from {}-channel audio",
                index, self.channels
            )));
        }
        Ok(self
            .samples
            .iter()
            .skip(index)
            .step_by(self.channels)
            .copied()
            .collect())
    }
}

/// Decode audio file to floating-point samples
pub fn decode_audio(path: &Path) -> CalResult<AudioData> {
    let is_wav = path
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case("wav"));

    let audio = if is_wav {
        decode_wav(path)?
    } else {
        decode_with_symphonia(path)?
    };

    if audio.samples.is_empty() {
        return Err(CalibrationError::decode(path, "no audio samples decoded from file"));
    }
    debug!(
        "Decoded {}: {} Hz, {} channel(s), {:.2}s ({})",
        path.display(),
        audio.sample_rate,
        audio.channels,
        audio.duration_secs,
        audio.codec_name
    );
    Ok(audio)
}

fn hound_error(path: &Path, e: hound::Error) -> CalibrationError {
    match e {
        hound::Error::IoError(io) if io.kind() != std::io::ErrorKind::UnexpectedEof => {
            CalibrationError::io(path, io)
        }
        other => CalibrationError::decode(path, other),
    }
}

fn decode_wav(path: &Path) -> CalResult<AudioData> {
    let mut reader = hound::WavReader::open(path).map_err(|e| hound_error(path, e))?;
    let spec = reader.spec();

    let samples: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()
            .map_err(|e| hound_error(path, e))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 * scale))
                .collect::<Result<_, _>>()
                .map_err(|e| hound_error(path, e))?
        }
    };

    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(CalibrationError::decode(path, "file reports 0 audio channels"));
    }

    Ok(AudioData {
        duration_secs: samples.len() as f64 / (spec.sample_rate as f64 * channels as f64),
        samples,
        sample_rate: spec.sample_rate,
        channels,
        bits_per_sample: Some(spec.bits_per_sample as u32),
        codec_name: format!("wav/{:?}", spec.sample_format).to_lowercase(),
    })
}

fn decode_with_symphonia(path: &Path) -> CalResult<AudioData> {
    let file = File::open(path).map_err(|e| CalibrationError::io(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| CalibrationError::decode(path, format!("failed to detect format: {e}")))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| CalibrationError::decode(path, "no supported audio track found"))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| CalibrationError::decode(path, "file does not specify sample rate"))?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    if channels == 0 {
        return Err(CalibrationError::decode(path, "file reports 0 audio channels"));
    }
    let bits_per_sample = track.codec_params.bits_per_sample;
    let codec_name = format!("{:?}", track.codec_params.codec);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CalibrationError::decode(path, format!("failed to create decoder: {e}")))?;

    let mut samples: Vec<f64> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(CalibrationError::decode(path, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(msg)) => {
                debug!("{}: skipping undecodable packet: {}", path.display(), msg);
                continue;
            }
            Err(e) => return Err(CalibrationError::decode(path, e)),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend(buf.samples().iter().map(|&s| s as f64));
        }
    }

    Ok(AudioData {
        duration_secs: samples.len() as f64 / (sample_rate as f64 * channels as f64),
        samples,
        sample_rate,
        channels,
        bits_per_sample,
        codec_name,
    })
}
