//! Embedded configuration header of multi-channel recorders
//!
//! Some recorders write a fixed-layout configuration block into every file.
//! The block size is a little-endian `u32` at [`CONF_SIZE_OFFSET`]; the block
//! itself starts at [`CONF_BLOCK_OFFSET`]. Fields are decoded from the block
//! with the static table [`HEADER_FIELDS`].
//!
//! Older firmware writes shorter blocks. Fields lying entirely past the end of
//! the block are absent from the record; a field cut in half by the block end
//! is a format error.
//!
//! In WAV recordings the same block is stored as a RIFF chunk with id `conf`
//! ([`decode_header_from_riff`]); [`decode_header_file`] picks the layout
//! from the file's magic bytes.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{CalResult, CalibrationError};

/// Offset of the `u32` holding the configuration block size
pub const CONF_SIZE_OFFSET: usize = 32;
/// Offset of the first byte of the configuration block
pub const CONF_BLOCK_OFFSET: usize = 40;
/// Chunk id of the configuration block inside a RIFF/WAVE file
pub const RIFF_CONF_CHUNK_ID: &[u8; 4] = b"conf";
/// Upper bound on a plausible configuration block
pub const MAX_CONF_SIZE: usize = 64 * 1024;

/// Binary encoding of a header field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Fixed-length character array decoded as text
    Text,
    /// Fixed-length character array kept byte by byte
    Chars,
    U32,
    F32,
    F64,
    /// Consecutive little-endian `f32` values
    F32Array,
}

impl FieldType {
    fn element_width(&self) -> usize {
        match self {
            FieldType::Text | FieldType::Chars => 1,
            FieldType::U32 | FieldType::F32 | FieldType::F32Array => 4,
            FieldType::F64 => 8,
        }
    }
}

/// Name, encoding and block-relative byte range of one field
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub field_type: FieldType,
    pub start: usize,
    pub end: usize,
}

const fn field(name: &'static str, field_type: FieldType, start: usize, end: usize) -> FieldSpec {
    FieldSpec {
        name,
        field_type,
        start,
        end,
    }
}

/// Field table of the configuration block (bytes 21..24 are padding)
pub static HEADER_FIELDS: &[FieldSpec] = &[
    field("conf", FieldType::Text, 0, 4),
    field("conf_size", FieldType::U32, 4, 8),
    field("conf_version", FieldType::U32, 8, 12),
    field("epoch_time_recording", FieldType::F64, 12, 20),
    field("channel", FieldType::Text, 20, 21),
    field("sample_rate", FieldType::F32, 24, 28),
    field("active_channels", FieldType::Chars, 28, 32),
    field("hydrophone_sensitivity_A", FieldType::F32, 32, 36),
    field("hydrophone_sensitivity_B", FieldType::F32, 36, 40),
    field("hydrophone_sensitivity_C", FieldType::F32, 40, 44),
    field("hydrophone_sensitivity_D", FieldType::F32, 44, 48),
    field("amplification_A", FieldType::F32, 48, 52),
    field("amplification_B", FieldType::F32, 52, 56),
    field("amplification_C", FieldType::F32, 56, 60),
    field("amplification_D", FieldType::F32, 60, 64),
    field("correction_factor_A", FieldType::F32, 64, 68),
    field("correction_factor_B", FieldType::F32, 68, 72),
    field("correction_factor_C", FieldType::F32, 72, 76),
    field("correction_factor_D", FieldType::F32, 76, 80),
    field("serial_number", FieldType::F32Array, 80, 96),
];

/// Size of a block carrying every field in [`HEADER_FIELDS`]
pub const FULL_CONF_SIZE: usize = 96;

/// A decoded header value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Text(String),
    Chars(Vec<u8>),
    U32(u32),
    F32(f32),
    F64(f64),
    F32Array(Vec<f32>),
}

/// Recorder channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, serde::Deserialize)]
pub enum Channel {
    A,
    B,
    C,
    D,
}

impl Channel {
    pub fn all() -> [Channel; 4] {
        [Channel::A, Channel::B, Channel::C, Channel::D]
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::all().get(index).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn letter(&self) -> &'static str {
        match self {
            Channel::A => "A",
            Channel::B => "B",
            Channel::C => "C",
            Channel::D => "D",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_uppercase().as_str() {
            "A" => Some(Channel::A),
            "B" => Some(Channel::B),
            "C" => Some(Channel::C),
            "D" => Some(Channel::D),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Immutable name → value mapping decoded from one configuration block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderRecord {
    conf_size: usize,
    fields: Vec<(&'static str, HeaderValue)>,
}

impl HeaderRecord {
    pub fn conf_size(&self) -> usize {
        self.conf_size
    }

    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &HeaderValue)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    fn require(&self, name: &str) -> CalResult<&HeaderValue> {
        self.get(name)
            .ok_or_else(|| CalibrationError::Format(format!("header field '{name}' missing")))
    }

    pub fn f32_field(&self, name: &str) -> CalResult<f32> {
        match self.require(name)? {
            HeaderValue::F32(v) => Ok(*v),
            other => Err(type_mismatch(name, other)),
        }
    }

    pub fn u32_field(&self, name: &str) -> CalResult<u32> {
        match self.require(name)? {
            HeaderValue::U32(v) => Ok(*v),
            other => Err(type_mismatch(name, other)),
        }
    }

    pub fn text_field(&self, name: &str) -> CalResult<&str> {
        match self.require(name)? {
            HeaderValue::Text(v) => Ok(v.as_str()),
            other => Err(type_mismatch(name, other)),
        }
    }

    pub fn sample_rate(&self) -> CalResult<f64> {
        Ok(self.f32_field("sample_rate")? as f64)
    }

    pub fn conf_version(&self) -> CalResult<u32> {
        self.u32_field("conf_version")
    }

    /// Channel the file was recorded on
    pub fn recorded_channel(&self) -> CalResult<Channel> {
        let text = self.text_field("channel")?;
        Channel::from_name(text)
            .ok_or_else(|| CalibrationError::Format(format!("unknown recorded channel '{text}'")))
    }

    /// Channels whose bitmap byte is non-null, in bitmap order
    pub fn active_channels(&self) -> CalResult<Vec<Channel>> {
        match self.require("active_channels")? {
            HeaderValue::Chars(bytes) => Ok(bytes
                .iter()
                .enumerate()
                .filter(|&(_, &b)| b != 0)
                .filter_map(|(i, _)| Channel::from_index(i))
                .collect()),
            other => Err(type_mismatch("active_channels", other)),
        }
    }

    /// Serial number elements, when the block is long enough to carry them
    pub fn serial_number(&self) -> Option<&[f32]> {
        match self.get("serial_number") {
            Some(HeaderValue::F32Array(values)) => Some(values),
            _ => None,
        }
    }

    /// Recording start from `epoch_time_recording`
    pub fn recording_time(&self) -> CalResult<DateTime<Utc>> {
        let epoch = match self.require("epoch_time_recording")? {
            HeaderValue::F64(v) => *v,
            other => return Err(type_mismatch("epoch_time_recording", other)),
        };
        if !epoch.is_finite() {
            return Err(CalibrationError::Format(format!("invalid recording epoch {epoch}")));
        }

        let secs = epoch.floor();
        let nanos = ((epoch - secs) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
            .ok_or_else(|| CalibrationError::Format(format!("recording epoch {epoch} out of range")))
    }
}

fn type_mismatch(name: &str, value: &HeaderValue) -> CalibrationError {
    CalibrationError::Format(format!("header field '{name}' has unexpected type: {value:?}"))
}

fn read_u32_le(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_f32_le(bytes: &[u8]) -> f32 {
    f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn decode_text(bytes: &[u8]) -> String {
    let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn decode_field(spec: &FieldSpec, bytes: &[u8]) -> CalResult<HeaderValue> {
    let width = spec.field_type.element_width();
    if bytes.len() % width != 0 || bytes.is_empty() {
        return Err(CalibrationError::Format(format!(
            "field '{}' spans {} bytes, not a multiple of {}",
            spec.name,
            bytes.len(),
            width
        )));
    }

    let value = match spec.field_type {
        FieldType::Text => HeaderValue::Text(decode_text(bytes)),
        FieldType::Chars => HeaderValue::Chars(bytes.to_vec()),
        FieldType::U32 => HeaderValue::U32(read_u32_le(bytes)),
        FieldType::F32 => HeaderValue::F32(read_f32_le(bytes)),
        FieldType::F64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[..8]);
            HeaderValue::F64(f64::from_le_bytes(raw))
        }
        FieldType::F32Array => HeaderValue::F32Array(bytes.chunks_exact(4).map(read_f32_le).collect()),
    };
    Ok(value)
}

/// Read the configuration block size from the start of a buffer
pub fn read_conf_size(buffer: &[u8]) -> CalResult<usize> {
    let bytes = buffer
        .get(CONF_SIZE_OFFSET..CONF_SIZE_OFFSET + 4)
        .ok_or_else(|| {
            CalibrationError::Format(format!(
                "buffer of {} bytes too short for the configuration size field",
                buffer.len()
            ))
        })?;
    let size = read_u32_le(bytes) as usize;
    if size == 0 || size > MAX_CONF_SIZE {
        return Err(CalibrationError::Format(format!(
            "implausible configuration block size {size}"
        )));
    }
    Ok(size)
}

/// Decode the configuration block of a recording held in memory
pub fn decode_header(buffer: &[u8]) -> CalResult<HeaderRecord> {
    let conf_size = read_conf_size(buffer)?;
    let block = buffer
        .get(CONF_BLOCK_OFFSET..CONF_BLOCK_OFFSET + conf_size)
        .ok_or_else(|| {
            CalibrationError::Format(format!(
                "configuration block of {} bytes at offset {} runs past the {}-byte buffer",
                conf_size,
                CONF_BLOCK_OFFSET,
                buffer.len()
            ))
        })?;

    let record = decode_block(block)?;
    if let Ok(inner) = record.u32_field("conf_size") {
        if inner as usize != conf_size {
            warn!(
                "Configuration block declares {} bytes internally but {} in its size field",
                inner, conf_size
            );
        }
    }
    Ok(record)
}

/// Decode the fields of a configuration block that has already been located
fn decode_block(block: &[u8]) -> CalResult<HeaderRecord> {
    let mut fields = Vec::with_capacity(HEADER_FIELDS.len());
    for spec in HEADER_FIELDS {
        if spec.start >= block.len() {
            continue;
        }
        if spec.end > block.len() {
            return Err(CalibrationError::Format(format!(
                "field '{}' ({}..{}) cut by the end of a {}-byte block",
                spec.name,
                spec.start,
                spec.end,
                block.len()
            )));
        }
        fields.push((spec.name, decode_field(spec, &block[spec.start..spec.end])?));
    }

    let record = HeaderRecord {
        conf_size: block.len(),
        fields,
    };
    debug!(
        "Decoded configuration block: {} bytes, version {:?}, {} fields",
        record.conf_size,
        record.conf_version().ok(),
        record.fields.len()
    );
    Ok(record)
}

/// Decode the configuration block from any byte stream
///
/// Only the prefix holding the block is consumed, so the stream may be an
/// entry already opened from an archive.
pub fn decode_header_from_reader<R: Read>(reader: &mut R) -> CalResult<HeaderRecord> {
    let mut prefix = vec![0u8; CONF_BLOCK_OFFSET];
    read_exact_or_format(reader, &mut prefix, "header prefix")?;

    let conf_size = read_conf_size(&prefix)?;
    let mut block = vec![0u8; conf_size];
    read_exact_or_format(reader, &mut block, "configuration block")?;

    prefix.extend_from_slice(&block);
    decode_header(&prefix)
}

/// Decode the configuration chunk of a RIFF/WAVE stream
///
/// The block is stored as a chunk with id `conf`, so its own `conf` and
/// `conf_size` fields are the chunk header and `conf_size` counts the bytes
/// after it. Every other chunk is skipped without being read.
pub fn decode_header_from_riff<R: Read + Seek>(reader: &mut R) -> CalResult<HeaderRecord> {
    let mut riff = [0u8; 12];
    read_exact_or_format(reader, &mut riff, "RIFF header")?;
    if !is_riff_wave(&riff) {
        return Err(CalibrationError::Format("stream is not RIFF/WAVE".into()));
    }

    loop {
        let mut chunk = [0u8; 8];
        match reader.read_exact(&mut chunk) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(CalibrationError::Format(format!(
                    "RIFF stream has no '{}' chunk",
                    String::from_utf8_lossy(RIFF_CONF_CHUNK_ID)
                )));
            }
            Err(e) => return Err(CalibrationError::io("<stream>", e)),
        }
        let body = read_u32_le(&chunk[4..8]) as usize;

        if chunk[0..4].eq_ignore_ascii_case(RIFF_CONF_CHUNK_ID) {
            if body + 8 > MAX_CONF_SIZE {
                return Err(CalibrationError::Format(format!(
                    "implausible configuration chunk of {body} bytes"
                )));
            }
            let mut block = vec![0u8; body + 8];
            block[..8].copy_from_slice(&chunk);
            read_exact_or_format(reader, &mut block[8..], "configuration chunk")?;
            return decode_block(&block);
        }

        // chunk bodies are padded to an even length
        let skip = body as i64 + (body & 1) as i64;
        reader
            .seek(SeekFrom::Current(skip))
            .map_err(|e| CalibrationError::io("<stream>", e))?;
    }
}

fn is_riff_wave(prefix: &[u8]) -> bool {
    prefix.len() >= 12 && &prefix[0..4] == b"RIFF" && &prefix[8..12] == b"WAVE"
}

/// Decode the configuration block of a recording on disk
///
/// RIFF/WAVE files carry the block as a `conf` chunk; any other file is
/// read with the fixed prefix layout.
pub fn decode_header_file(path: &Path) -> CalResult<HeaderRecord> {
    let mut file = File::open(path).map_err(|e| CalibrationError::io(path, e))?;

    let mut magic = [0u8; 12];
    let riff = match file.read_exact(&mut magic) {
        Ok(()) => is_riff_wave(&magic),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(CalibrationError::io(path, e)),
    };
    file.seek(SeekFrom::Start(0)).map_err(|e| CalibrationError::io(path, e))?;

    let decoded = if riff {
        decode_header_from_riff(&mut file)
    } else {
        decode_header_from_reader(&mut file)
    };
    decoded.map_err(|e| match e {
        CalibrationError::Format(msg) => CalibrationError::Format(format!("{}: {}", path.display(), msg)),
        CalibrationError::Io { source, .. } => CalibrationError::io(path, source),
        other => other,
    })
}

fn read_exact_or_format<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> CalResult<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CalibrationError::Format(format!("stream ended inside the {what}"))
        } else {
            CalibrationError::io("<stream>", e)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a recording prefix with a configuration block of `conf_size` bytes
    fn crafted(conf_size: usize, active: [u8; 4]) -> Vec<u8> {
        let mut buf = vec![0u8; CONF_BLOCK_OFFSET + conf_size];
        buf[CONF_SIZE_OFFSET..CONF_SIZE_OFFSET + 4].copy_from_slice(&(conf_size as u32).to_le_bytes());

        let block = &mut buf[CONF_BLOCK_OFFSET..];
        block[0..4].copy_from_slice(b"conf");
        block[4..8].copy_from_slice(&(conf_size as u32).to_le_bytes());
        block[8..12].copy_from_slice(&3u32.to_le_bytes());
        block[12..20].copy_from_slice(&1_633_957_869.5f64.to_le_bytes());
        block[20] = b'A';
        block[24..28].copy_from_slice(&156_250.0f32.to_le_bytes());
        block[28..32].copy_from_slice(&active);
        block[32..36].copy_from_slice(&(-180.0f32).to_le_bytes());
        block[36..40].copy_from_slice(&(-178.5f32).to_le_bytes());
        block[48..52].copy_from_slice(&0.25f32.to_le_bytes());
        block[52..56].copy_from_slice(&0.5f32.to_le_bytes());
        if conf_size >= FULL_CONF_SIZE {
            block[64..68].copy_from_slice(&2.0f32.to_le_bytes());
            block[68..72].copy_from_slice(&1.0f32.to_le_bytes());
            for (i, v) in [2.0f32, 0.0, 0.0, 3.0].iter().enumerate() {
                block[80 + 4 * i..84 + 4 * i].copy_from_slice(&v.to_le_bytes());
            }
        }
        buf
    }

    #[test]
    fn test_decode_short_block() {
        let buf = crafted(64, [b'A', 0, 0, 0]);
        assert_eq!(buf.len(), 104);

        let record = decode_header(&buf).unwrap();
        assert_eq!(record.conf_size(), 64);
        assert_eq!(record.text_field("conf").unwrap(), "conf");
        assert_eq!(record.conf_version().unwrap(), 3);
        assert_eq!(record.f32_field("hydrophone_sensitivity_A").unwrap(), -180.0);
        assert_eq!(record.sample_rate().unwrap(), 156_250.0);
        assert_eq!(record.recorded_channel().unwrap(), Channel::A);
        assert_eq!(
            record.get("active_channels"),
            Some(&HeaderValue::Chars(vec![b'A', 0, 0, 0]))
        );
        assert_eq!(record.active_channels().unwrap(), vec![Channel::A]);

        // Trailing fields are beyond a 64-byte block
        assert!(!record.contains("correction_factor_A"));
        assert!(record.serial_number().is_none());
    }

    #[test]
    fn test_decode_full_block() {
        let buf = crafted(FULL_CONF_SIZE, [b'A', b'B', 0, 0]);
        let record = decode_header(&buf).unwrap();

        assert_eq!(record.fields().count(), HEADER_FIELDS.len());
        assert_eq!(record.active_channels().unwrap(), vec![Channel::A, Channel::B]);
        assert_eq!(record.f32_field("correction_factor_A").unwrap(), 2.0);
        assert_eq!(record.serial_number(), Some(&[2.0f32, 0.0, 0.0, 3.0][..]));
    }

    #[test]
    fn test_recording_time() {
        let record = decode_header(&crafted(64, [1, 0, 0, 0])).unwrap();
        let time = record.recording_time().unwrap();
        assert_eq!(time.timestamp(), 1_633_957_869);
        assert_eq!(time.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_truncated_buffer_is_format_error() {
        let mut buf = crafted(64, [b'A', 0, 0, 0]);
        buf.truncate(80);
        assert!(matches!(decode_header(&buf), Err(CalibrationError::Format(_))));

        assert!(matches!(decode_header(&[0u8; 10]), Err(CalibrationError::Format(_))));
    }

    #[test]
    fn test_split_field_is_format_error() {
        // A 30-byte block cuts active_channels (28..32) in half
        let mut buf = crafted(64, [b'A', 0, 0, 0]);
        buf[CONF_SIZE_OFFSET..CONF_SIZE_OFFSET + 4].copy_from_slice(&30u32.to_le_bytes());
        assert!(matches!(decode_header(&buf), Err(CalibrationError::Format(_))));
    }

    #[test]
    fn test_zero_conf_size_rejected() {
        let mut buf = crafted(64, [b'A', 0, 0, 0]);
        buf[CONF_SIZE_OFFSET..CONF_SIZE_OFFSET + 4].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(decode_header(&buf), Err(CalibrationError::Format(_))));
    }

    #[test]
    fn test_decode_from_reader_consumes_prefix_only() {
        let mut buf = crafted(64, [b'A', 0, 0, 0]);
        buf.extend_from_slice(&[0xAB; 1000]);
        let mut cursor = std::io::Cursor::new(buf);

        let record = decode_header_from_reader(&mut cursor).unwrap();
        assert_eq!(record.conf_size(), 64);
        assert_eq!(cursor.position(), 104);
    }

    /// RIFF/WAVE stream: an odd-sized chunk, the `conf` chunk, then `data`
    fn riff_with_conf(active: [u8; 4]) -> Vec<u8> {
        let mut block = crafted(FULL_CONF_SIZE, active).split_off(CONF_BLOCK_OFFSET);
        let body = (block.len() - 8) as u32;
        block[4..8].copy_from_slice(&body.to_le_bytes());

        let mut chunks = Vec::new();
        chunks.extend_from_slice(b"junk");
        chunks.extend_from_slice(&3u32.to_le_bytes());
        chunks.extend_from_slice(&[1, 2, 3, 0]);
        chunks.extend_from_slice(&block);
        chunks.extend_from_slice(b"data");
        chunks.extend_from_slice(&4u32.to_le_bytes());
        chunks.extend_from_slice(&[0; 4]);

        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&((chunks.len() + 4) as u32).to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(&chunks);
        buf
    }

    #[test]
    fn test_decode_riff_conf_chunk() {
        let mut cursor = std::io::Cursor::new(riff_with_conf([b'A', 0, b'C', 0]));
        let record = decode_header_from_riff(&mut cursor).unwrap();

        assert_eq!(record.conf_size(), FULL_CONF_SIZE);
        assert_eq!(record.u32_field("conf_size").unwrap(), (FULL_CONF_SIZE - 8) as u32);
        assert_eq!(record.active_channels().unwrap(), vec![Channel::A, Channel::C]);
        assert_eq!(record.f32_field("hydrophone_sensitivity_B").unwrap(), -178.5);
        assert_eq!(record.serial_number(), Some(&[2.0f32, 0.0, 0.0, 3.0][..]));
    }

    #[test]
    fn test_riff_without_conf_chunk() {
        let mut buf = riff_with_conf([b'A', 0, 0, 0]);
        // rename the chunk so nothing matches
        let at = 12 + 8 + 4;
        buf[at..at + 4].copy_from_slice(b"LIST");
        let result = decode_header_from_riff(&mut std::io::Cursor::new(buf));
        assert!(matches!(result, Err(CalibrationError::Format(_))));

        let not_riff = crafted(64, [b'A', 0, 0, 0]);
        let result = decode_header_from_riff(&mut std::io::Cursor::new(not_riff));
        assert!(matches!(result, Err(CalibrationError::Format(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = decode_header_file(Path::new("/nonexistent/recording.wav"));
        assert!(matches!(result, Err(CalibrationError::Io { .. })));
    }

    #[test]
    fn test_field_table_is_ordered_and_disjoint() {
        for pair in HEADER_FIELDS.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
        assert_eq!(HEADER_FIELDS.last().map(|f| f.end), Some(FULL_CONF_SIZE));
    }
}
