//! In-memory RIFF/WAVE decoder for stem and story audio.
//!
//! Files are decoded once, up front, into a flat interleaved f32 buffer so
//! the realtime path never touches the filesystem. Supported sample formats:
//! PCM 8/16/24 bit and IEEE float 32 bit.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

const RIFF_ID: &[u8; 4] = b"RIFF";
const WAVE_ID: &[u8; 4] = b"WAVE";
const FMT_ID: &[u8; 4] = b"fmt ";
const DATA_ID: &[u8; 4] = b"data";

#[derive(Debug, Error)]
pub enum WavError {
    /// Missing or truncated RIFF/WAVE structure, or `data` seen before `fmt `.
    #[error("invalid WAV header")]
    InvalidHeader,
    /// Format tag or bit depth outside PCM 8/16/24 and float 32.
    #[error("unsupported WAV format (tag {format_tag}, {bits_per_sample} bit)")]
    InvalidFormat { format_tag: u16, bits_per_sample: u16 },
    #[error("WAV read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Fully decoded audio clip. Immutable after load; players keep their own
/// read cursor and share the buffer through an `Arc`.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples when `channels > 1`.
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }
}

pub fn decode_wav_file(path: impl AsRef<Path>) -> Result<Arc<DecodedAudio>, WavError> {
    let bytes = std::fs::read(path)?;
    decode_wav(&bytes)
}

/// Decode a complete WAV file image.
///
/// The chunk scan requires `fmt ` before `data`; any other chunks are
/// skipped using their declared length, with odd-length chunks padded to an
/// even boundary as RIFF requires.
pub fn decode_wav(bytes: &[u8]) -> Result<Arc<DecodedAudio>, WavError> {
    if bytes.len() < 12 || &bytes[0..4] != RIFF_ID || &bytes[8..12] != WAVE_ID {
        return Err(WavError::InvalidHeader);
    }

    let mut pos = 12usize;
    let mut fmt: Option<FmtChunk> = None;

    while pos + 8 <= bytes.len() {
        let chunk_id = [bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]];
        let chunk_size = read_u32(&bytes[pos + 4..pos + 8]) as usize;
        let body = pos + 8;
        if body + chunk_size > bytes.len() {
            return Err(WavError::InvalidHeader);
        }

        if &chunk_id == FMT_ID {
            fmt = Some(parse_fmt(&bytes[body..body + chunk_size])?);
        } else if &chunk_id == DATA_ID {
            let fmt = fmt.ok_or(WavError::InvalidHeader)?;
            let samples = convert_to_float(&bytes[body..body + chunk_size], &fmt)?;
            return Ok(Arc::new(DecodedAudio {
                samples,
                channels: fmt.channels,
                sample_rate: fmt.sample_rate,
            }));
        }

        pos = body + chunk_size;
        if chunk_size % 2 == 1 {
            pos += 1; // RIFF pads chunks to even offsets
        }
    }

    Err(WavError::InvalidHeader)
}

struct FmtChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

fn parse_fmt(body: &[u8]) -> Result<FmtChunk, WavError> {
    if body.len() < 16 {
        return Err(WavError::InvalidHeader);
    }
    let format_tag = read_u16(&body[0..2]);
    let channels = read_u16(&body[2..4]);
    let sample_rate = read_u32(&body[4..8]);
    let bits_per_sample = read_u16(&body[14..16]);

    let supported = match (format_tag, bits_per_sample) {
        (1, 8) | (1, 16) | (1, 24) => true,
        (3, 32) => true,
        _ => false,
    };
    if !supported || channels == 0 {
        return Err(WavError::InvalidFormat {
            format_tag,
            bits_per_sample,
        });
    }

    Ok(FmtChunk {
        format_tag,
        channels,
        sample_rate,
        bits_per_sample,
    })
}

fn convert_to_float(data: &[u8], fmt: &FmtChunk) -> Result<Vec<f32>, WavError> {
    let bytes_per_sample = (fmt.bits_per_sample / 8) as usize;
    let total = data.len() / bytes_per_sample;
    let mut out = Vec::with_capacity(total);

    match (fmt.format_tag, fmt.bits_per_sample) {
        (1, 8) => {
            for &b in &data[..total] {
                out.push((b as f32 - 128.0) / 128.0);
            }
        }
        (1, 16) => {
            for chunk in data.chunks_exact(2) {
                let v = i16::from_le_bytes([chunk[0], chunk[1]]);
                out.push(v as f32 / 32768.0);
            }
        }
        (1, 24) => {
            for chunk in data.chunks_exact(3) {
                let mut v = chunk[0] as i32 | (chunk[1] as i32) << 8 | (chunk[2] as i32) << 16;
                if v & 0x80_0000 != 0 {
                    v |= !0xFF_FFFF; // sign extend
                }
                out.push(v as f32 / 8_388_608.0);
            }
        }
        (3, 32) => {
            for chunk in data.chunks_exact(4) {
                out.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            }
        }
        (tag, bits) => {
            return Err(WavError::InvalidFormat {
                format_tag: tag,
                bits_per_sample: bits,
            });
        }
    }

    Ok(out)
}

#[inline]
fn read_u16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}

#[inline]
fn read_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_image(format_tag: u16, bits: u16, channels: u16, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&0u32.to_le_bytes()); // riff size, unchecked
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&format_tag.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&48_000u32.to_le_bytes());
        let byte_rate = 48_000 * channels as u32 * bits as u32 / 8;
        out.extend_from_slice(&byte_rate.to_le_bytes());
        out.extend_from_slice(&(channels * bits / 8).to_le_bytes());
        out.extend_from_slice(&bits.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn decode_16_bit_pcm() {
        let mut data = Vec::new();
        for v in [0i16, 16384, -16384, i16::MIN] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let audio = decode_wav(&wav_image(1, 16, 1, &data)).expect("decode");
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 48_000);
        assert_eq!(audio.samples.len(), 4);
        assert!((audio.samples[1] - 0.5).abs() < 1e-6);
        assert!((audio.samples[2] + 0.5).abs() < 1e-6);
        assert!((audio.samples[3] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn decode_8_bit_unsigned() {
        let audio = decode_wav(&wav_image(1, 8, 1, &[128, 255, 0])).expect("decode");
        assert!((audio.samples[0]).abs() < 1e-6);
        assert!((audio.samples[1] - 127.0 / 128.0).abs() < 1e-6);
        assert!((audio.samples[2] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn decode_24_bit_sign_extends() {
        // -1 as 24-bit two's complement, then +8388607 (max positive)
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F];
        let audio = decode_wav(&wav_image(1, 24, 1, &data)).expect("decode");
        assert!((audio.samples[0] + 1.0 / 8_388_608.0).abs() < 1e-9);
        assert!((audio.samples[1] - 8_388_607.0 / 8_388_608.0).abs() < 1e-6);
    }

    #[test]
    fn decode_float32_is_bitwise() {
        let mut data = Vec::new();
        for v in [0.25f32, -1.5] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let audio = decode_wav(&wav_image(3, 32, 1, &data)).expect("decode");
        assert_eq!(audio.samples, vec![0.25, -1.5]);
    }

    #[test]
    fn unknown_chunks_are_skipped_with_padding() {
        // LIST chunk with odd length before data; scan must land on "data".
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&48_000u32.to_le_bytes());
        out.extend_from_slice(&96_000u32.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"LIST");
        out.extend_from_slice(&3u32.to_le_bytes());
        out.extend_from_slice(&[1, 2, 3, 0]); // 3 bytes + pad
        out.extend_from_slice(b"data");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&16384i16.to_le_bytes());

        let audio = decode_wav(&out).expect("decode");
        assert_eq!(audio.samples.len(), 1);
        assert!((audio.samples[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn data_before_fmt_is_invalid_header() {
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"data");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&[0, 0]);
        assert!(matches!(decode_wav(&out), Err(WavError::InvalidHeader)));
    }

    #[test]
    fn unsupported_format_is_rejected() {
        // ADPCM (tag 2)
        let err = decode_wav(&wav_image(2, 4, 1, &[])).unwrap_err();
        assert!(matches!(err, WavError::InvalidFormat { format_tag: 2, .. }));
        // 32-bit PCM int is not in the supported set either
        let err = decode_wav(&wav_image(1, 32, 1, &[])).unwrap_err();
        assert!(matches!(err, WavError::InvalidFormat { .. }));
    }

    #[test]
    fn short_header_is_invalid() {
        assert!(matches!(decode_wav(b"RIFF"), Err(WavError::InvalidHeader)));
        assert!(matches!(decode_wav(b"RIFFxxxxWAVE"), Err(WavError::InvalidHeader)));
    }
}
