use std::time::Duration;

use strum::{Display, EnumIter, EnumString};

use crate::audio::buffer::AudioBuffer;
use crate::audio::format::{AudioFormat, SampleWidth};
use crate::utils::errors::VoiceBridgeError;

// Segment end points, in the pre-shifted magnitude domain of each law.
const A_LAW_SEGMENT_ENDS: [i32; 8] = [0x1F, 0x3F, 0x7F, 0xFF, 0x1FF, 0x3FF, 0x7FF, 0xFFF];
const MU_LAW_SEGMENT_ENDS: [i32; 8] = [0x3F, 0x7F, 0xFF, 0x1FF, 0x3FF, 0x7FF, 0xFFF, 0x1FFF];

const SIGN_BIT: u8 = 0x80;
const QUANT_MASK: u8 = 0x0F;
const SEGMENT_MASK: u8 = 0x70;
const SEGMENT_SHIFT: u8 = 4;

const A_LAW_POSITIVE_MASK: u8 = 0xD5;
const A_LAW_NEGATIVE_MASK: u8 = 0x55;

const MU_LAW_BIAS: i32 = 0x84;
const MU_LAW_CLIP: i32 = 8159;

/// The 8-bit logarithmic telephony encodings (ITU-T G.711).
///
/// Both laws map one 16-bit signed little-endian linear sample to one byte and back. The codec
/// is stateless: encoding and decoding are pure per-sample functions, so buffers may be split at
/// any sample boundary.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum CompandingCodec {
    #[strum(to_string = "A-law", serialize = "alaw")]
    ALaw,
    #[strum(to_string = "µ-law", serialize = "ulaw", serialize = "mulaw")]
    MuLaw,
}

impl CompandingCodec {
    pub fn encode_sample(self, sample: i16) -> u8 {
        match self {
            CompandingCodec::ALaw => linear_to_a_law(sample),
            CompandingCodec::MuLaw => linear_to_mu_law(sample),
        }
    }

    pub fn decode_sample(self, code: u8) -> i16 {
        match self {
            CompandingCodec::ALaw => a_law_to_linear(code),
            CompandingCodec::MuLaw => mu_law_to_linear(code),
        }
    }

    /// Encodes 16-bit LE linear PCM into one byte per sample.
    /// # Arguments:
    /// * linear: raw 16-bit little-endian samples; must have an even length
    /// # Returns:
    /// * Ok(Vec<u8>) with `linear.len() / 2` codes, Err(VoiceBridgeError::MisalignedBuffer) on odd input
    pub fn encode(self, linear: &[u8]) -> Result<Vec<u8>, VoiceBridgeError> {
        let mut encoded = vec![0u8; linear.len() / 2];
        self.encode_into(linear, &mut encoded)?;
        Ok(encoded)
    }

    /// Encodes into the front of `encoded`, returning the number of bytes written.
    pub fn encode_into(self, linear: &[u8], encoded: &mut [u8]) -> Result<usize, VoiceBridgeError> {
        if linear.len() % 2 > 0 {
            return Err(VoiceBridgeError::MisalignedBuffer {
                length: linear.len(),
                sample_size: 2,
            });
        }
        let required = linear.len() / 2;
        if encoded.len() < required {
            return Err(VoiceBridgeError::InsufficientCapacity {
                required,
                available: encoded.len(),
            });
        }
        for (sample, code) in linear.chunks_exact(2).zip(encoded.iter_mut()) {
            *code = self.encode_sample(i16::from_le_bytes([sample[0], sample[1]]));
        }
        Ok(required)
    }

    /// Decodes one byte per sample into 16-bit LE linear PCM.
    pub fn decode(self, encoded: &[u8]) -> Vec<u8> {
        let mut linear = vec![0u8; encoded.len() * 2];
        for (code, out) in encoded.iter().zip(linear.chunks_exact_mut(2)) {
            out.copy_from_slice(&self.decode_sample(*code).to_le_bytes());
        }
        linear
    }

    /// Decodes into the front of `linear`, returning the number of bytes written.
    pub fn decode_into(self, encoded: &[u8], linear: &mut [u8]) -> Result<usize, VoiceBridgeError> {
        let required = encoded.len() * 2;
        if linear.len() < required {
            return Err(VoiceBridgeError::InsufficientCapacity {
                required,
                available: linear.len(),
            });
        }
        for (code, out) in encoded.iter().zip(linear.chunks_exact_mut(2)) {
            out.copy_from_slice(&self.decode_sample(*code).to_le_bytes());
        }
        Ok(required)
    }

    /// Encodes a 16-bit linear buffer. Other bit depths are rejected; convert first.
    pub fn encode_buffer(self, buffer: &AudioBuffer) -> Result<Vec<u8>, VoiceBridgeError> {
        if buffer.format().sample_width() != Some(SampleWidth::Bits16) {
            return Err(VoiceBridgeError::UnsupportedFormat(buffer.format()));
        }
        self.encode(buffer.data())
    }

    /// Decodes companded bytes into a 16-bit linear buffer.
    pub fn decode_buffer(
        self,
        encoded: &[u8],
        sample_rate: u32,
        channel_count: u8,
        timecode: Duration,
    ) -> AudioBuffer {
        AudioBuffer::new(
            AudioFormat::new(sample_rate, channel_count, 16),
            self.decode(encoded),
            timecode,
        )
    }
}

#[inline]
fn segment_of(magnitude: i32, segment_ends: &[i32; 8]) -> usize {
    segment_ends
        .iter()
        .position(|&end| magnitude <= end)
        .unwrap_or(segment_ends.len())
}

fn linear_to_a_law(sample: i16) -> u8 {
    let mut magnitude = (sample as i32) >> 3;
    let mask = if magnitude >= 0 {
        A_LAW_POSITIVE_MASK
    } else {
        magnitude = -magnitude - 1;
        A_LAW_NEGATIVE_MASK
    };

    let segment = segment_of(magnitude, &A_LAW_SEGMENT_ENDS);
    if segment >= A_LAW_SEGMENT_ENDS.len() {
        return 0x7F ^ mask;
    }
    let shift = if segment < 2 { 1 } else { segment };
    let code = ((segment as u8) << SEGMENT_SHIFT) | ((magnitude >> shift) as u8 & QUANT_MASK);
    code ^ mask
}

fn a_law_to_linear(code: u8) -> i16 {
    let code = code ^ A_LAW_NEGATIVE_MASK;
    let mut magnitude = ((code & QUANT_MASK) as i32) << 4;
    let segment = (code & SEGMENT_MASK) >> SEGMENT_SHIFT;
    match segment {
        0 => magnitude += 8,
        1 => magnitude += 0x108,
        _ => {
            magnitude += 0x108;
            magnitude <<= segment - 1;
        }
    }
    if code & SIGN_BIT > 0 {
        magnitude as i16
    } else {
        -magnitude as i16
    }
}

fn linear_to_mu_law(sample: i16) -> u8 {
    let mut magnitude = (sample as i32) >> 2;
    let mask = if magnitude < 0 {
        magnitude = -magnitude;
        0x7F
    } else {
        0xFF
    };
    magnitude = magnitude.min(MU_LAW_CLIP) + (MU_LAW_BIAS >> 2);

    let segment = segment_of(magnitude, &MU_LAW_SEGMENT_ENDS);
    if segment >= MU_LAW_SEGMENT_ENDS.len() {
        return 0x7F ^ mask;
    }
    let code = ((segment as u8) << SEGMENT_SHIFT) | ((magnitude >> (segment + 1)) as u8 & QUANT_MASK);
    code ^ mask
}

fn mu_law_to_linear(code: u8) -> i16 {
    let code = !code;
    let mut magnitude = (((code & QUANT_MASK) as i32) << 3) + MU_LAW_BIAS;
    magnitude <<= (code & SEGMENT_MASK) >> SEGMENT_SHIFT;
    if code & SIGN_BIT > 0 {
        (MU_LAW_BIAS - magnitude) as i16
    } else {
        (magnitude - MU_LAW_BIAS) as i16
    }
}

#[cfg(test)]
mod companding_tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(CompandingCodec::ALaw.encode_sample(0), 0xD5);
        assert_eq!(CompandingCodec::ALaw.decode_sample(0xD5), 8);
        assert_eq!(CompandingCodec::MuLaw.encode_sample(0), 0xFF);
        assert_eq!(CompandingCodec::MuLaw.decode_sample(0xFF), 0);

        assert_eq!(CompandingCodec::ALaw.encode_sample(i16::MIN), 0x2A);
        assert_eq!(CompandingCodec::ALaw.encode_sample(i16::MAX), 0xAA);
        assert_eq!(CompandingCodec::MuLaw.encode_sample(i16::MIN), 0x00);
        assert_eq!(CompandingCodec::MuLaw.encode_sample(i16::MAX), 0x80);
        assert_eq!(CompandingCodec::MuLaw.decode_sample(0x00), -32124);
    }

    #[test]
    fn test_every_code_survives_a_round_trip() {
        for code in 0..=255u8 {
            let linear = CompandingCodec::ALaw.decode_sample(code);
            assert_eq!(CompandingCodec::ALaw.encode_sample(linear), code);
        }
        // µ-law has two zeros (0x7F and 0xFF); only the positive one comes back.
        for code in (0..=255u8).filter(|&code| code != 0x7F) {
            let linear = CompandingCodec::MuLaw.decode_sample(code);
            assert_eq!(CompandingCodec::MuLaw.encode_sample(linear), code);
        }
    }

    #[test]
    fn test_quantization_error_is_relative() {
        for codec in CompandingCodec::iter() {
            let mut previous = i16::MIN;
            for sample in (i16::MIN..=i16::MAX).step_by(7) {
                let decoded = codec.decode_sample(codec.encode_sample(sample));
                let error = (decoded as i32 - sample as i32).abs();
                assert!(
                    error <= (sample as i32).abs() / 16 + 16,
                    "{}: {} decoded as {}",
                    codec,
                    sample,
                    decoded
                );
                // Monotonic: louder input never decodes quieter.
                assert!(decoded >= previous);
                previous = decoded;
            }
        }
    }

    #[test]
    fn test_odd_input_is_misaligned() {
        let result = CompandingCodec::ALaw.encode(&[0u8; 5]);
        assert!(matches!(
            result,
            Err(VoiceBridgeError::MisalignedBuffer {
                length: 5,
                sample_size: 2
            })
        ));
    }

    #[test]
    fn test_decode_into_capacity() {
        let mut linear = [0u8; 3];
        let result = CompandingCodec::MuLaw.decode_into(&[0xFF, 0xFF], &mut linear);
        assert!(matches!(
            result,
            Err(VoiceBridgeError::InsufficientCapacity {
                required: 4,
                available: 3
            })
        ));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("alaw".parse::<CompandingCodec>(), Ok(CompandingCodec::ALaw));
        assert_eq!("ulaw".parse::<CompandingCodec>(), Ok(CompandingCodec::MuLaw));
        assert_eq!(CompandingCodec::ALaw.to_string(), "A-law");
    }
}
