use std::fmt;
use std::time::Duration;

use strum::{Display, FromRepr};

use crate::utils::constants::DEFAULT_SAMPLE_RATE;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// The linear PCM sample widths understood by the conversion paths.
/// All widths are signed, little-endian.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum SampleWidth {
    #[strum(serialize = "8-bit")]
    Bits8 = 8,
    #[strum(serialize = "16-bit")]
    Bits16 = 16,
    #[strum(serialize = "32-bit")]
    Bits32 = 32,
}

impl SampleWidth {
    pub fn from_bits(bits_per_sample: u8) -> Option<Self> {
        Self::from_repr(bits_per_sample)
    }
    pub fn bytes(self) -> usize {
        self as usize / 8
    }
}

/// Describes raw PCM audio: sample rate, channel count and bits per sample.
/// This is a plain value type; equality is structural.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channel_count: u8,
    pub bits_per_sample: u8,
}

impl AudioFormat {
    /// 16kHz, mono, 16-bit.
    pub const DEFAULT: AudioFormat = AudioFormat::new(DEFAULT_SAMPLE_RATE, 1, 16);

    pub const fn new(sample_rate: u32, channel_count: u8, bits_per_sample: u8) -> Self {
        Self {
            sample_rate,
            channel_count,
            bits_per_sample,
        }
    }

    /// The size (in bytes) of one frame: one sample for every channel.
    pub fn sample_size(&self) -> usize {
        (self.bits_per_sample / 8) as usize * self.channel_count as usize
    }

    pub fn sample_width(&self) -> Option<SampleWidth> {
        SampleWidth::from_bits(self.bits_per_sample)
    }

    /// The playback duration of `byte_count` bytes of audio in this format.
    /// A trailing partial frame does not count towards the duration.
    pub fn duration(&self, byte_count: usize) -> Duration {
        let sample_size = self.sample_size();
        if sample_size == 0 {
            return Duration::ZERO;
        }
        self.duration_of_frames((byte_count / sample_size) as u64)
    }

    pub fn duration_of_frames(&self, frames: u64) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let nanos = frames as u128 * NANOS_PER_SEC / self.sample_rate as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// The number of whole frames that fit in `duration`.
    /// Rounds to the nearest frame, so `frames_for(duration_of_frames(n)) == n`.
    pub fn frames_for(&self, duration: Duration) -> u64 {
        let scaled = duration.as_nanos() * self.sample_rate as u128;
        u64::try_from((scaled + NANOS_PER_SEC / 2) / NANOS_PER_SEC).unwrap_or(u64::MAX)
    }

    pub fn bytes_for(&self, duration: Duration) -> usize {
        self.frames_for(duration) as usize * self.sample_size()
    }

    pub fn is_aligned(&self, byte_count: usize) -> bool {
        let sample_size = self.sample_size();
        sample_size > 0 && byte_count % sample_size == 0
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ SampleRate: {}, ChannelCount: {}, BitsPerSample: {} }}",
            self.sample_rate, self.channel_count, self.bits_per_sample
        )
    }
}

#[cfg(test)]
mod format_tests {
    use super::*;

    #[test]
    fn test_sample_size() {
        assert_eq!(AudioFormat::new(16000, 1, 16).sample_size(), 2);
        assert_eq!(AudioFormat::new(48000, 2, 16).sample_size(), 4);
        assert_eq!(AudioFormat::new(8000, 1, 8).sample_size(), 1);
        assert_eq!(AudioFormat::new(44100, 2, 32).sample_size(), 8);
    }

    #[test]
    fn test_duration() {
        let format = AudioFormat::DEFAULT;
        assert_eq!(format.duration(32000), Duration::from_secs(1));
        assert_eq!(format.duration(3200), Duration::from_millis(100));
        // A trailing half-frame is ignored.
        assert_eq!(format.duration(3201), Duration::from_millis(100));
    }

    #[test]
    fn test_frames_round_trip() {
        let format = AudioFormat::new(48000, 1, 16);
        for frames in [0u64, 1, 7, 4799, 4800, 48001] {
            assert_eq!(format.frames_for(format.duration_of_frames(frames)), frames);
        }
        let format = AudioFormat::new(44100, 2, 16);
        for frames in [1u64, 441, 44099] {
            assert_eq!(format.frames_for(format.duration_of_frames(frames)), frames);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AudioFormat::DEFAULT.to_string(),
            "{ SampleRate: 16000, ChannelCount: 1, BitsPerSample: 16 }"
        );
    }

    #[test]
    fn test_sample_width() {
        assert_eq!(SampleWidth::from_bits(16), Some(SampleWidth::Bits16));
        assert_eq!(SampleWidth::from_bits(24), None);
        assert_eq!(SampleWidth::Bits32.bytes(), 4);
        assert_eq!(SampleWidth::Bits8.to_string(), "8-bit");
    }
}
