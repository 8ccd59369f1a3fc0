use std::fmt;

use crate::audio::format::{AudioFormat, SampleWidth};
use crate::audio::pcm;
use crate::utils::constants::{MAX_RATE_SCALE, TELEPHONY_BASE_RATE};
use crate::utils::errors::VoiceBridgeError;

/// How a converter maps input frames onto output frames.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RateScale {
    /// 1:1, frames pass through.
    Unity,
    /// N:1, N consecutive input frames are averaged into one (box filter).
    Down(u32),
    /// 1:N, every input frame is repeated N times (zero-order hold).
    Up(u32),
}

impl fmt::Display for RateScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateScale::Unity => write!(f, "1:1"),
            RateScale::Down(n) => write!(f, "{n}:1"),
            RateScale::Up(n) => write!(f, "1:{n}"),
        }
    }
}

impl RateScale {
    fn between(source_rate: u32, destination_rate: u32) -> Result<Self, VoiceBridgeError> {
        let unsupported = VoiceBridgeError::UnsupportedSampleRates {
            source_rate,
            destination_rate,
        };
        if source_rate == 0 || destination_rate == 0 {
            return Err(unsupported);
        }
        // At least one side has to sit on the telephony/desktop 8kHz grid.
        if source_rate % TELEPHONY_BASE_RATE > 0 && destination_rate % TELEPHONY_BASE_RATE > 0 {
            return Err(unsupported);
        }

        let scale = if source_rate == destination_rate {
            RateScale::Unity
        } else if source_rate % destination_rate == 0 {
            RateScale::Down(source_rate / destination_rate)
        } else if destination_rate % source_rate == 0 {
            RateScale::Up(destination_rate / source_rate)
        } else {
            return Err(unsupported);
        };

        match scale {
            RateScale::Down(n) | RateScale::Up(n) if n > MAX_RATE_SCALE => Err(unsupported),
            _ => Ok(scale),
        }
    }

    fn scale_up(self) -> usize {
        match self {
            RateScale::Up(n) => n as usize,
            _ => 1,
        }
    }

    fn scale_down(self) -> usize {
        match self {
            RateScale::Down(n) => n as usize,
            _ => 1,
        }
    }
}

/// One frame in flight inside the converter: up to two channels, normalized to [-1, 1].
/// Always carries max(source channels, destination channels) channels.
#[derive(Debug, Copy, Clone, Default)]
struct Frame {
    channels: [f64; 2],
}

/// Converts linear PCM between two formats in a single pass: bit depth (8/16/32-bit signed),
/// channel count (mono <-> stereo) and sample rate (integer ratios up to 3:1 either way).
///
/// All validation happens in [LinearAudioConverter::new]; once built, a converter only fails on
/// per-call caller errors (misaligned input, undersized destination).
///
/// Rate conversion is deliberately naive: downsampling averages groups of frames and upsampling
/// repeats frames. No state is carried between calls, so a partial trailing group at the end of
/// a downsampled input is dropped.
#[derive(Debug, Clone)]
pub struct LinearAudioConverter {
    source_format: AudioFormat,
    destination_format: AudioFormat,
    source_width: SampleWidth,
    destination_width: SampleWidth,
    scale: RateScale,
    same_format: bool,
}

impl LinearAudioConverter {
    /// Validates the format pair and builds a converter.
    /// # Arguments:
    /// * source_format: the format of the audio fed into [LinearAudioConverter::convert]
    /// * destination_format: the format of the produced audio
    /// # Returns:
    /// * Ok(LinearAudioConverter) for supported pairs, Err(VoiceBridgeError) naming the first
    ///   unsupported property otherwise.
    pub fn new(
        source_format: AudioFormat,
        destination_format: AudioFormat,
    ) -> Result<Self, VoiceBridgeError> {
        for format in [source_format, destination_format] {
            if !(1..=2).contains(&format.channel_count) {
                return Err(VoiceBridgeError::UnsupportedChannelCount(
                    format.channel_count,
                ));
            }
        }
        let source_width = source_format.sample_width().ok_or(
            VoiceBridgeError::UnsupportedBitDepth(source_format.bits_per_sample),
        )?;
        let destination_width = destination_format.sample_width().ok_or(
            VoiceBridgeError::UnsupportedBitDepth(destination_format.bits_per_sample),
        )?;
        let scale = RateScale::between(source_format.sample_rate, destination_format.sample_rate)?;

        log::debug!(
            "LinearAudioConverter: {} -> {} (rate {})",
            source_format,
            destination_format,
            scale
        );

        Ok(Self {
            source_format,
            destination_format,
            source_width,
            destination_width,
            scale,
            same_format: source_format == destination_format,
        })
    }

    pub fn source_format(&self) -> AudioFormat {
        self.source_format
    }
    pub fn destination_format(&self) -> AudioFormat {
        self.destination_format
    }
    pub fn rate_scale(&self) -> RateScale {
        self.scale
    }

    /// The exact number of bytes [LinearAudioConverter::convert] produces for `source_size`
    /// input bytes: `frames * destination_sample_size * scale_up / scale_down`.
    pub fn destination_size(&self, source_size: usize) -> Result<usize, VoiceBridgeError> {
        let source_sample_size = self.source_format.sample_size();
        if source_size % source_sample_size > 0 {
            return Err(VoiceBridgeError::MisalignedBuffer {
                length: source_size,
                sample_size: source_sample_size,
            });
        }
        if self.same_format {
            return Ok(source_size);
        }
        let sample_count = source_size / source_sample_size;
        Ok(sample_count * self.destination_format.sample_size() * self.scale.scale_up()
            / self.scale.scale_down())
    }

    /// Converts `source` into a freshly allocated buffer of exactly
    /// [LinearAudioConverter::destination_size] bytes.
    pub fn convert(&self, source: &[u8]) -> Result<Vec<u8>, VoiceBridgeError> {
        let mut destination = vec![0u8; self.destination_size(source.len())?];
        self.convert_into(source, &mut destination)?;
        Ok(destination)
    }

    /// Converts `source` into the front of `destination`.
    /// # Arguments:
    /// * source: raw audio in the source format; must be a whole number of frames
    /// * destination: the output; must hold at least [LinearAudioConverter::destination_size] bytes
    /// # Returns:
    /// * Ok(usize) the number of destination bytes claimed by the conversion,
    ///   Err(VoiceBridgeError) on misaligned input or insufficient capacity
    pub fn convert_into(
        &self,
        source: &[u8],
        destination: &mut [u8],
    ) -> Result<usize, VoiceBridgeError> {
        let destination_size = self.destination_size(source.len())?;
        if destination_size > destination.len() {
            return Err(VoiceBridgeError::InsufficientCapacity {
                required: destination_size,
                available: destination.len(),
            });
        }

        if self.same_format {
            destination[..destination_size].copy_from_slice(source);
            return Ok(destination_size);
        }

        let source_frame_size = self.source_format.sample_size();
        let destination_frame_size = self.destination_format.sample_size();
        let mut outputs = destination[..destination_size].chunks_exact_mut(destination_frame_size);

        match self.scale {
            RateScale::Unity => {
                for (source_frame, out) in source.chunks_exact(source_frame_size).zip(outputs) {
                    self.write_frame(&self.read_frame(source_frame), out);
                }
            }
            RateScale::Down(n) => {
                let n = n as usize;
                // chunks_exact drops the partial trailing group.
                for (group, out) in source.chunks_exact(source_frame_size * n).zip(outputs) {
                    let mut average = Frame::default();
                    for source_frame in group.chunks_exact(source_frame_size) {
                        let frame = self.read_frame(source_frame);
                        for (sum, channel) in average.channels.iter_mut().zip(frame.channels) {
                            *sum += channel;
                        }
                    }
                    for channel in average.channels.iter_mut() {
                        *channel /= n as f64;
                    }
                    self.write_frame(&average, out);
                }
            }
            RateScale::Up(n) => {
                for source_frame in source.chunks_exact(source_frame_size) {
                    let frame = self.read_frame(source_frame);
                    for out in outputs.by_ref().take(n as usize) {
                        self.write_frame(&frame, out);
                    }
                }
            }
        }

        Ok(destination_size)
    }

    // Reads one source frame and adapts it to the destination channel layout.
    #[inline]
    fn read_frame(&self, bytes: &[u8]) -> Frame {
        let width = self.source_width.bytes();
        let mut frame = Frame::default();
        for (channel, sample) in bytes.chunks_exact(width).enumerate() {
            frame.channels[channel] = pcm::read_normalized(self.source_width, sample);
        }

        match (
            self.source_format.channel_count,
            self.destination_format.channel_count,
        ) {
            (1, 2) => frame.channels[1] = frame.channels[0],
            (2, 1) => {
                let mixed = (frame.channels[0] + frame.channels[1]) / 2.;
                frame.channels = [mixed, mixed];
            }
            _ => {}
        }
        frame
    }

    #[inline]
    fn write_frame(&self, frame: &Frame, out: &mut [u8]) {
        let width = self.destination_width.bytes();
        for (channel, sample_out) in out.chunks_exact_mut(width).enumerate() {
            pcm::write_normalized(self.destination_width, frame.channels[channel], sample_out);
        }
    }
}

#[cfg(test)]
mod converter_tests {
    use super::*;
    use crate::audio::pcm::{bytes_to_samples, samples_to_bytes};

    fn mono16(rate: u32) -> AudioFormat {
        AudioFormat::new(rate, 1, 16)
    }

    #[test]
    fn test_rejects_unsupported_channels() {
        let result = LinearAudioConverter::new(AudioFormat::new(16000, 3, 16), mono16(16000));
        assert!(matches!(
            result,
            Err(VoiceBridgeError::UnsupportedChannelCount(3))
        ));
        let result = LinearAudioConverter::new(mono16(16000), AudioFormat::new(16000, 0, 16));
        assert!(matches!(
            result,
            Err(VoiceBridgeError::UnsupportedChannelCount(0))
        ));
    }

    #[test]
    fn test_rejects_unsupported_bit_depth() {
        let result = LinearAudioConverter::new(AudioFormat::new(16000, 1, 24), mono16(16000));
        assert!(matches!(
            result,
            Err(VoiceBridgeError::UnsupportedBitDepth(24))
        ));
    }

    #[test]
    fn test_rate_ratios() {
        let supported = [
            (8000, 16000, RateScale::Up(2)),
            (16000, 48000, RateScale::Up(3)),
            (48000, 16000, RateScale::Down(3)),
            (32000, 16000, RateScale::Down(2)),
            (44100, 44100, RateScale::Unity),
            (24000, 8000, RateScale::Down(3)),
        ];
        for (source, destination, expected) in supported {
            let converter = LinearAudioConverter::new(mono16(source), mono16(destination))
                .expect("Supported rate pair expected to build.");
            assert_eq!(converter.rate_scale(), expected);
        }

        let unsupported = [
            (8000, 48000),  // 1:6
            (48000, 8000),  // 6:1
            (16000, 44100), // not an integer ratio
            (22050, 44100), // integer ratio, but off the 8kHz grid
            (0, 16000),
        ];
        for (source, destination) in unsupported {
            let result = LinearAudioConverter::new(mono16(source), mono16(destination));
            assert!(
                matches!(result, Err(VoiceBridgeError::UnsupportedSampleRates { .. })),
                "{} -> {} expected to be rejected",
                source,
                destination
            );
        }
    }

    #[test]
    fn test_misaligned_input() {
        let converter = LinearAudioConverter::new(mono16(8000), mono16(16000)).unwrap();
        let result = converter.convert(&[0u8; 3]);
        assert!(matches!(
            result,
            Err(VoiceBridgeError::MisalignedBuffer {
                length: 3,
                sample_size: 2
            })
        ));
    }

    #[test]
    fn test_insufficient_capacity() {
        let converter = LinearAudioConverter::new(mono16(8000), mono16(16000)).unwrap();
        let source = samples_to_bytes(&[1i16, 2, 3]);
        let mut destination = [0u8; 11];
        let result = converter.convert_into(&source, &mut destination);
        assert!(matches!(
            result,
            Err(VoiceBridgeError::InsufficientCapacity {
                required: 12,
                available: 11
            })
        ));
    }

    #[test]
    fn test_convert_into_offset_destination() {
        let converter = LinearAudioConverter::new(mono16(48000), mono16(16000)).unwrap();
        let source = samples_to_bytes(&[300i16, 600, 900, 30, 60, 90]);
        let mut destination = [0xAAu8; 8];
        let written = converter
            .convert_into(&source, &mut destination[2..])
            .unwrap();
        assert_eq!(written, 4);
        assert_eq!(&destination[..2], &[0xAA, 0xAA]);
        assert_eq!(bytes_to_samples::<i16>(&destination[2..6]), vec![600, 60]);
        assert_eq!(&destination[6..], &[0xAA, 0xAA]);
    }

    #[test]
    fn test_partial_group_dropped() {
        let converter = LinearAudioConverter::new(mono16(48000), mono16(16000)).unwrap();
        // 4 frames: one full group of 3 plus a dropped straggler.
        let source = samples_to_bytes(&[300i16, 600, 900, 1200]);
        let output = converter.convert(&source).unwrap();
        assert_eq!(bytes_to_samples::<i16>(&output), vec![600]);
    }

    #[test]
    fn test_stereo_to_mono_averages() {
        let converter =
            LinearAudioConverter::new(AudioFormat::new(16000, 2, 16), mono16(16000)).unwrap();
        let source = samples_to_bytes(&[1000i16, 3000, -400, 400]);
        let output = converter.convert(&source).unwrap();
        assert_eq!(bytes_to_samples::<i16>(&output), vec![2000, 0]);
    }

    #[test]
    fn test_bit_depth_widening() {
        let converter =
            LinearAudioConverter::new(AudioFormat::new(8000, 1, 8), mono16(8000)).unwrap();
        let output = converter.convert(&[127u8, 0, (-127i8) as u8]).unwrap();
        assert_eq!(bytes_to_samples::<i16>(&output), vec![32767, 0, -32767]);
    }
}
