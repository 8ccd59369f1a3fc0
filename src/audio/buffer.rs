use std::sync::Arc;
use std::time::Duration;

use crate::audio::converter::LinearAudioConverter;
use crate::audio::format::{AudioFormat, SampleWidth};
use crate::audio::pcm::{self, PcmSample};
use crate::utils::errors::VoiceBridgeError;

/// An immutable chunk of raw PCM audio tagged with its format and the timecode of its first
/// sample (relative to a stream-local epoch, not wall-clock time).
///
/// The payload is shared: cloning an AudioBuffer is cheap and never copies sample data.
/// Nothing mutates a buffer after construction; conversion always allocates a new one.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    format: AudioFormat,
    data: Arc<[u8]>,
    timecode: Duration,
}

impl AudioBuffer {
    pub fn new(format: AudioFormat, data: impl Into<Arc<[u8]>>, timecode: Duration) -> Self {
        Self {
            format,
            data: data.into(),
            timecode,
        }
    }

    /// Packs 16-bit samples (interleaved if the format has more than one channel).
    pub fn from_samples_i16(format: AudioFormat, samples: &[i16], timecode: Duration) -> Self {
        Self::new(format, pcm::samples_to_bytes(samples), timecode)
    }

    /// A zero-filled buffer of (whole frames of) `duration`, starting at timecode zero.
    pub fn silence(format: AudioFormat, duration: Duration) -> Self {
        Self::new(format, vec![0u8; format.bytes_for(duration)], Duration::ZERO)
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }
    pub fn data(&self) -> &[u8] {
        &self.data
    }
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }
    pub fn timecode(&self) -> Duration {
        self.timecode
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn frame_count(&self) -> usize {
        match self.format.sample_size() {
            0 => 0,
            size => self.data.len() / size,
        }
    }
    pub fn duration(&self) -> Duration {
        self.format.duration(self.data.len())
    }
    /// The timecode just past the last sample.
    pub fn end_timecode(&self) -> Duration {
        self.timecode + self.duration()
    }

    /// Same payload, restamped.
    pub fn with_timecode(&self, timecode: Duration) -> Self {
        Self {
            format: self.format,
            data: Arc::clone(&self.data),
            timecode,
        }
    }

    /// Converts the whole buffer into `format`. The timecode is carried over unchanged:
    /// conversion resamples the samples, not time.
    pub fn convert_to(&self, format: AudioFormat) -> Result<AudioBuffer, VoiceBridgeError> {
        let converter = LinearAudioConverter::new(self.format, format)?;
        self.convert_with(&converter)
    }

    /// Converts using a pre-built converter (whose source format must match this buffer).
    pub fn convert_with(
        &self,
        converter: &LinearAudioConverter,
    ) -> Result<AudioBuffer, VoiceBridgeError> {
        if converter.source_format() != self.format {
            return Err(VoiceBridgeError::FormatMismatch {
                expected: converter.source_format(),
                actual: self.format,
            });
        }
        let data = converter.convert(&self.data)?;
        Ok(AudioBuffer::new(
            converter.destination_format(),
            data,
            self.timecode,
        ))
    }

    /// One float per frame: the channel average, normalized to [-1, 1].
    /// A trailing partial frame is ignored.
    pub fn normalized_samples(&self) -> Result<Vec<f32>, VoiceBridgeError> {
        let width = self
            .format
            .sample_width()
            .ok_or(VoiceBridgeError::UnsupportedBitDepth(
                self.format.bits_per_sample,
            ))?;
        let channels = self.format.channel_count as usize;
        if channels == 0 {
            return Err(VoiceBridgeError::UnsupportedChannelCount(0));
        }
        let frame_size = self.format.sample_size();
        let samples = self
            .data
            .chunks_exact(frame_size)
            .map(|frame| {
                let sum: f64 = frame
                    .chunks_exact(width.bytes())
                    .map(|sample| pcm::read_normalized(width, sample))
                    .sum();
                (sum / channels as f64) as f32
            })
            .collect();
        Ok(samples)
    }

    /// The raw samples as i16, when the buffer is 16-bit.
    pub fn samples_i16(&self) -> Result<Vec<i16>, VoiceBridgeError> {
        match self.format.sample_width() {
            Some(SampleWidth::Bits16) => Ok(pcm::bytes_to_samples::<i16>(&self.data)),
            _ => Err(VoiceBridgeError::UnsupportedFormat(self.format)),
        }
    }
}

/// Convenience for reading any supported width as i32 without normalization.
pub(crate) fn read_raw_sample(width: SampleWidth, bytes: &[u8]) -> i32 {
    match width {
        SampleWidth::Bits8 => i8::read_le(bytes) as i32,
        SampleWidth::Bits16 => i16::read_le(bytes) as i32,
        SampleWidth::Bits32 => i32::read_le(bytes),
    }
}
