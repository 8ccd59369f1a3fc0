use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use std::time::Duration;

use crate::audio::buffer::{AudioBuffer, read_raw_sample};
use crate::audio::format::{AudioFormat, SampleWidth};
use crate::utils::errors::VoiceBridgeError;

// RIFF/WAVE container support. The fmt chunk maps 1:1 onto AudioFormat; only integer PCM in the
// widths the rest of the pipeline understands (8/16/32-bit) is accepted.

fn wav_spec(format: AudioFormat) -> Result<hound::WavSpec, VoiceBridgeError> {
    if format.sample_width().is_none() {
        return Err(VoiceBridgeError::UnsupportedBitDepth(format.bits_per_sample));
    }
    if format.channel_count == 0 {
        return Err(VoiceBridgeError::UnsupportedChannelCount(0));
    }
    Ok(hound::WavSpec {
        channels: format.channel_count as u16,
        sample_rate: format.sample_rate,
        bits_per_sample: format.bits_per_sample as u16,
        sample_format: hound::SampleFormat::Int,
    })
}

fn audio_format(spec: hound::WavSpec) -> Result<AudioFormat, VoiceBridgeError> {
    let channel_count = u8::try_from(spec.channels)
        .map_err(|_| VoiceBridgeError::UnsupportedChannelCount(u8::MAX))?;
    let bits_per_sample = u8::try_from(spec.bits_per_sample)
        .map_err(|_| VoiceBridgeError::UnsupportedBitDepth(u8::MAX))?;
    let format = AudioFormat::new(spec.sample_rate, channel_count, bits_per_sample);

    if spec.sample_format == hound::SampleFormat::Float {
        return Err(VoiceBridgeError::UnsupportedFormat(format));
    }
    if format.sample_width().is_none() {
        return Err(VoiceBridgeError::UnsupportedBitDepth(bits_per_sample));
    }
    Ok(format)
}

fn write_wav<'a, W: Write + Seek>(
    writer: W,
    format: AudioFormat,
    buffers: impl IntoIterator<Item = &'a AudioBuffer>,
) -> Result<(), VoiceBridgeError> {
    let spec = wav_spec(format)?;
    // Already validated by wav_spec.
    let width = format
        .sample_width()
        .ok_or(VoiceBridgeError::UnsupportedBitDepth(format.bits_per_sample))?;

    let mut wav_writer = hound::WavWriter::new(writer, spec)?;
    for buffer in buffers {
        if buffer.format() != format {
            return Err(VoiceBridgeError::FormatMismatch {
                expected: format,
                actual: buffer.format(),
            });
        }
        for sample in buffer.data().chunks_exact(width.bytes()) {
            wav_writer.write_sample(read_raw_sample(width, sample))?;
        }
    }
    wav_writer.finalize()?;
    Ok(())
}

impl AudioBuffer {
    /// Reads a whole WAV container into one buffer (timecode zero).
    /// # Arguments:
    /// * reader: the RIFF/WAVE byte stream
    /// # Returns:
    /// * Ok(AudioBuffer) in the container's format, Err(VoiceBridgeError) on malformed data or
    ///   unsupported sample formats (float, 24-bit)
    pub fn from_wav_reader<R: Read>(reader: R) -> Result<AudioBuffer, VoiceBridgeError> {
        let mut wav_reader = hound::WavReader::new(reader)?;
        let format = audio_format(wav_reader.spec())?;
        let width = format
            .sample_width()
            .ok_or(VoiceBridgeError::UnsupportedBitDepth(format.bits_per_sample))?;

        let mut data = Vec::with_capacity(wav_reader.len() as usize * width.bytes());
        for sample in wav_reader.samples::<i32>() {
            let sample = sample?;
            // hound hands back 8-bit WAV (unsigned on disk) already recentred around zero.
            match width {
                SampleWidth::Bits8 => data.push(sample as i8 as u8),
                SampleWidth::Bits16 => data.extend_from_slice(&(sample as i16).to_le_bytes()),
                SampleWidth::Bits32 => data.extend_from_slice(&sample.to_le_bytes()),
            }
        }

        log::trace!(
            "Loaded {} bytes of WAV audio, format: {}",
            data.len(),
            format
        );
        Ok(AudioBuffer::new(format, data, Duration::ZERO))
    }

    pub fn from_wav_bytes(bytes: &[u8]) -> Result<AudioBuffer, VoiceBridgeError> {
        Self::from_wav_reader(Cursor::new(bytes))
    }

    pub fn from_wav_file<P: AsRef<Path>>(path: P) -> Result<AudioBuffer, VoiceBridgeError> {
        let file = File::open(path)?;
        Self::from_wav_reader(BufReader::new(file))
    }

    /// Serializes this buffer as a complete WAV container.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>, VoiceBridgeError> {
        let mut cursor = Cursor::new(Vec::with_capacity(self.len() + 44));
        write_wav(&mut cursor, self.format(), [self])?;
        Ok(cursor.into_inner())
    }

    pub fn save_wav_file<P: AsRef<Path>>(&self, path: P) -> Result<(), VoiceBridgeError> {
        save_wav_file_all(std::slice::from_ref(self), path)
    }
}

/// Writes several buffers back to back into one WAV file.
/// All buffers must share one format; timecodes are ignored (gaps are not filled).
pub fn save_wav_file_all<P: AsRef<Path>>(
    buffers: &[AudioBuffer],
    path: P,
) -> Result<(), VoiceBridgeError> {
    let format = buffers
        .first()
        .map(AudioBuffer::format)
        .ok_or(VoiceBridgeError::ParameterError(
            "No audio buffers to save.".to_string(),
        ))?;
    let file = File::create(path)?;
    write_wav(BufWriter::new(file), format, buffers)
}
