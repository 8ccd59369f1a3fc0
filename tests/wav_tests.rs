mod common;

#[cfg(test)]
mod wav_tests {
    use std::io::Cursor;
    use std::time::Duration;

    use voicebridge::audio::{AudioBuffer, AudioFormat, save_wav_file_all};
    use voicebridge::utils::errors::VoiceBridgeError;

    use crate::common::{mono16, ramp_buffer};

    #[test]
    fn test_file_round_trip() {
        let directory = tempfile::tempdir().expect("Temporary directory expected to be created.");
        let path = directory.path().join("ramp.wav");

        let buffer = ramp_buffer(mono16(16000), -500, 1600, Duration::ZERO);
        buffer.save_wav_file(&path).expect("WAV file expected to save.");

        let loaded = AudioBuffer::from_wav_file(&path).expect("WAV file expected to load.");
        assert_eq!(loaded.format(), buffer.format());
        assert_eq!(loaded.data(), buffer.data());
        assert_eq!(loaded.timecode(), Duration::ZERO);
    }

    #[test]
    fn test_header_matches_format() {
        let format = AudioFormat::new(8000, 2, 16);
        let buffer = AudioBuffer::silence(format, Duration::from_millis(100));
        let bytes = buffer.to_wav_bytes().expect("WAV bytes expected to serialize.");

        let reader = hound::WavReader::new(Cursor::new(&bytes)).expect("Valid RIFF/WAVE expected.");
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);
        assert_eq!(reader.len() as usize, 800 * 2);
    }

    #[test]
    fn test_eight_bit_round_trip() {
        let format = AudioFormat::new(8000, 1, 8);
        let data: Vec<u8> = [-128i8, -5, 0, 5, 127].iter().map(|&s| s as u8).collect();
        let buffer = AudioBuffer::new(format, data, Duration::ZERO);

        let bytes = buffer.to_wav_bytes().unwrap();
        let loaded = AudioBuffer::from_wav_bytes(&bytes).unwrap();
        assert_eq!(loaded.format(), format);
        assert_eq!(loaded.data(), buffer.data());
    }

    #[test]
    fn test_save_all_concatenates() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("joined.wav");
        let first = ramp_buffer(mono16(16000), 0, 100, Duration::ZERO);
        let second = ramp_buffer(mono16(16000), 100, 60, Duration::from_secs(7));

        save_wav_file_all(&[first, second], &path).expect("Same-format buffers expected to save.");
        let loaded = AudioBuffer::from_wav_file(&path).unwrap();
        let expected: Vec<i16> = (0..160).collect();
        assert_eq!(loaded.samples_i16().unwrap(), expected);
    }

    #[test]
    fn test_save_all_rejects_mixed_formats() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("mixed.wav");
        let buffers = [
            AudioBuffer::silence(mono16(16000), Duration::from_millis(10)),
            AudioBuffer::silence(mono16(8000), Duration::from_millis(10)),
        ];
        let result = save_wav_file_all(&buffers, &path);
        assert!(matches!(result, Err(VoiceBridgeError::FormatMismatch { .. })));

        let result = save_wav_file_all(&[], &path);
        assert!(matches!(result, Err(VoiceBridgeError::ParameterError(_))));
    }

    #[test]
    fn test_float_wav_rejected() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..16 {
                writer.write_sample(0.25f32).unwrap();
            }
            writer.finalize().unwrap();
        }

        let result = AudioBuffer::from_wav_bytes(cursor.get_ref());
        assert!(matches!(result, Err(VoiceBridgeError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_garbage_is_a_wav_error() {
        let result = AudioBuffer::from_wav_bytes(b"definitely not a RIFF header");
        assert!(matches!(result, Err(VoiceBridgeError::WavError(_))));
    }
}
