use thiserror::Error;

use crate::audio::format::AudioFormat;

#[derive(Debug, Error)]
pub enum VoiceBridgeError {
    // Configuration errors: raised once, at construction.
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannelCount(u8),
    #[error("Unsupported bit depth: {0}")]
    UnsupportedBitDepth(u8),
    #[error("Unsupported sample rate conversion: {source_rate} Hz -> {destination_rate} Hz")]
    UnsupportedSampleRates {
        source_rate: u32,
        destination_rate: u32,
    },
    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(AudioFormat),
    // Per-call errors: these signal a programming error on the caller's side.
    #[error("Misaligned buffer: {length} bytes is not a multiple of the {sample_size}-byte sample size")]
    MisalignedBuffer { length: usize, sample_size: usize },
    #[error("Insufficient capacity: {required} bytes required, {available} available")]
    InsufficientCapacity { required: usize, available: usize },
    #[error("Format mismatch: expected {expected}, got {actual}")]
    FormatMismatch {
        expected: AudioFormat,
        actual: AudioFormat,
    },
    #[error("Playback error: {0}")]
    PlaybackError(String),
    #[error("Parameter Error {0}")]
    ParameterError(String),
    #[error("I/O error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("WAV error: {0}")]
    WavError(#[from] hound::Error),
}
