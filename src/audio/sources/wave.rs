use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::audio::buffer::AudioBuffer;
use crate::audio::format::AudioFormat;
use crate::audio::sources::{AudioSource, BufferFanout, BufferHandler, Subscription};
use crate::utils::constants::WAVE_CHUNK_DURATION;
use crate::utils::errors::VoiceBridgeError;

/// Plays a WAV recording into the pipeline as if it were live audio.
/// The whole container is decoded at construction; its fmt chunk becomes the source format.
pub struct WaveAudioSource {
    audio: AudioBuffer,
    listening: AtomicBool,
    fanout: BufferFanout,
}

impl WaveAudioSource {
    pub fn from_buffer(audio: AudioBuffer) -> Self {
        Self {
            audio,
            listening: AtomicBool::new(true),
            fanout: BufferFanout::new(),
        }
    }
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VoiceBridgeError> {
        Ok(Self::from_buffer(AudioBuffer::from_wav_file(path)?))
    }
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, VoiceBridgeError> {
        Ok(Self::from_buffer(AudioBuffer::from_wav_bytes(bytes)?))
    }
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, VoiceBridgeError> {
        Ok(Self::from_buffer(AudioBuffer::from_wav_reader(reader)?))
    }

    pub fn audio(&self) -> &AudioBuffer {
        &self.audio
    }

    /// Emits the recording synchronously, on the calling thread, as consecutive 50 ms buffers
    /// (the last one may be shorter) stamped from timecode zero.
    /// Chunks produced while the source is not listening are skipped, but time still advances.
    /// # Returns:
    /// * the duration of the recording
    pub fn play(&self) -> Duration {
        let format = self.audio.format();
        let chunk_size = format.bytes_for(WAVE_CHUNK_DURATION).max(format.sample_size());
        let mut timecode = Duration::ZERO;
        for chunk in self.audio.data().chunks(chunk_size.max(1)) {
            let buffer = AudioBuffer::new(format, chunk, timecode);
            timecode += buffer.duration();
            if self.listening() {
                self.fanout.dispatch(&buffer);
            }
        }
        log::debug!("Played {:?} of WAV audio, format: {}", timecode, format);
        timecode
    }
}

impl AudioSource for WaveAudioSource {
    fn format(&self) -> AudioFormat {
        self.audio.format()
    }
    fn listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }
    fn set_listening(&self, listening: bool) {
        self.listening.store(listening, Ordering::Release);
    }
    fn subscribe(&self, handler: BufferHandler) -> Subscription {
        self.fanout.subscribe(handler)
    }
}
