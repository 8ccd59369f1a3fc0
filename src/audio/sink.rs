use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio::buffer::AudioBuffer;
use crate::audio::format::AudioFormat;
use crate::audio::sources::SharedAudioSource;
use crate::audio::sources::paced::PacedAudioSource;
use crate::utils::errors::VoiceBridgeError;

/// A consumer of audio: a speaker, a network peer, a synthesizer feed.
pub trait AudioSink: Send + Sync {
    /// The format the sink plays natively.
    fn format(&self) -> AudioFormat;

    /// Plays `source` until `run_flag` is lowered (or the sink decides the source is exhausted).
    /// Blocks the calling thread for the duration of playback.
    fn play(&self, source: SharedAudioSource, run_flag: Arc<AtomicBool>)
    -> Result<(), VoiceBridgeError>;

    /// Plays one buffer. The buffer is paced out in real time through a [PacedAudioSource] in its
    /// own format; the call returns once the buffer has been fully emitted (or `run_flag` is
    /// lowered) and the sink has stopped.
    fn play_buffer(
        &self,
        buffer: &AudioBuffer,
        run_flag: Arc<AtomicBool>,
    ) -> Result<(), VoiceBridgeError> {
        let source = Arc::new(PacedAudioSource::new(buffer.format())?);
        let sink_flag = Arc::new(AtomicBool::new(true));

        std::thread::scope(|scope| {
            let shared: SharedAudioSource = source.clone();
            let sink_run = Arc::clone(&sink_flag);
            let playback = scope.spawn(move || self.play(shared, sink_run));

            let played = source.play(buffer, run_flag);
            sink_flag.store(false, Ordering::Release);

            let sink_result = match playback.join() {
                Ok(result) => result,
                Err(_) => Err(VoiceBridgeError::PlaybackError(
                    "AudioSink playback thread panicked.".to_string(),
                )),
            };
            played.and(sink_result)
        })
    }
}
