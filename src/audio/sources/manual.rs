use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::audio::buffer::AudioBuffer;
use crate::audio::format::AudioFormat;
use crate::audio::sources::{AudioSource, BufferFanout, BufferHandler, Subscription};
use crate::utils::errors::VoiceBridgeError;

/// A source fed by hand: whatever owns it pushes buffers in through [ManualAudioSource::send].
/// Typically the bridge between a network receive loop and the rest of the pipeline.
///
/// Every buffer is restamped with the source's own running timecode (the position of its first
/// sample), so subscribers see one continuous timeline regardless of what the producer stamped.
pub struct ManualAudioSource {
    format: AudioFormat,
    listening: AtomicBool,
    position: Mutex<Duration>,
    send_lock: Mutex<()>,
    fanout: BufferFanout,
}

impl ManualAudioSource {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            listening: AtomicBool::new(true),
            position: Mutex::new(Duration::ZERO),
            send_lock: Mutex::new(()),
            fanout: BufferFanout::new(),
        }
    }

    /// Pushes one buffer through the source.
    /// The stream position advances even while the source is not listening.
    /// Handlers run inside this call; they may read [ManualAudioSource::position] but must not
    /// send into the same source.
    /// # Arguments:
    /// * buffer: audio in exactly this source's format
    /// # Returns:
    /// * Ok(()) on success, Err(VoiceBridgeError::FormatMismatch) if the formats differ
    pub fn send(&self, buffer: &AudioBuffer) -> Result<(), VoiceBridgeError> {
        if buffer.format() != self.format {
            return Err(VoiceBridgeError::FormatMismatch {
                expected: self.format,
                actual: buffer.format(),
            });
        }

        // Senders take turns so subscribers see timecodes in order. The position lock itself is
        // released before dispatch, so handlers may query it.
        let _turn = self.send_lock.lock();
        let stamped = {
            let mut position = self.position.lock();
            let stamped = buffer.with_timecode(*position);
            *position += buffer.duration();
            stamped
        };
        if self.listening() {
            self.fanout.dispatch(&stamped);
        }
        Ok(())
    }

    /// The timecode the next buffer will be stamped with.
    pub fn position(&self) -> Duration {
        *self.position.lock()
    }
}

impl AudioSource for ManualAudioSource {
    fn format(&self) -> AudioFormat {
        self.format
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
