use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use voicebridge::audio::{AudioBuffer, AudioFormat};
use voicebridge::speech::SpeechEvent;
use voicebridge::utils::callback::FnCallback;

// NOTE: this is not actually dead code. Each integration test binary compiles this module on its
// own and uses a different subset of it.

#[allow(dead_code)]
pub(crate) fn mono16(sample_rate: u32) -> AudioFormat {
    AudioFormat::new(sample_rate, 1, 16)
}

/// A constant-magnitude square wave: the level stays put sample to sample, which keeps the
/// moving dB average flat.
#[allow(dead_code)]
pub(crate) fn square_wave(amplitude: i16, frames: usize) -> Vec<i16> {
    (0..frames)
        .map(|i| if (i / 8) % 2 == 0 { amplitude } else { -amplitude })
        .collect()
}

#[allow(dead_code)]
pub(crate) fn square_buffer(
    format: AudioFormat,
    amplitude: i16,
    duration: Duration,
    timecode: Duration,
) -> AudioBuffer {
    let frames = format.frames_for(duration) as usize;
    AudioBuffer::from_samples_i16(format, &square_wave(amplitude, frames), timecode)
}

/// A 16-bit mono ramp 0, 1, 2, ... so every sample identifies its own position.
#[allow(dead_code)]
pub(crate) fn ramp_buffer(format: AudioFormat, start: i16, frames: usize, timecode: Duration) -> AudioBuffer {
    let samples: Vec<i16> = (0..frames).map(|i| start.wrapping_add(i as i16)).collect();
    AudioBuffer::from_samples_i16(format, &samples, timecode)
}

#[allow(dead_code)]
pub(crate) fn event_recorder() -> (
    Arc<Mutex<Vec<SpeechEvent>>>,
    FnCallback<SpeechEvent, impl FnMut(SpeechEvent) + Send + 'static>,
) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let callback = FnCallback::new(move |event: SpeechEvent| sink.lock().push(event));
    (events, callback)
}
