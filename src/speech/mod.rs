use std::time::Duration;

use crate::utils::callback::Callback;

pub mod volume_detector;

/// A speech boundary, stamped with stream timecodes.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Speech began at `timecode`.
    Started { timecode: Duration },
    /// The utterance that began at `start` ended with the silence starting at `stop`.
    /// Raised once the silence has lasted long enough, so it always arrives late.
    Stopped { start: Duration, stop: Duration },
}

// Trait alias, used until the feature reaches stable
pub trait SpeechEventCallback: Callback<Argument = SpeechEvent> + Send + 'static {}
impl<T: Callback<Argument = SpeechEvent> + Send + 'static> SpeechEventCallback for T {}

/// Classifies an audio source into speech and silence, raising [SpeechEvent]s.
pub trait SpeechDetector {
    /// Resets the detection state and starts listening to the source.
    fn start(&self);
    /// Stops listening. An utterance still open is abandoned without a Stopped event.
    fn stop(&self);
    fn detecting(&self) -> bool;
}
