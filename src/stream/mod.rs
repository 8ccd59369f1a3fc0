use std::io::Read;

use crate::audio::format::AudioFormat;

pub mod continuous;
pub mod discrete;

/// Pull-style access to audio, for consumers that run their own read loop (e.g. third-party
/// recognizers). Reads go through [std::io::Read]; a read of 0 bytes means the stream is over.
pub trait PullAudioStream: Read + Send {
    fn format(&self) -> AudioFormat;
    /// Drops buffered audio and the read cursor.
    fn reset(&mut self);
}
