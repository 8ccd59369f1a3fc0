use std::io::{self, Read};

use crate::audio::buffer::AudioBuffer;
use crate::audio::format::AudioFormat;
use crate::stream::PullAudioStream;

/// Reads one fixed buffer from start to end.
pub struct DiscreteAudioStream {
    buffer: AudioBuffer,
    position: usize,
}

impl DiscreteAudioStream {
    pub fn new(buffer: AudioBuffer) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }
}

impl Read for DiscreteAudioStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let read = self.remaining().min(out.len());
        out[..read].copy_from_slice(&self.buffer.data()[self.position..self.position + read]);
        self.position += read;
        Ok(read)
    }
}

impl PullAudioStream for DiscreteAudioStream {
    fn format(&self) -> AudioFormat {
        self.buffer.format()
    }
    // Rewinds to the start of the buffer.
    fn reset(&mut self) {
        self.position = 0;
    }
}
