pub mod buffer;
pub mod companding;
pub mod converter;
pub mod format;
pub mod pcm;
pub mod sink;
pub mod sources;
pub mod wav;

pub use buffer::AudioBuffer;
pub use format::{AudioFormat, SampleWidth};
pub use wav::save_wav_file_all;
