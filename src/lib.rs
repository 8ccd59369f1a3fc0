pub mod audio;
pub mod configs;
pub mod speech;
pub mod stream;
pub mod utils;
