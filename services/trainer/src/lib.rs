pub mod audio_utils;
pub mod config;
pub mod console;
pub mod interrupt;
pub mod source;
#[cfg(feature = "voice")]
pub mod voice;
