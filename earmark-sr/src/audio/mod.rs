//! Audio input: decoding to mono PCM and resampling to the analysis rate

pub mod decoder;
pub mod resampler;

pub use decoder::{decode_bytes, decode_file, DecodedAudio};
pub use resampler::{resample, to_mono, StreamResampler};
