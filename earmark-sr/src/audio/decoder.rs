//! Audio file decoding with symphonia
//!
//! Decodes any probeable container/codec to mono f32 PCM at the file's
//! native rate. Rate conversion to the analysis rate happens afterwards in
//! the resampler; this module only gets samples out of the container.

use earmark_common::{Error, Result};
use std::fs::File;
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoded mono PCM plus the rate it was decoded at.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Duration in seconds at the native rate.
    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode an audio file to mono PCM.
pub fn decode_file(path: &Path) -> Result<DecodedAudio> {
    let file = File::open(path)
        .map_err(|e| Error::Decode(format!("failed to open {}: {e}", path.display())))?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
        hint.with_extension(ext);
    }

    decode_source(Box::new(file), hint)
}

/// Decode an in-memory audio file (e.g. an upload body) to mono PCM.
pub fn decode_bytes(bytes: Vec<u8>) -> Result<DecodedAudio> {
    decode_source(Box::new(Cursor::new(bytes)), Hint::new())
}

fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(source, Default::default());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| Error::Decode(format!("format probe failed: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .ok_or_else(|| Error::Decode("no audio track found".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("track has no sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("decoder creation failed: {e}")))?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(Error::Decode(format!("failed to read packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => append_mono(&decoded, &mut samples),
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // a damaged packet is not fatal to the stream
                warn!("decode error in packet (continuing): {e}");
            }
            Err(e) => return Err(Error::Decode(format!("fatal decode error: {e}"))),
        }
    }

    debug!(
        frames = samples.len(),
        sample_rate, "decoded audio to mono PCM"
    );

    Ok(DecodedAudio { samples, sample_rate })
}

/// Mix one decoded buffer down to mono f32 and append it.
fn append_mono(buffer: &AudioBufferRef, out: &mut Vec<f32>) {
    let channels = buffer.spec().channels.count();
    let frames = buffer.frames();
    out.reserve(frames);

    for frame_idx in 0..frames {
        let mut sum = 0.0f32;
        for ch in 0..channels {
            let sample = match buffer {
                AudioBufferRef::U8(buf) => f32::from_sample(buf.chan(ch)[frame_idx]),
                AudioBufferRef::U16(buf) => f32::from_sample(buf.chan(ch)[frame_idx]),
                AudioBufferRef::U24(buf) => f32::from_sample(buf.chan(ch)[frame_idx]),
                AudioBufferRef::U32(buf) => f32::from_sample(buf.chan(ch)[frame_idx]),
                AudioBufferRef::S8(buf) => f32::from_sample(buf.chan(ch)[frame_idx]),
                AudioBufferRef::S16(buf) => f32::from_sample(buf.chan(ch)[frame_idx]),
                AudioBufferRef::S24(buf) => f32::from_sample(buf.chan(ch)[frame_idx]),
                AudioBufferRef::S32(buf) => f32::from_sample(buf.chan(ch)[frame_idx]),
                AudioBufferRef::F32(buf) => buf.chan(ch)[frame_idx],
                AudioBufferRef::F64(buf) => buf.chan(ch)[frame_idx] as f32,
            };
            sum += sample;
        }
        out.push(sum / channels as f32);
    }
}
