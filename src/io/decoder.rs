//! Audio decoding using Symphonia
//!
//! Recordings may arrive in any container the collaborator's capture layer
//! produces; this decodes the first audio track to an interleaved waveform.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::waveform::Waveform;
use crate::error::AnalysisError;

fn decoding_error(err: SymphoniaError) -> AnalysisError {
    AnalysisError::DecodingError(err.to_string())
}

/// Decode an audio file to interleaved PCM samples
///
/// # Arguments
///
/// * `path` - Path to audio file
///
/// # Returns
///
/// Waveform with the file's native sample rate and channel count
///
/// # Errors
///
/// Returns `AnalysisError::DecodingError` if the file cannot be opened, has
/// no decodable audio track, or decodes to nothing.
pub fn decode_audio<P: AsRef<Path>>(path: P) -> Result<Waveform, AnalysisError> {
    let path = path.as_ref();
    log::debug!("Decoding audio file: {}", path.display());

    let src = File::open(path).map_err(|e| AnalysisError::DecodingError(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(decoding_error)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::DecodingError("No supported audio tracks found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decoding_error)?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decoding_error(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count() as u16);

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                all_samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet in {}: {}", path.display(), msg);
            }
            Err(e) => return Err(decoding_error(e)),
        }
    }

    if all_samples.is_empty() {
        return Err(AnalysisError::DecodingError(format!(
            "No audio decoded from {}",
            path.display()
        )));
    }

    let sample_rate = sample_rate.ok_or_else(|| {
        AnalysisError::DecodingError("Stream does not declare a sample rate".to_string())
    })?;
    let channels = channels.unwrap_or(1);

    log::debug!(
        "Decoded {} samples at {} Hz, {} channel(s)",
        all_samples.len(),
        sample_rate,
        channels
    );

    Waveform::new(all_samples, sample_rate, channels)
}
