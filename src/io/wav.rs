//! WAV reading and writing with hound

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::waveform::Waveform;
use crate::error::AnalysisError;

/// Read a WAV file into an interleaved waveform
///
/// Integer PCM is scaled to [-1.0, 1.0); float PCM is taken as is.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<Waveform, AnalysisError> {
    let path = path.as_ref();
    log::debug!("Reading WAV file: {}", path.display());

    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_value))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Waveform::new(samples, spec.sample_rate, spec.channels)
}

/// Write a waveform as 16-bit PCM, clipping samples to [-1.0, 1.0]
pub fn write_wav<P: AsRef<Path>>(path: P, waveform: &Waveform) -> Result<(), AnalysisError> {
    let path = path.as_ref();
    log::debug!(
        "Writing {} frames ({} ch) to {}",
        waveform.frames(),
        waveform.channels(),
        path.display()
    );

    let spec = WavSpec {
        channels: waveform.channels(),
        sample_rate: waveform.sample_rate(),
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in waveform.samples() {
        let clipped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clipped * i16::MAX as f32).round() as i16)?;
    }
    writer.finalize()?;
    Ok(())
}
