//! WAV encoding and decoding for recorded announcements.

use crate::audio::clip::AudioClip;
use crate::error::{Result, StationvoxError};
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

/// Decode WAV data into a clip, converting any PCM or float format to i16.
pub fn decode<R: Read>(reader: R) -> Result<AudioClip> {
    let mut wav_reader = hound::WavReader::new(reader)?;
    let spec = wav_reader.spec();

    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, bits) if bits <= 16 => wav_reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        (hound::SampleFormat::Int, bits) => {
            let shift = bits.saturating_sub(16);
            wav_reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        (hound::SampleFormat::Float, _) => wav_reader
            .samples::<f32>()
            .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
            .collect::<std::result::Result<Vec<_>, _>>()?,
    };

    Ok(AudioClip::new(samples, spec.sample_rate, spec.channels))
}

/// Read a WAV file from disk.
pub fn read_file(path: &Path) -> Result<AudioClip> {
    let file = std::fs::File::open(path)?;
    decode(std::io::BufReader::new(file))
}

/// Encode a clip as 16-bit PCM WAV.
pub fn encode<W: Write + Seek>(clip: &AudioClip, writer: W) -> Result<()> {
    let spec = hound::WavSpec {
        channels: clip.channels(),
        sample_rate: clip.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut wav_writer = hound::WavWriter::new(writer, spec)?;
    for &sample in clip.samples() {
        wav_writer.write_sample(sample)?;
    }
    wav_writer.finalize()?;
    Ok(())
}

/// Encode a clip into an in-memory WAV buffer.
pub fn encode_to_vec(clip: &AudioClip) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    encode(clip, &mut cursor)?;
    Ok(cursor.into_inner())
}

/// Write a clip to `path` as a WAV file.
pub fn write_file(clip: &AudioClip, path: &Path) -> Result<()> {
    if clip.sample_rate() == 0 {
        return Err(StationvoxError::Other(format!(
            "Refusing to write {} with a sample rate of 0",
            path.display()
        )));
    }
    let file = std::fs::File::create(path)?;
    encode(clip, std::io::BufWriter::new(file))
}

/// Simple linear interpolation resampling.
#[cfg_attr(not(feature = "mic"), allow(dead_code))]
pub(crate) fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}
