//! WAV input for the sample source and WAV capture of DAC output.

use std::io::{Read, Seek, Write};
use std::path::Path;

use crate::error::SoundError;

/// Unsigned 8-bit mono samples, 0x80 = silence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wave {
    pub rate: u32,
    pub samples: Vec<u8>,
}

impl Wave {
    /// Nearest-neighbour resample to `rate`.
    #[must_use]
    pub fn at_rate(self, rate: u32) -> Vec<u8> {
        if rate == self.rate || self.rate == 0 || rate == 0 {
            return self.samples;
        }
        let len = self.samples.len() as u64 * u64::from(rate) / u64::from(self.rate);
        (0..len)
            .map(|i| self.samples[(i * u64::from(self.rate) / u64::from(rate)) as usize])
            .collect()
    }
}

pub fn load_samples(path: &Path) -> Result<Wave, SoundError> {
    let wave = read_samples(hound::WavReader::open(path)?)?;
    log::info!(
        "loaded {} samples at {} Hz from {}",
        wave.samples.len(),
        wave.rate,
        path.display()
    );
    Ok(wave)
}

/// Mix down to mono and reduce to unsigned 8 bits. Integer PCM only.
pub fn read_samples<R: Read>(mut reader: hound::WavReader<R>) -> Result<Wave, SoundError> {
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || !(8..=32).contains(&spec.bits_per_sample) {
        return Err(SoundError::UnsupportedFormat(format!(
            "{:?} {}-bit",
            spec.sample_format, spec.bits_per_sample
        )));
    }
    let channels = i64::from(spec.channels.max(1));
    let shift = spec.bits_per_sample - 8;

    let mut samples = Vec::with_capacity(reader.len() as usize / channels as usize);
    let mut frame = 0i64;
    let mut filled = 0;
    for sample in reader.samples::<i32>() {
        frame += i64::from(sample? >> shift);
        filled += 1;
        if filled == channels {
            samples.push((frame / channels + 128) as u8);
            frame = 0;
            filled = 0;
        }
    }
    if samples.is_empty() {
        return Err(SoundError::EmptySource);
    }
    Ok(Wave {
        rate: spec.sample_rate,
        samples,
    })
}

/// Write $D418 values as 16-bit PCM, volume nibble scaled to full range.
pub fn write_capture<W: Write + Seek>(values: &[u8], rate: u32, out: W) -> Result<(), SoundError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::new(out, spec)?;
    for &value in values {
        let level = i32::from(value & 0x0F) * 65_535 / 15 - 32_768;
        writer.write_sample(level as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

pub fn save_capture(values: &[u8], rate: u32, path: &Path) -> Result<(), SoundError> {
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write_capture(values, rate, file)?;
    log::info!("{} DAC writes captured to {}", values.len(), path.display());
    Ok(())
}
