//! In-memory PCM waveform with millisecond slicing.

use std::path::Path;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::error::{Result, PrepError};

/// Interleaved 16-bit PCM samples plus their WAV spec
#[derive(Debug, Clone)]
pub struct Waveform {
    spec: WavSpec,
    samples: Vec<i16>,
}

impl Waveform {
    pub fn new(spec: WavSpec, samples: Vec<i16>) -> Result<Self> {
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            return Err(PrepError::Media(format!(
                "Expected 16-bit integer PCM, found {}-bit {:?}",
                spec.bits_per_sample, spec.sample_format
            )));
        }
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(PrepError::Media("WAV spec has no channels or no sample rate".to_string()));
        }
        Ok(Self { spec, samples })
    }

    /// Load a whole WAV file into memory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = WavReader::open(path)
            .map_err(|e| PrepError::Media(format!("Failed to open {}: {}", path.display(), e)))?;
        let spec = reader.spec();

        let samples = reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PrepError::Media(format!("Failed to decode {}: {}", path.display(), e)))?;

        debug!(
            "Loaded {} samples ({} Hz, {} channel(s)) from {}",
            samples.len(), spec.sample_rate, spec.channels, path.display()
        );
        Self::new(spec, samples)
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Number of frames (one sample per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.spec.channels as usize
    }

    pub fn duration_ms(&self) -> f64 {
        self.frames() as f64 * 1000.0 / self.spec.sample_rate as f64
    }

    fn frame_at(&self, ms: f64) -> usize {
        if ms <= 0.0 || ms.is_nan() {
            return 0;
        }
        let frame = (ms * self.spec.sample_rate as f64 / 1000.0).floor();
        (frame as usize).min(self.frames())
    }

    /// Samples covering `[start_ms, end_ms)`. Bounds past the end are
    /// clamped, so a slice beyond the audio is shorter or empty.
    pub fn slice_ms(&self, start_ms: f64, end_ms: f64) -> &[i16] {
        let start = self.frame_at(start_ms);
        let end = self.frame_at(end_ms).max(start);
        let channels = self.spec.channels as usize;
        &self.samples[start * channels..end * channels]
    }

    /// Like [`slice_ms`](Self::slice_ms) for times in seconds. Times are
    /// rounded to whole milliseconds first, as subtitle timecodes are.
    pub fn slice_seconds(&self, start: f64, end: f64) -> &[i16] {
        self.slice_ms((start * 1000.0).round(), (end * 1000.0).round())
    }

    /// Write samples with this waveform's spec
    pub fn write_samples<P: AsRef<Path>>(&self, path: P, samples: &[i16]) -> Result<()> {
        let path = path.as_ref();
        let mut writer = WavWriter::create(path, self.spec)?;
        for &sample in samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }
}
