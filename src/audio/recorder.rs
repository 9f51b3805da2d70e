//! Optional WAV dump of the captured audio, for offline inspection.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::codec::BYTES_PER_SAMPLE;

/// Appends captured frames to a single 16-bit mono WAV file.
pub struct CaptureDump {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    path: PathBuf,
    samples_written: usize,
}

impl CaptureDump {
    pub fn create(path: impl AsRef<Path>, sample_rate: u32) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: (BYTES_PER_SAMPLE * 8) as u16,
            sample_format: hound::SampleFormat::Int,
        };

        let writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

        info!("Capture dump enabled: {}", path.display());

        Ok(Self {
            writer: Some(writer),
            path,
            samples_written: 0,
        })
    }

    pub fn write_frame(&mut self, samples: &[f32]) -> Result<()> {
        if let Some(writer) = &mut self.writer {
            for &sample in samples {
                let pcm = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer
                    .write_sample(pcm)
                    .context("Failed to write sample to WAV")?;
            }
            self.samples_written += samples.len();
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().context("Failed to finalize WAV file")?;
            info!(
                "Capture dump complete: {} ({} samples)",
                self.path.display(),
                self.samples_written
            );
        }
        Ok(())
    }
}

impl Drop for CaptureDump {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}
