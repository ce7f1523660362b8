//! WAV framing for captured PCM audio.
//!
//! Finalized recordings are raw PCM; wrapping them in a WAV container
//! makes them playable by ordinary audio tools.

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

/// Wrap raw 16-bit little-endian PCM bytes in a WAV container.
pub fn encode_pcm16(pcm: &[u8], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer =
        WavWriter::new(&mut cursor, spec).context("Failed to initialize WAV writer")?;

    for pair in pcm.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
            .context("Failed to write WAV sample")?;
    }

    writer.finalize().context("Failed to finalize WAV data")?;

    Ok(cursor.into_inner())
}

/// Write PCM bytes to `path` as a playable WAV file.
pub fn write_wav_file(path: &Path, pcm: &[u8], sample_rate: u32, channels: u16) -> Result<()> {
    let bytes = encode_pcm16(pcm, sample_rate, channels)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, bytes)
        .with_context(|| format!("Failed to write WAV file: {}", path.display()))
}

#[cfg(test)]
#[path = "wav_test.rs"]
mod tests;
