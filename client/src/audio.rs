//! Microphone capture for the voxpost client.
//!
//! The capture device delivers audio as a stream of raw data
//! fragments. Fragments are mono 16-bit little-endian PCM bytes at the
//! device's native sample rate; the session layer concatenates them
//! into the submittable artifact.

use anyhow::{Context, Result};
use std::sync::mpsc;

/// A live capture stream delivering audio data fragments.
///
/// `close` consumes the stream, so device teardown happens exactly
/// once per successful open.
pub trait CaptureStream {
    /// Native sample rate of the device.
    fn sample_rate(&self) -> u32;

    /// Channel count of the emitted fragments (always 1 for the
    /// microphone implementation, which downmixes).
    fn channels(&self) -> u16;

    /// Drain any fragments that arrived since the last call
    /// (non-blocking). Returns `None` when nothing is pending.
    fn try_chunk(&mut self) -> Option<Vec<u8>>;

    /// Tear down the underlying device stream.
    fn close(self: Box<Self>);
}

/// Opens capture streams.
///
/// Microphone access may be refused by the platform; `open` surfaces
/// that as an error for the workflow to turn into a notification.
pub trait CaptureBackend {
    fn open(&mut self) -> Result<Box<dyn CaptureStream>>;
}

/// Capture backend for the default input device.
pub struct MicBackend;

impl CaptureBackend for MicBackend {
    fn open(&mut self) -> Result<Box<dyn CaptureStream>> {
        Ok(Box::new(AudioCapture::start()?))
    }
}

/// Convert multi-channel interleaved samples to mono by averaging all channels.
pub fn to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Convert f32 samples to 16-bit little-endian PCM bytes.
pub fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Audio capture from the default input device.
pub struct AudioCapture {
    stream: cpal::Stream,
    receiver: mpsc::Receiver<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Start capturing audio from the default input device.
    pub fn start() -> Result<Self> {
        use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No input device available")?;

        let config = device
            .default_input_config()
            .context("Failed to get default input config")?;

        let sample_rate = config.sample_rate();
        let channels = config.channels();

        let (sender, receiver) = mpsc::channel();

        let err_fn = |err| tracing::warn!(error = %err, "Audio stream error");

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config.into(),
                move |data: &[f32], _| {
                    let _ = sender.send(data.to_vec());
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config.into(),
                move |data: &[i16], _| {
                    let samples: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                    let _ = sender.send(samples);
                },
                err_fn,
                None,
            ),
            cpal::SampleFormat::U16 => device.build_input_stream(
                &config.into(),
                move |data: &[u16], _| {
                    let samples: Vec<f32> = data
                        .iter()
                        .map(|&s| (s as f32 - 32768.0) / 32768.0)
                        .collect();
                    let _ = sender.send(samples);
                },
                err_fn,
                None,
            ),
            format => anyhow::bail!("Unsupported sample format: {:?}", format),
        }
        .context("Failed to build input stream")?;

        stream.play().context("Failed to start audio stream")?;

        Ok(Self {
            stream,
            receiver,
            sample_rate,
            channels,
        })
    }
}

impl CaptureStream for AudioCapture {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        // Fragments are downmixed before they leave this type.
        1
    }

    fn try_chunk(&mut self) -> Option<Vec<u8>> {
        let mut all_samples = Vec::new();

        // Drain all available samples
        while let Ok(samples) = self.receiver.try_recv() {
            all_samples.extend(samples);
        }

        if all_samples.is_empty() {
            return None;
        }

        Some(pcm16_bytes(&to_mono(&all_samples, self.channels)))
    }

    fn close(self: Box<Self>) {
        use cpal::traits::StreamTrait;
        let _ = self.stream.pause();
        drop(self);
    }
}

#[cfg(test)]
#[path = "audio_test.rs"]
mod tests;
