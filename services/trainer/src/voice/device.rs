//! Microphone and speaker access through cpal.
//!
//! cpal streams are not `Send`, so every stream is built, run and dropped
//! inside one `spawn_blocking` task. Samples cross the audio callback
//! boundary through a ring buffer.

use super::{Microphone, Recording, Speaker};
use crate::audio_utils::{downmix_to_mono, resample};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use ringbuf::HeapRb;
use ringbuf::traits::{Consumer, Producer, Split};
use std::time::Duration;
use tracing::{debug, warn};

/// Extra time given to the output device to drain its buffer.
const PLAYBACK_TAIL: Duration = Duration::from_millis(250);

/// The host's default input device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalMicrophone;

#[async_trait]
impl Microphone for CpalMicrophone {
    async fn record(&self, duration: Duration) -> Result<Recording> {
        tokio::task::spawn_blocking(move || record_blocking(duration)).await?
    }
}

/// The host's default output device.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalSpeaker;

#[async_trait]
impl Speaker for CpalSpeaker {
    async fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        tokio::task::spawn_blocking(move || play_blocking(samples, sample_rate)).await?
    }
}

/// Counts samples the capture callback could not buffer. Warns on the first
/// loss only.
#[derive(Debug, Default)]
struct Overflow {
    dropped: usize,
}

impl Overflow {
    fn record(&mut self, dropped: usize) {
        if dropped == 0 {
            return;
        }
        if self.dropped == 0 {
            warn!(dropped, "Recording buffer full, dropping samples");
        }
        self.dropped += dropped;
    }
}

/// Converts and buffers 16-bit samples. Returns how many did not fit.
fn push_i16(producer: &mut impl Producer<Item = f32>, data: &[i16]) -> usize {
    data.iter()
        .filter(|&&sample| producer.try_push(sample as f32 / 32768.0).is_err())
        .count()
}

fn record_blocking(duration: Duration) -> Result<Recording> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No input device available")?;
    let supported = device.default_input_config()?;
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let format = supported.sample_format();
    let config: StreamConfig = supported.into();

    let capacity = (sample_rate as f64 * channels as f64 * (duration.as_secs_f64() + 1.0)) as usize;
    let (mut producer, mut consumer) = HeapRb::<f32>::new(capacity).split();
    let on_error = |err: cpal::StreamError| warn!(error = %err, "Input stream error");
    let mut overflow = Overflow::default();

    let stream = match format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let pushed = producer.push_slice(data);
                overflow.record(data.len() - pushed);
            },
            on_error,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                overflow.record(push_i16(&mut producer, data));
            },
            on_error,
            None,
        )?,
        other => bail!("Unsupported input sample format {:?}", other),
    };

    debug!(sample_rate, channels, "Recording started");
    stream.play()?;
    std::thread::sleep(duration);
    drop(stream);

    let interleaved: Vec<f32> = consumer.pop_iter().collect();
    debug!(samples = interleaved.len(), "Recording finished");
    Ok(Recording {
        samples: downmix_to_mono(&interleaved, channels),
        sample_rate,
    })
}

fn play_blocking(samples: Vec<f32>, sample_rate: u32) -> Result<()> {
    if samples.is_empty() {
        return Ok(());
    }
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("No output device available")?;
    let supported = device.default_output_config()?;
    let device_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let format = supported.sample_format();
    let config: StreamConfig = supported.into();

    let clip = resample(&samples, sample_rate as f64, device_rate as f64)?;
    if clip.is_empty() {
        return Ok(());
    }
    let clip_duration = Duration::from_secs_f64(clip.len() as f64 / device_rate as f64);
    let (mut producer, mut consumer) = HeapRb::<f32>::new(clip.len()).split();
    producer.push_slice(&clip);
    let on_error = |err: cpal::StreamError| warn!(error = %err, "Output stream error");

    let stream = match format {
        SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    frame.fill(consumer.try_pop().unwrap_or(0.0));
                }
            },
            on_error,
            None,
        )?,
        SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let sample = consumer.try_pop().unwrap_or(0.0);
                    frame.fill((sample * i16::MAX as f32) as i16);
                }
            },
            on_error,
            None,
        )?,
        other => bail!("Unsupported output sample format {:?}", other),
    };

    stream.play()?;
    std::thread::sleep(clip_duration + PLAYBACK_TAIL);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_counts_every_dropped_sample() {
        let mut overflow = Overflow::default();
        overflow.record(0);
        assert_eq!(overflow.dropped, 0);
        overflow.record(3);
        overflow.record(0);
        overflow.record(5);
        assert_eq!(overflow.dropped, 8);
    }

    #[test]
    fn test_full_buffer_reports_dropped_i16_samples() {
        let (mut producer, mut consumer) = HeapRb::<f32>::new(2).split();
        assert_eq!(push_i16(&mut producer, &[i16::MIN, 0, i16::MAX, 100]), 2);
        assert_eq!(consumer.pop_iter().collect::<Vec<_>>(), vec![-1.0, 0.0]);
    }
}
