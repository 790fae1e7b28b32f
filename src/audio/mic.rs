//! Live microphone frames via CPAL.
//!
//! Samples arrive on the CPAL callback thread, are downmixed to mono and cut
//! into fixed-size frames, then handed to the game loop over a bounded channel.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::time::Duration;

use super::decode::downmix_into;
use super::source::FrameSource;

const CHANNEL_CAPACITY: usize = 32;
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub fn list_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("no input devices available")?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

pub struct MicSource {
    // Dropping the stream stops capture.
    _stream: cpal::Stream,
    frames: Receiver<Vec<f32>>,
    frame_size: usize,
    sample_rate: u32,
}

impl MicSource {
    /// Open the named device (or the default input) and start capturing.
    pub fn open(preferred_device: Option<&str>, frame_size: usize) -> Result<Self> {
        if frame_size == 0 {
            return Err(anyhow!("frame size must be at least 1"));
        }
        let host = cpal::default_host();
        let device = match preferred_device {
            Some(name) => host
                .input_devices()
                .context("no input devices available")?
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| anyhow!("input device '{name}' not found"))?,
            None => host
                .default_input_device()
                .context("no default input device available")?,
        };
        let device_name = device.name().unwrap_or_else(|_| "unknown device".into());

        let default_config = device
            .default_input_config()
            .with_context(|| format!("failed to query input config for '{device_name}'"))?;
        let format = default_config.sample_format();
        let config: StreamConfig = default_config.into();
        let sample_rate = config.sample_rate.0;
        let channels = usize::from(config.channels.max(1));

        log::info!(
            "Microphone '{}': format={:?} sample_rate={}Hz channels={}",
            device_name,
            format,
            sample_rate,
            channels
        );

        let (tx, rx) = bounded(CHANNEL_CAPACITY);
        let err_fn = |err| log::warn!("audio stream error: {err}");
        let mut framer = Framer::new(frame_size, tx);

        let stream = match format {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    framer.push(data, channels, |s| s)
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    framer.push(data, channels, |s| s as f32 / 32_768.0)
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _: &cpal::InputCallbackInfo| {
                    framer.push(data, channels, |s| (s as f32 - 32_768.0) / 32_768.0)
                },
                err_fn,
                None,
            )?,
            other => return Err(anyhow!("unsupported sample format: {other:?}")),
        };
        stream
            .play()
            .with_context(|| format!("failed to start capture on '{device_name}'"))?;

        Ok(Self {
            _stream: stream,
            frames: rx,
            frame_size,
            sample_rate,
        })
    }
}

impl FrameSource for MicSource {
    fn next_frame(&mut self) -> Result<Option<Vec<f32>>> {
        match self.frames.recv_timeout(RECV_TIMEOUT) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => Err(anyhow!(
                "microphone delivered no audio for {:?}; check permissions",
                RECV_TIMEOUT
            )),
        }
    }

    fn frame_duration(&self) -> Duration {
        Duration::from_nanos(self.frame_size as u64 * 1_000_000_000 / self.sample_rate.max(1) as u64)
    }
}

/// Accumulates callback samples into whole frames.
struct Framer {
    frame_size: usize,
    pending: Vec<f32>,
    converted: Vec<f32>,
    tx: Sender<Vec<f32>>,
    dropped: u64,
}

impl Framer {
    fn new(frame_size: usize, tx: Sender<Vec<f32>>) -> Self {
        Self {
            frame_size,
            pending: Vec::with_capacity(frame_size * 2),
            converted: Vec::new(),
            tx,
            dropped: 0,
        }
    }

    fn push<T: Copy>(&mut self, data: &[T], channels: usize, to_f32: impl Fn(T) -> f32) {
        self.converted.clear();
        self.converted.extend(data.iter().map(|s| to_f32(*s)));
        downmix_into(&mut self.pending, &self.converted, channels);

        while self.pending.len() >= self.frame_size {
            let frame: Vec<f32> = self.pending.drain(..self.frame_size).collect();
            match self.tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped += 1;
                    if self.dropped.is_power_of_two() {
                        log::warn!("Game loop is behind; dropped {} audio frames", self.dropped);
                    }
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}
