use anyhow::{bail, Result};
use std::time::Duration;

use super::decode::DecodedAudio;

/// Supplies fixed-size sample frames to the game loop.
pub trait FrameSource {
    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Vec<f32>>>;

    /// Wall-clock time covered by one frame.
    fn frame_duration(&self) -> Duration;

    /// Total frames, when known up front.
    fn frames_hint(&self) -> Option<usize> {
        None
    }
}

fn frame_duration(frame_size: usize, sample_rate: u32) -> Duration {
    Duration::from_nanos(frame_size as u64 * 1_000_000_000 / sample_rate as u64)
}

/// Replays a decoded recording as consecutive frames.
pub struct FileSource {
    audio: DecodedAudio,
    frame_size: usize,
    cursor: usize,
}

impl FileSource {
    pub fn new(audio: DecodedAudio, frame_size: usize) -> Result<Self> {
        if frame_size == 0 {
            bail!("frame size must be at least 1");
        }
        if audio.sample_rate == 0 {
            bail!("audio has a zero sample rate");
        }
        Ok(Self {
            audio,
            frame_size,
            cursor: 0,
        })
    }
}

impl FrameSource for FileSource {
    fn next_frame(&mut self) -> Result<Option<Vec<f32>>> {
        if self.cursor >= self.audio.samples.len() {
            return Ok(None);
        }
        let end = (self.cursor + self.frame_size).min(self.audio.samples.len());
        let frame = self.audio.samples[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(Some(frame))
    }

    fn frame_duration(&self) -> Duration {
        frame_duration(self.frame_size, self.audio.sample_rate)
    }

    fn frames_hint(&self) -> Option<usize> {
        Some(self.audio.samples.len().div_ceil(self.frame_size))
    }
}

/// One step of a tone schedule: sine at `rms` for `ticks` frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToneStep {
    pub rms: f32,
    pub ticks: usize,
}

impl std::str::FromStr for ToneStep {
    type Err = String;

    /// Parses `rms:ticks`, e.g. `0.2:30`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rms, ticks) = s
            .split_once(':')
            .ok_or_else(|| format!("expected rms:ticks, got '{}'", s))?;
        let rms: f32 = rms
            .trim()
            .parse()
            .map_err(|_| format!("invalid rms '{}'", rms))?;
        let ticks: usize = ticks
            .trim()
            .parse()
            .map_err(|_| format!("invalid tick count '{}'", ticks))?;
        if !(0.0..=1.0).contains(&rms) {
            return Err(format!("rms must be within [0, 1], got {}", rms));
        }
        Ok(Self { rms, ticks })
    }
}

/// Synthetic sine frames following a loudness schedule.
pub struct ToneSource {
    steps: Vec<ToneStep>,
    step: usize,
    emitted_in_step: usize,
    frame_size: usize,
    sample_rate: u32,
    frequency: f32,
    phase: f32,
}

impl ToneSource {
    pub const SAMPLE_RATE: u32 = 44_100;
    const FREQUENCY: f32 = 220.0;

    pub fn new(steps: Vec<ToneStep>, frame_size: usize) -> Result<Self> {
        if frame_size == 0 {
            bail!("frame size must be at least 1");
        }
        Ok(Self {
            steps,
            step: 0,
            emitted_in_step: 0,
            frame_size,
            sample_rate: Self::SAMPLE_RATE,
            frequency: Self::FREQUENCY,
            phase: 0.0,
        })
    }
}

impl FrameSource for ToneSource {
    fn next_frame(&mut self) -> Result<Option<Vec<f32>>> {
        while self.step < self.steps.len() && self.emitted_in_step >= self.steps[self.step].ticks {
            self.step += 1;
            self.emitted_in_step = 0;
        }
        let Some(step) = self.steps.get(self.step) else {
            return Ok(None);
        };

        let amplitude = (step.rms * std::f32::consts::SQRT_2).min(1.0);
        let increment = std::f32::consts::TAU * self.frequency / self.sample_rate as f32;
        let frame = (0..self.frame_size)
            .map(|_| {
                let sample = amplitude * self.phase.sin();
                self.phase = (self.phase + increment) % std::f32::consts::TAU;
                sample
            })
            .collect();
        self.emitted_in_step += 1;
        Ok(Some(frame))
    }

    fn frame_duration(&self) -> Duration {
        frame_duration(self.frame_size, self.sample_rate)
    }

    fn frames_hint(&self) -> Option<usize> {
        Some(self.steps.iter().map(|s| s.ticks).sum())
    }
}
