use std::collections::VecDeque;

use super::level::{VocalLevel, VolumeReading};
use crate::config::ClassifierConfig;
use crate::error::{invalid_config, CoreError, CoreResult};

/// Ascending energy boundaries separating the four vocal levels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    pub min_voice: f32,
    pub whisper_max: f32,
    pub normal_max: f32,
}

impl Thresholds {
    pub fn new(min_voice: f32, whisper_max: f32, normal_max: f32) -> CoreResult<Self> {
        let all_finite = [min_voice, whisper_max, normal_max]
            .iter()
            .all(|v| v.is_finite());
        if !all_finite || min_voice < 0.0 || min_voice >= whisper_max || whisper_max >= normal_max
        {
            return Err(invalid_config(format!(
                "thresholds must satisfy 0 <= min_voice < whisper_max < normal_max (got {}, {}, {})",
                min_voice, whisper_max, normal_max
            )));
        }
        Ok(Self {
            min_voice,
            whisper_max,
            normal_max,
        })
    }

    pub fn level_for(&self, energy: f32) -> VocalLevel {
        if energy < self.min_voice {
            VocalLevel::Silent
        } else if energy < self.whisper_max {
            VocalLevel::Whisper
        } else if energy < self.normal_max {
            VocalLevel::Normal
        } else {
            VocalLevel::Shout
        }
    }

    /// Lower bound of each level's band; always classifies back to `level`.
    pub fn canonical_energy(&self, level: VocalLevel) -> f32 {
        match level {
            VocalLevel::Silent => 0.0,
            VocalLevel::Whisper => self.min_voice,
            VocalLevel::Normal => self.whisper_max,
            VocalLevel::Shout => self.normal_max,
        }
    }
}

/// Bounded FIFO of recent instantaneous energies.
#[derive(Clone, Debug)]
pub struct EnergyHistory {
    values: VecDeque<f32>,
    capacity: usize,
}

impl EnergyHistory {
    pub fn new(capacity: usize) -> CoreResult<Self> {
        if capacity == 0 {
            return Err(invalid_config("history_window must be at least 1"));
        }
        Ok(Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        })
    }

    pub fn push(&mut self, energy: f32) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(energy);
    }

    /// Mean over the values present so far; 0 while empty.
    pub fn mean(&self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f32>() / self.values.len() as f32
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.values.iter()
    }
}

/// Root-mean-square of a frame.
pub fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt()
}

/// Turns raw sample frames into smoothed, discretized vocal levels.
pub struct AmplitudeClassifier {
    thresholds: Thresholds,
    history: EnergyHistory,
    volume_scale: f32,
    debug_override: Option<VocalLevel>,
}

impl AmplitudeClassifier {
    pub fn new(config: &ClassifierConfig) -> CoreResult<Self> {
        let thresholds = Thresholds::new(config.min_voice, config.whisper_max, config.normal_max)?;
        let history = EnergyHistory::new(config.history_window)?;
        if !config.volume_scale.is_finite() || config.volume_scale < 0.0 {
            return Err(invalid_config(format!(
                "volume_scale must be a non-negative number (got {})",
                config.volume_scale
            )));
        }
        Ok(Self {
            thresholds,
            history,
            volume_scale: config.volume_scale,
            debug_override: config.debug_level,
        })
    }

    /// Analyse one frame. An empty or malformed frame is rejected before any
    /// state changes.
    pub fn classify(&mut self, frame: &[f32]) -> CoreResult<VolumeReading> {
        if frame.is_empty() {
            return Err(CoreError::InvalidInput("sample frame is empty".into()));
        }
        if let Some((idx, sample)) = frame
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite() || s.abs() > 1.0)
        {
            return Err(CoreError::InvalidInput(format!(
                "sample {} out of range [-1, 1]: {}",
                idx, sample
            )));
        }

        let instantaneous_energy = rms(frame);
        self.history.push(instantaneous_energy);

        let smoothed_energy = match self.debug_override {
            Some(level) => self.thresholds.canonical_energy(level),
            None => self.history.mean(),
        };

        Ok(VolumeReading {
            instantaneous_energy,
            smoothed_energy,
            volume_percent: (smoothed_energy * self.volume_scale).min(100.0),
            level: self.thresholds.level_for(smoothed_energy),
        })
    }

    pub fn set_debug_override(&mut self, level: Option<VocalLevel>) {
        if level != self.debug_override {
            log::info!("Debug level override: {:?}", level);
        }
        self.debug_override = level;
    }

    pub fn debug_override(&self) -> Option<VocalLevel> {
        self.debug_override
    }

    pub fn history(&self) -> &EnergyHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClassifierConfig {
        ClassifierConfig::default()
    }

    fn constant(value: f32, len: usize) -> Vec<f32> {
        vec![value; len]
    }

    #[test]
    fn rms_of_constant_frame() {
        assert!((rms(&constant(0.2, 256)) - 0.2).abs() < 1e-6);
        assert!((rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn level_mapping_is_monotonic() {
        let t = Thresholds::new(0.01, 0.05, 0.15).unwrap();
        let mut prev = VocalLevel::Silent;
        for i in 0..=400 {
            let level = t.level_for(i as f32 * 0.001);
            assert!(level >= prev, "level dropped at {}", i);
            prev = level;
        }
        assert_eq!(t.level_for(0.0), VocalLevel::Silent);
        assert_eq!(t.level_for(0.01), VocalLevel::Whisper);
        assert_eq!(t.level_for(0.05), VocalLevel::Normal);
        assert_eq!(t.level_for(0.15), VocalLevel::Shout);
    }

    #[test]
    fn canonical_energy_round_trips_through_level() {
        let t = Thresholds::new(0.01, 0.05, 0.15).unwrap();
        for level in VocalLevel::ALL {
            assert_eq!(t.level_for(t.canonical_energy(level)), level);
        }
    }

    #[test]
    fn rejects_misordered_thresholds() {
        assert!(matches!(
            Thresholds::new(0.01, 0.15, 0.15),
            Err(CoreError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Thresholds::new(-0.01, 0.05, 0.15),
            Err(CoreError::InvalidConfiguration(_))
        ));

        let mut cfg = config();
        cfg.normal_max = 0.04;
        assert!(matches!(
            AmplitudeClassifier::new(&cfg),
            Err(CoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn history_evicts_oldest() {
        let mut history = EnergyHistory::new(3).unwrap();
        for v in [1.0, 2.0, 3.0, 4.0] {
            history.push(v);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert!((history.mean() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn history_never_exceeds_capacity() {
        let mut classifier = AmplitudeClassifier::new(&config()).unwrap();
        for i in 0..25 {
            classifier.classify(&constant(0.01 * (i % 5) as f32, 32)).unwrap();
            assert!(classifier.history().len() <= 10);
        }
        assert_eq!(classifier.history().len(), 10);
    }

    #[test]
    fn window_fills_gradually_without_zero_padding() {
        let mut classifier = AmplitudeClassifier::new(&config()).unwrap();
        let first = classifier.classify(&constant(0.2, 64)).unwrap();
        assert!((first.smoothed_energy - 0.2).abs() < 1e-6);
        assert_eq!(first.level, VocalLevel::Shout);

        let second = classifier.classify(&constant(0.0, 64)).unwrap();
        assert!((second.smoothed_energy - 0.1).abs() < 1e-6);
        assert_eq!(second.level, VocalLevel::Normal);
    }

    #[test]
    fn volume_percent_is_capped() {
        let mut classifier = AmplitudeClassifier::new(&config()).unwrap();
        let quiet = classifier.classify(&constant(0.1, 16)).unwrap();
        assert!((quiet.volume_percent - 30.0).abs() < 1e-3);
        let loud = classifier.classify(&constant(1.0, 16)).unwrap();
        assert_eq!(loud.volume_percent, 100.0);
    }

    #[test]
    fn empty_frame_fails_without_mutation() {
        let mut classifier = AmplitudeClassifier::new(&config()).unwrap();
        classifier.classify(&constant(0.03, 16)).unwrap();
        let err = classifier.classify(&[]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
        assert_eq!(classifier.history().len(), 1);
    }

    #[test]
    fn malformed_samples_are_rejected() {
        let mut classifier = AmplitudeClassifier::new(&config()).unwrap();
        assert!(classifier.classify(&[0.1, f32::NAN]).is_err());
        assert!(classifier.classify(&[1.5]).is_err());
        assert!(classifier.history().is_empty());
    }

    #[test]
    fn same_frames_give_same_readings() {
        let frames: Vec<Vec<f32>> = (0..30)
            .map(|i| constant(((i * 7) % 11) as f32 * 0.02, 128))
            .collect();

        let run = || {
            let mut classifier = AmplitudeClassifier::new(&config()).unwrap();
            frames
                .iter()
                .map(|f| classifier.classify(f).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn debug_override_substitutes_energy() {
        let mut cfg = config();
        cfg.debug_level = Some(VocalLevel::Whisper);
        let mut classifier = AmplitudeClassifier::new(&cfg).unwrap();

        let reading = classifier.classify(&constant(0.5, 32)).unwrap();
        assert_eq!(reading.level, VocalLevel::Whisper);
        assert_eq!(reading.smoothed_energy, 0.01);
        assert!((reading.instantaneous_energy - 0.5).abs() < 1e-6);

        classifier.set_debug_override(None);
        let reading = classifier.classify(&constant(0.5, 32)).unwrap();
        assert_eq!(reading.level, VocalLevel::Shout);
    }
}
