use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::segment::{SegmentDistribution, SegmentType};
use crate::config::{validate_distribution, Generation, TrackConfig};
use crate::error::{invalid_config, CoreResult};

/// Distributions and streak settings used by the generator.
pub(crate) fn check_config(config: &TrackConfig) -> CoreResult<()> {
    validate_distribution("track.populate", &config.populate)?;
    validate_distribution("track.recycle", &config.recycle)?;
    if !(0.0..1.0).contains(&config.streak_continue) {
        return Err(invalid_config("streak_continue must be in [0, 1)"));
    }
    if config.max_streak == 0 {
        return Err(invalid_config("max_streak must be at least 1"));
    }
    Ok(())
}

/// Draws segment types for the initial track and for every recycled slot.
pub struct SegmentGenerator {
    rng: StdRng,
    populate: SegmentDistribution,
    recycle: SegmentDistribution,
    generation: Generation,
    streak_continue: f32,
    max_streak: usize,
}

impl SegmentGenerator {
    pub fn new(config: &TrackConfig) -> CoreResult<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }

    pub fn with_rng(config: &TrackConfig, rng: StdRng) -> CoreResult<Self> {
        check_config(config)?;
        Ok(Self {
            rng,
            populate: config.populate,
            recycle: config.recycle,
            generation: config.generation,
            streak_continue: config.streak_continue,
            max_streak: config.max_streak,
        })
    }

    /// Types for the first `count` slots, in slot order.
    pub fn initial_types(&mut self, count: usize) -> Vec<SegmentType> {
        match self.generation {
            Generation::Flat => (0..count)
                .map(|_| self.populate.sample(&mut self.rng))
                .collect(),
            Generation::Clustered => self.clustered(count),
        }
    }

    pub fn next_recycled(&mut self) -> SegmentType {
        self.recycle.sample(&mut self.rng)
    }

    fn clustered(&mut self, count: usize) -> Vec<SegmentType> {
        let mut types = Vec::with_capacity(count);
        for (kind, len) in self.streaks(count) {
            types.extend(std::iter::repeat(kind).take(len));
        }
        types
    }

    // Each draw fills a geometric-length streak, clipped to the slots left so
    // the lengths add up to exactly `count`. Shout never repeats.
    fn streaks(&mut self, count: usize) -> Vec<(SegmentType, usize)> {
        let mut streaks = Vec::new();
        let mut filled = 0;
        while filled < count {
            let kind = self.populate.sample(&mut self.rng);
            let len = if kind == SegmentType::Shout {
                1
            } else {
                self.streak_length()
            };
            let len = len.min(count - filled);
            streaks.push((kind, len));
            filled += len;
        }
        streaks
    }

    fn streak_length(&mut self) -> usize {
        let mut len = 1;
        while len < self.max_streak && self.rng.random::<f32>() < self.streak_continue {
            len += 1;
        }
        len
    }
}
