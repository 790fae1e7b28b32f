use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    Normal,
    Whisper,
    Shout,
}

impl SegmentType {
    pub const ALL: [SegmentType; 3] = [SegmentType::Normal, SegmentType::Whisper, SegmentType::Shout];

    pub fn as_str(self) -> &'static str {
        match self {
            SegmentType::Normal => "normal",
            SegmentType::Whisper => "whisper",
            SegmentType::Shout => "shout",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TrackSegment {
    pub kind: SegmentType,
    /// Leading edge along the scroll axis
    pub position: f32,
}

/// Discrete probability table over segment types.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct SegmentDistribution {
    #[serde(default)]
    pub normal: f32,
    #[serde(default)]
    pub whisper: f32,
    #[serde(default)]
    pub shout: f32,
}

impl Default for SegmentDistribution {
    fn default() -> Self {
        Self {
            normal: 0.7,
            whisper: 0.25,
            shout: 0.05,
        }
    }
}

impl SegmentDistribution {
    pub fn new(normal: f32, whisper: f32, shout: f32) -> CoreResult<Self> {
        let dist = Self {
            normal,
            whisper,
            shout,
        };
        crate::config::validate_distribution("distribution", &dist)?;
        Ok(dist)
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> SegmentType {
        let total = self.normal + self.whisper + self.shout;
        let roll = rng.random::<f32>() * total;
        if roll < self.normal {
            SegmentType::Normal
        } else if roll < self.normal + self.whisper || self.shout == 0.0 {
            SegmentType::Whisper
        } else {
            SegmentType::Shout
        }
    }
}

/// Image key per segment type, handed to the presentation layer.
#[derive(Clone, Debug)]
pub struct AssetMap {
    keys: HashMap<SegmentType, String>,
}

impl AssetMap {
    pub fn new(keys: HashMap<SegmentType, String>) -> Self {
        Self { keys }
    }

    pub fn segment_image_key(&self, kind: SegmentType) -> CoreResult<&str> {
        self.keys
            .get(&kind)
            .map(String::as_str)
            .ok_or(CoreError::UnmappedType(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn flat_distribution_roughly_matches_weights() {
        let dist = SegmentDistribution::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts = HashMap::new();
        for _ in 0..10_000 {
            *counts.entry(dist.sample(&mut rng)).or_insert(0usize) += 1;
        }
        let normal = counts[&SegmentType::Normal] as f32 / 10_000.0;
        let whisper = counts[&SegmentType::Whisper] as f32 / 10_000.0;
        let shout = counts[&SegmentType::Shout] as f32 / 10_000.0;
        assert!((normal - 0.7).abs() < 0.03, "normal={}", normal);
        assert!((whisper - 0.25).abs() < 0.03, "whisper={}", whisper);
        assert!((shout - 0.05).abs() < 0.02, "shout={}", shout);
    }

    #[test]
    fn degenerate_distribution_is_constant() {
        let dist = SegmentDistribution::new(0.0, 1.0, 0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert!((0..500).all(|_| dist.sample(&mut rng) == SegmentType::Whisper));
    }

    #[test]
    fn rejects_distribution_not_summing_to_one() {
        assert!(matches!(
            SegmentDistribution::new(0.5, 0.25, 0.05),
            Err(CoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn asset_lookup_reports_gaps() {
        let mut keys = HashMap::new();
        keys.insert(SegmentType::Normal, "ground.png".to_string());
        let assets = AssetMap::new(keys);
        assert_eq!(assets.segment_image_key(SegmentType::Normal), Ok("ground.png"));
        assert_eq!(
            assets.segment_image_key(SegmentType::Shout),
            Err(CoreError::UnmappedType(SegmentType::Shout))
        );
    }

    #[test]
    fn default_assets_cover_every_type() {
        let assets = AssetMap::new(crate::config::AssetsConfig::default().key_map());
        for kind in SegmentType::ALL {
            assert!(assets.segment_image_key(kind).is_ok());
        }
    }
}
