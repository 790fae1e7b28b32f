use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::audio::classifier::AmplitudeClassifier;
use crate::audio::level::VocalLevel;
use crate::error::{invalid_config, CoreResult};
use crate::jump::JumpController;
use crate::track::segment::{SegmentDistribution, SegmentType};
use crate::track::{self, generator};

const DISTRIBUTION_TOLERANCE: f32 = 1e-4;

#[derive(Debug, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub track: TrackConfig,
    #[serde(default)]
    pub speed: SpeedConfig,
    #[serde(default)]
    pub jump: JumpConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_min_voice")]
    pub min_voice: f32,
    #[serde(default = "default_whisper_max")]
    pub whisper_max: f32,
    #[serde(default = "default_normal_max")]
    pub normal_max: f32,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Multiplier from smoothed energy to the 0-100 volume display
    #[serde(default = "default_volume_scale")]
    pub volume_scale: f32,
    #[serde(default)]
    pub debug_level: Option<VocalLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generation {
    Flat,
    Clustered,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackConfig {
    #[serde(default = "default_segment_width")]
    pub segment_width: f32,
    #[serde(default = "default_segment_count")]
    pub segment_count: usize,
    #[serde(default = "default_generation")]
    pub generation: Generation,
    /// Chance that a clustered streak grows by one more segment
    #[serde(default = "default_streak_continue")]
    pub streak_continue: f32,
    #[serde(default = "default_max_streak")]
    pub max_streak: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub populate: SegmentDistribution,
    #[serde(default)]
    pub recycle: SegmentDistribution,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeedConfig {
    #[serde(default)]
    pub silent: f32,
    #[serde(default = "default_half_speed")]
    pub whisper: f32,
    #[serde(default = "default_full_speed")]
    pub normal: f32,
    #[serde(default = "default_full_speed")]
    pub shout: f32,
    /// Forced speed while a jump is in flight
    #[serde(default = "default_full_speed")]
    pub jump: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JumpConfig {
    #[serde(default = "default_jump_half_ms")]
    pub ascend_ms: u64,
    #[serde(default = "default_jump_half_ms")]
    pub descend_ms: u64,
}

/// Image key per segment type. A type left out of a user `[assets]` table
/// stays unmapped.
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    pub normal: Option<String>,
    pub whisper: Option<String>,
    pub shout: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            track: TrackConfig::default(),
            speed: SpeedConfig::default(),
            jump: JumpConfig::default(),
            assets: AssetsConfig::default(),
            audio: AudioConfig::default(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_voice: default_min_voice(),
            whisper_max: default_whisper_max(),
            normal_max: default_normal_max(),
            history_window: default_history_window(),
            volume_scale: default_volume_scale(),
            debug_level: None,
        }
    }
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            segment_width: default_segment_width(),
            segment_count: default_segment_count(),
            generation: default_generation(),
            streak_continue: default_streak_continue(),
            max_streak: default_max_streak(),
            seed: None,
            populate: SegmentDistribution::default(),
            recycle: SegmentDistribution::default(),
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            silent: 0.0,
            whisper: default_half_speed(),
            normal: default_full_speed(),
            shout: default_full_speed(),
            jump: default_full_speed(),
        }
    }
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            ascend_ms: default_jump_half_ms(),
            descend_ms: default_jump_half_ms(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        let key = |kind: SegmentType| Some(format!("segment-{}", kind.as_str()));
        Self {
            normal: key(SegmentType::Normal),
            whisper: key(SegmentType::Whisper),
            shout: key(SegmentType::Shout),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
        }
    }
}

fn default_min_voice() -> f32 { 0.01 }
fn default_whisper_max() -> f32 { 0.05 }
fn default_normal_max() -> f32 { 0.15 }
fn default_history_window() -> usize { 10 }
fn default_volume_scale() -> f32 { 300.0 }
fn default_segment_width() -> f32 { 50.0 }
fn default_segment_count() -> usize { 30 }
fn default_generation() -> Generation { Generation::Flat }
fn default_streak_continue() -> f32 { 0.6 }
fn default_max_streak() -> usize { 6 }
fn default_full_speed() -> f32 { 4.0 }
fn default_half_speed() -> f32 { 2.0 }
fn default_jump_half_ms() -> u64 { 400 }
fn default_frame_size() -> usize { 256 }

impl AssetsConfig {
    pub fn key_map(&self) -> HashMap<SegmentType, String> {
        [
            (SegmentType::Normal, &self.normal),
            (SegmentType::Whisper, &self.whisper),
            (SegmentType::Shout, &self.shout),
        ]
        .into_iter()
        .filter_map(|(kind, key)| key.clone().map(|k| (kind, k)))
        .collect()
    }
}

impl SpeedConfig {
    pub fn for_level(&self, level: VocalLevel) -> f32 {
        match level {
            VocalLevel::Silent => self.silent,
            VocalLevel::Whisper => self.whisper,
            VocalLevel::Normal => self.normal,
            VocalLevel::Shout => self.shout,
        }
    }
}

impl GameConfig {
    /// Check every option before anything is built from it. Component rules
    /// live with the components; only speeds and frame size are checked here.
    pub fn validate(&self) -> CoreResult<()> {
        AmplitudeClassifier::new(&self.classifier)?;
        track::check_geometry(self.track.segment_count, self.track.segment_width)?;
        generator::check_config(&self.track)?;
        JumpController::new(&self.jump)?;

        let s = &self.speed;
        for (name, value) in [
            ("silent", s.silent),
            ("whisper", s.whisper),
            ("normal", s.normal),
            ("shout", s.shout),
            ("jump", s.jump),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid_config(format!(
                    "speed.{} must be a non-negative number (got {})",
                    name, value
                )));
            }
        }

        if self.audio.frame_size == 0 {
            return Err(invalid_config("audio.frame_size must be at least 1"));
        }
        Ok(())
    }
}

pub(crate) fn validate_distribution(name: &str, dist: &SegmentDistribution) -> CoreResult<()> {
    let weights = [dist.normal, dist.whisper, dist.shout];
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(invalid_config(format!(
            "{} probabilities must be non-negative",
            name
        )));
    }
    let sum: f32 = weights.iter().sum();
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(invalid_config(format!(
            "{} probabilities must sum to 1 (got {})",
            name, sum
        )));
    }
    Ok(())
}

/// Look for a config file: `./vocal-runner.toml`, then the user config dirs.
pub fn discover_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("vocal-runner.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("vocal-runner").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("vocal-runner").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn load_config(path: &Path) -> Result<GameConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<GameConfig> {
    Ok(toml::from_str(content)?)
}
