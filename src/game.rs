use serde::Serialize;
use std::time::Duration;

use crate::audio::classifier::AmplitudeClassifier;
use crate::audio::level::{VocalLevel, VolumeReading};
use crate::config::{GameConfig, SpeedConfig};
use crate::error::CoreResult;
use crate::jump::{JumpController, JumpEvent, JumpState};
use crate::track::segment::{AssetMap, SegmentType};
use crate::track::SegmentTrack;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SegmentView {
    pub kind: SegmentType,
    pub position: f32,
    pub asset: String,
}

/// Everything the presentation layer needs for one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RenderState {
    pub tick: u64,
    pub level: VocalLevel,
    pub volume_percent: f32,
    pub smoothed_energy: f32,
    pub scroll_speed: f32,
    pub jump_state: JumpState,
    pub segments: Vec<SegmentView>,
    pub recycled: u64,
}

/// Owns the three components and runs them in a fixed order each tick.
pub struct GameLoop {
    classifier: AmplitudeClassifier,
    jump: JumpController,
    track: SegmentTrack,
    speeds: SpeedConfig,
    assets: AssetMap,
    visible_level: VocalLevel,
    ticks: u64,
}

impl GameLoop {
    pub fn new(config: &GameConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            classifier: AmplitudeClassifier::new(&config.classifier)?,
            jump: JumpController::new(&config.jump)?,
            track: SegmentTrack::from_config(&config.track)?,
            speeds: config.speed.clone(),
            assets: AssetMap::new(config.assets.key_map()),
            visible_level: VocalLevel::Silent,
            ticks: 0,
        })
    }

    /// Run one tick: classify `frame`, let `dt` pass for the jump, maybe
    /// start a jump, scroll, then snapshot. An unmapped segment type fails the
    /// tick before the track scrolls or the tick count moves.
    pub fn tick(&mut self, frame: &[f32], dt: Duration) -> CoreResult<RenderState> {
        let reading = self.classifier.classify(frame)?;
        let level = self.resolve_level(&reading, dt);
        let speed = self.scroll_speed(reading.level);
        self.check_assets(speed)?;
        self.track.tick(speed);
        self.visible_level = level;
        self.ticks += 1;
        self.snapshot(&reading, speed)
    }

    fn resolve_level(&mut self, reading: &VolumeReading, dt: Duration) -> VocalLevel {
        let mut level = reading.level;
        let mut prior = self.visible_level;
        if let Some(JumpEvent::Landed { restore }) = self.jump.advance(dt) {
            level = self.classifier.debug_override().unwrap_or(restore);
            prior = level;
        }
        if reading.level == VocalLevel::Shout && self.jump.on_shout_detected(prior) {
            log::debug!(
                "Shout at tick {} (energy {:.3})",
                self.ticks,
                reading.smoothed_energy
            );
        }
        self.jump.frozen_level().unwrap_or(level)
    }

    /// Grounded speed follows the classifier, even on the landing tick.
    fn scroll_speed(&self, classified: VocalLevel) -> f32 {
        if self.jump.is_airborne() {
            self.speeds.jump
        } else {
            self.speeds.for_level(classified)
        }
    }

    fn check_assets(&self, speed: f32) -> CoreResult<()> {
        let kinds = self
            .track
            .segments()
            .map(|s| s.kind)
            .chain(self.track.pending_recycle(speed));
        for kind in kinds {
            self.assets.segment_image_key(kind)?;
        }
        Ok(())
    }

    fn snapshot(&self, reading: &VolumeReading, speed: f32) -> CoreResult<RenderState> {
        let segments = self
            .track
            .segments()
            .map(|s| -> CoreResult<SegmentView> {
                Ok(SegmentView {
                    kind: s.kind,
                    position: s.position,
                    asset: self.assets.segment_image_key(s.kind)?.to_string(),
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(RenderState {
            tick: self.ticks,
            level: self.visible_level,
            volume_percent: reading.volume_percent,
            smoothed_energy: reading.smoothed_energy,
            scroll_speed: speed,
            jump_state: self.jump.state(),
            segments,
            recycled: self.track.recycled(),
        })
    }

    pub fn set_debug_level(&mut self, level: Option<VocalLevel>) {
        self.classifier.set_debug_override(level);
    }

    /// Teardown: any jump in flight is dropped without restoring state.
    pub fn shutdown(&mut self) {
        self.jump.cancel();
        log::info!(
            "Game stopped after {} ticks ({} jumps, {} segments recycled)",
            self.ticks,
            self.jump.jumps_started(),
            self.track.recycled()
        );
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn jumps_started(&self) -> u64 {
        self.jump.jumps_started()
    }

    pub fn jump_state(&self) -> JumpState {
        self.jump.state()
    }

    pub fn visible_level(&self) -> VocalLevel {
        self.visible_level
    }

    pub fn track(&self) -> &SegmentTrack {
        &self.track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::track::segment::SegmentDistribution;

    const DT: Duration = Duration::from_millis(16);

    fn config() -> GameConfig {
        let mut cfg = GameConfig::default();
        cfg.track.seed = Some(5);
        cfg
    }

    fn frame(value: f32) -> Vec<f32> {
        vec![value; 256]
    }

    #[test]
    fn shout_stream_triggers_exactly_one_jump() {
        let mut game = GameLoop::new(&config()).unwrap();
        let first = game.tick(&frame(0.2), DT).unwrap();
        assert_eq!(first.level, VocalLevel::Shout);
        assert_eq!(first.jump_state, JumpState::Ascending);

        for _ in 1..10 {
            let state = game.tick(&frame(0.2), DT).unwrap();
            assert!((state.smoothed_energy - 0.2).abs() < 1e-5);
            assert_ne!(state.jump_state, JumpState::Idle);
        }
        assert_eq!(game.jumps_started(), 1);
    }

    #[test]
    fn landing_restores_prior_level() {
        let mut game = GameLoop::new(&config()).unwrap();
        // settle on Normal first so the window is full of 0.1
        for _ in 0..10 {
            game.tick(&frame(0.1), DT).unwrap();
        }
        assert_eq!(game.visible_level(), VocalLevel::Normal);

        // one loud frame pushes the mean over normal_max: 0.1 * 9 + 1.0 = 1.9 / 10
        let state = game.tick(&frame(1.0), DT).unwrap();
        assert_eq!(state.level, VocalLevel::Shout);
        assert_eq!(state.jump_state, JumpState::Ascending);

        let mut landed_level = None;
        for _ in 0..60 {
            let state = game.tick(&frame(0.0), DT).unwrap();
            if state.jump_state == JumpState::Idle {
                // level is restored, speed already follows the silent reading
                assert_eq!(state.scroll_speed, 0.0);
                landed_level = Some(state.level);
                break;
            }
            assert_eq!(state.level, VocalLevel::Shout);
            assert_eq!(state.scroll_speed, 4.0);
        }
        assert_eq!(landed_level, Some(VocalLevel::Normal));

        // after the landing tick the classifier takes over again
        let state = game.tick(&frame(0.0), DT).unwrap();
        assert_eq!(state.level, VocalLevel::Silent);
    }

    #[test]
    fn jump_forces_running_speed() {
        let mut cfg = config();
        cfg.speed.shout = 1.0;
        cfg.speed.jump = 7.0;
        let mut game = GameLoop::new(&cfg).unwrap();
        let state = game.tick(&frame(0.5), DT).unwrap();
        assert_eq!(state.scroll_speed, 7.0);
        assert_eq!(state.segments[0].position, -7.0);
    }

    #[test]
    fn speed_follows_level_when_grounded() {
        let mut game = GameLoop::new(&config()).unwrap();
        let silent = game.tick(&frame(0.0), DT).unwrap();
        assert_eq!(silent.level, VocalLevel::Silent);
        assert_eq!(silent.scroll_speed, 0.0);

        let mut game = GameLoop::new(&config()).unwrap();
        let whisper = game.tick(&frame(0.03), DT).unwrap();
        assert_eq!(whisper.level, VocalLevel::Whisper);
        assert_eq!(whisper.scroll_speed, 2.0);

        let mut game = GameLoop::new(&config()).unwrap();
        let normal = game.tick(&frame(0.1), DT).unwrap();
        assert_eq!(normal.level, VocalLevel::Normal);
        assert_eq!(normal.scroll_speed, 4.0);
    }

    #[test]
    fn debug_level_survives_landing() {
        let mut game = GameLoop::new(&config()).unwrap();
        game.tick(&frame(0.2), DT).unwrap();
        game.set_debug_level(Some(VocalLevel::Whisper));

        let mut landed = None;
        for _ in 0..60 {
            let state = game.tick(&frame(0.2), DT).unwrap();
            if state.jump_state == JumpState::Idle {
                landed = Some(state.level);
                break;
            }
        }
        assert_eq!(landed, Some(VocalLevel::Whisper));
    }

    #[test]
    fn track_length_is_constant() {
        let mut game = GameLoop::new(&config()).unwrap();
        for i in 0..500 {
            let value = if i % 50 < 25 { 0.1 } else { 0.03 };
            let state = game.tick(&frame(value), DT).unwrap();
            assert_eq!(state.segments.len(), 30);
        }
        assert!(game.track().recycled() > 0);
    }

    #[test]
    fn empty_frame_is_rejected() {
        let mut game = GameLoop::new(&config()).unwrap();
        assert!(matches!(
            game.tick(&[], DT),
            Err(CoreError::InvalidInput(_))
        ));
        assert_eq!(game.ticks(), 0);
    }

    #[test]
    fn invalid_config_refuses_to_start() {
        let mut cfg = config();
        cfg.classifier.normal_max = cfg.classifier.whisper_max;
        assert!(matches!(
            GameLoop::new(&cfg),
            Err(CoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn missing_asset_surfaces_at_snapshot() {
        let mut cfg = config();
        cfg.track.populate = SegmentDistribution::new(0.0, 1.0, 0.0).unwrap();
        cfg.assets.whisper = None;
        let mut game = GameLoop::new(&cfg).unwrap();
        assert_eq!(
            game.tick(&frame(0.0), DT),
            Err(CoreError::UnmappedType(SegmentType::Whisper))
        );
        assert_eq!(game.ticks(), 0);
    }

    #[test]
    fn unmapped_recycle_leaves_tick_untouched() {
        let mut cfg = config();
        cfg.track.populate = SegmentDistribution::new(1.0, 0.0, 0.0).unwrap();
        cfg.track.recycle = SegmentDistribution::new(0.0, 0.0, 1.0).unwrap();
        cfg.assets.shout = None;
        let mut game = GameLoop::new(&cfg).unwrap();

        // Normal scrolls at 4 per tick; the head passes -50 on tick 13
        for _ in 0..12 {
            game.tick(&frame(0.1), DT).unwrap();
        }
        let before: Vec<f32> = game.track().segments().map(|s| s.position).collect();
        assert_eq!(before[0], -48.0);

        assert_eq!(
            game.tick(&frame(0.1), DT),
            Err(CoreError::UnmappedType(SegmentType::Shout))
        );
        let after: Vec<f32> = game.track().segments().map(|s| s.position).collect();
        assert_eq!(after, before);
        assert_eq!(game.ticks(), 12);
        assert_eq!(game.track().recycled(), 0);
        assert_eq!(game.visible_level(), VocalLevel::Normal);
    }

    #[test]
    fn shutdown_cancels_jump() {
        let mut game = GameLoop::new(&config()).unwrap();
        game.tick(&frame(0.2), DT).unwrap();
        assert_eq!(game.jump_state(), JumpState::Ascending);
        game.shutdown();
        assert_eq!(game.jump_state(), JumpState::Idle);
    }

    #[test]
    fn same_seed_same_session() {
        let run = || {
            let mut game = GameLoop::new(&config()).unwrap();
            (0..200)
                .map(|i| {
                    let value = ((i * 13) % 17) as f32 * 0.015;
                    game.tick(&frame(value), DT).unwrap()
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
