use serde::Serialize;
use std::time::Duration;

use crate::audio::level::VocalLevel;
use crate::config::JumpConfig;
use crate::error::{invalid_config, CoreResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JumpState {
    Idle,
    Ascending,
    Descending,
}

/// Transitions reported by [`JumpController::advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JumpEvent {
    Apex,
    /// Back on the ground; `restore` is the level active before take-off.
    Landed { restore: VocalLevel },
}

/// At most one jump in flight. Advanced by elapsed time rather than timers,
/// so dropping or cancelling it leaves nothing pending.
#[derive(Clone, Debug)]
pub struct JumpController {
    ascend: Duration,
    descend: Duration,
    state: JumpState,
    elapsed: Duration,
    prior_level: VocalLevel,
    jumps_started: u64,
}

impl JumpController {
    pub fn new(config: &JumpConfig) -> CoreResult<Self> {
        if config.ascend_ms == 0 || config.descend_ms == 0 {
            return Err(invalid_config(format!(
                "jump durations must be positive (ascend_ms={}, descend_ms={})",
                config.ascend_ms, config.descend_ms
            )));
        }
        Ok(Self {
            ascend: Duration::from_millis(config.ascend_ms),
            descend: Duration::from_millis(config.descend_ms),
            state: JumpState::Idle,
            elapsed: Duration::ZERO,
            prior_level: VocalLevel::Silent,
            jumps_started: 0,
        })
    }

    /// Start a jump if grounded. Returns false (and does nothing) mid-air.
    pub fn on_shout_detected(&mut self, prior_level: VocalLevel) -> bool {
        if self.state != JumpState::Idle {
            return false;
        }
        self.state = JumpState::Ascending;
        self.elapsed = Duration::ZERO;
        self.prior_level = prior_level;
        self.jumps_started += 1;
        log::debug!("Jump #{} started (prior level {})", self.jumps_started, prior_level);
        true
    }

    /// Move the clock forward. A step long enough to cover both phases lands
    /// directly and reports only the landing.
    pub fn advance(&mut self, dt: Duration) -> Option<JumpEvent> {
        if self.state == JumpState::Idle {
            return None;
        }
        self.elapsed += dt;

        if self.elapsed >= self.ascend + self.descend {
            self.state = JumpState::Idle;
            self.elapsed = Duration::ZERO;
            log::debug!("Jump landed, restoring {}", self.prior_level);
            return Some(JumpEvent::Landed {
                restore: self.prior_level,
            });
        }
        if self.state == JumpState::Ascending && self.elapsed >= self.ascend {
            self.state = JumpState::Descending;
            log::debug!("Jump apex");
            return Some(JumpEvent::Apex);
        }
        None
    }

    /// Drop any jump in flight without reporting a landing.
    pub fn cancel(&mut self) {
        if self.state != JumpState::Idle {
            log::debug!("Jump cancelled in {:?}", self.state);
        }
        self.state = JumpState::Idle;
        self.elapsed = Duration::ZERO;
    }

    pub fn state(&self) -> JumpState {
        self.state
    }

    pub fn is_airborne(&self) -> bool {
        self.state != JumpState::Idle
    }

    /// Level shown while airborne.
    pub fn frozen_level(&self) -> Option<VocalLevel> {
        self.is_airborne().then_some(VocalLevel::Shout)
    }

    pub fn jumps_started(&self) -> u64 {
        self.jumps_started
    }
}
