//! Voice-driven runner core: microphone loudness becomes a vocal level that
//! scrolls a procedural track and triggers jumps.

pub mod audio;
pub mod config;
pub mod error;
pub mod game;
pub mod jump;
pub mod track;

pub use audio::classifier::AmplitudeClassifier;
pub use audio::level::{VocalLevel, VolumeReading};
pub use config::GameConfig;
pub use error::CoreError;
pub use game::{GameLoop, RenderState};
pub use jump::{JumpController, JumpState};
pub use track::SegmentTrack;
