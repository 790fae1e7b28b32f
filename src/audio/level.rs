use serde::{Deserialize, Serialize};

/// Discretized loudness category, ordered from quietest to loudest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocalLevel {
    Silent,
    Whisper,
    Normal,
    Shout,
}

impl VocalLevel {
    pub const ALL: [VocalLevel; 4] = [
        VocalLevel::Silent,
        VocalLevel::Whisper,
        VocalLevel::Normal,
        VocalLevel::Shout,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VocalLevel::Silent => "silent",
            VocalLevel::Whisper => "whisper",
            VocalLevel::Normal => "normal",
            VocalLevel::Shout => "shout",
        }
    }
}

impl std::str::FromStr for VocalLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" => Ok(VocalLevel::Silent),
            "whisper" => Ok(VocalLevel::Whisper),
            "normal" => Ok(VocalLevel::Normal),
            "shout" => Ok(VocalLevel::Shout),
            other => Err(format!(
                "unknown vocal level '{}' (expected silent, whisper, normal or shout)",
                other
            )),
        }
    }
}

impl std::fmt::Display for VocalLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tick's classification result.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VolumeReading {
    /// RMS of the frame just analysed
    pub instantaneous_energy: f32,
    /// Mean of the energy history window (or the debug substitute)
    pub smoothed_energy: f32,
    /// Display-only loudness, 0-100
    pub volume_percent: f32,
    pub level: VocalLevel,
}
