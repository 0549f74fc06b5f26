/// Repeat/shuffle modes and the persisted playback snapshot
use serde::{Deserialize, Serialize};

use super::ids::TrackId;

/// Repeat mode for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when the queue ends
    #[default]
    Off,
    /// Loop the current track only
    One,
    /// Loop the entire queue
    All,
}

impl RepeatMode {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::One => "one",
            Self::All => "all",
        }
    }

    /// Parse from string
    #[must_use]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "off" => Some(Self::Off),
            "one" => Some(Self::One),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shuffle mode for playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShuffleMode {
    /// Play in queue order
    #[default]
    Off,
    /// Let the player pick its own shuffled order
    On,
}

impl ShuffleMode {
    /// Whether the player should shuffle
    pub fn is_enabled(self) -> bool {
        self == Self::On
    }
}

impl From<bool> for ShuffleMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// The user's intended repeat/shuffle modes
///
/// Remembered independently of any player handle so that a reconnect can
/// restore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlaybackModes {
    /// Intended repeat mode
    pub repeat: RepeatMode,
    /// Intended shuffle mode
    pub shuffle: ShuffleMode,
}

/// Last known playback point, used to resume after a restart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedPlayback {
    /// Track that was playing
    pub track_id: TrackId,
    /// Position within that track
    pub position_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_mode_string_roundtrip() {
        for mode in [RepeatMode::Off, RepeatMode::One, RepeatMode::All] {
            assert_eq!(RepeatMode::from_str(mode.as_str()), Some(mode));
        }
        assert_eq!(RepeatMode::from_str("sometimes"), None);
    }

    #[test]
    fn shuffle_from_bool() {
        assert_eq!(ShuffleMode::from(true), ShuffleMode::On);
        assert!(!ShuffleMode::from(false).is_enabled());
    }

    #[test]
    fn modes_serialize_lowercase() {
        let modes = PlaybackModes {
            repeat: RepeatMode::All,
            shuffle: ShuffleMode::On,
        };
        let json = serde_json::to_string(&modes).unwrap();
        assert_eq!(json, r#"{"repeat":"all","shuffle":"on"}"#);
    }
}
