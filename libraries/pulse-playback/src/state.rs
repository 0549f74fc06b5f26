//! The published playback snapshot

use pulse_analysis::DEFAULT_BPM;
use pulse_core::{RepeatMode, ShuffleMode, TrackRef};
use serde::{Deserialize, Serialize};

/// Everything an observer needs to render playback
///
/// Replaced wholesale on every update; observers only ever see complete
/// snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Track currently loaded in the player
    pub current_track: Option<TrackRef>,

    /// Audio is actually playing
    pub is_playing: bool,

    /// Player is buffering
    pub is_loading: bool,

    /// A user scrub is in progress; reconciliation leaves `position_ms` alone
    pub is_seeking: bool,

    /// Position within the current track
    pub position_ms: i64,

    /// Duration of the current track (never negative)
    pub duration_ms: i64,

    /// Buffered position within the current track
    pub buffered_position_ms: i64,

    /// Repeat mode reported by the player
    pub repeat_mode: RepeatMode,

    /// Shuffle mode reported by the player
    pub shuffle_mode: ShuffleMode,

    /// Playback speed reported by the player
    pub playback_speed: f32,

    /// Last surfaced failure; sticky until explicitly cleared
    pub error: Option<String>,

    /// Smoothed bass intensity in `[0, 1]`
    pub bass_intensity: f32,

    /// Estimated tempo
    pub estimated_bpm: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::with_speed(1.0)
    }
}

impl PlaybackState {
    /// Stopped state reporting the given playback speed
    pub fn with_speed(playback_speed: f32) -> Self {
        Self {
            current_track: None,
            is_playing: false,
            is_loading: false,
            is_seeking: false,
            position_ms: 0,
            duration_ms: 0,
            buffered_position_ms: 0,
            repeat_mode: RepeatMode::Off,
            shuffle_mode: ShuffleMode::Off,
            playback_speed,
            error: None,
            bass_intensity: 0.0,
            estimated_bpm: DEFAULT_BPM,
        }
    }

    /// Zero the visualizer outputs
    pub fn clear_visualizer(&mut self) {
        self.bass_intensity = 0.0;
        self.estimated_bpm = DEFAULT_BPM;
    }

    /// Fraction of the track played, `0.0` when the duration is unknown
    pub fn progress(&self) -> f32 {
        if self.duration_ms <= 0 {
            return 0.0;
        }
        (self.position_ms as f32 / self.duration_ms as f32).clamp(0.0, 1.0)
    }
}
