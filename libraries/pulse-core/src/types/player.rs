/// Player-side status, events and session transitions
use std::fmt;
use std::sync::Arc;

use crate::traits::PlayerHandle;

/// Coarse state the platform player reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    /// Nothing prepared
    #[default]
    Idle,
    /// Loading or rebuffering
    Buffering,
    /// Prepared and able to play
    Ready,
    /// Reached the end of the item list
    Ended,
}

impl PlayerStatus {
    /// Whether position is meaningful and worth polling
    pub fn is_active(self) -> bool {
        matches!(self, Self::Buffering | Self::Ready)
    }
}

/// Change notification delivered by a player handle's listener
///
/// Platform players coalesce these, so receivers treat every event as a
/// hint to reconcile rather than as a complete description of the change.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Playing flag flipped
    IsPlayingChanged(bool),
    /// Player status changed
    StatusChanged(PlayerStatus),
    /// Current item changed (auto-advance, skip, or list replacement)
    MediaItemTransition {
        /// Media id of the new current item, if any
        media_id: Option<String>,
    },
    /// Position jumped (seek, repeat-one wrap)
    PositionDiscontinuity,
    /// Item list changed
    TimelineChanged,
    /// Repeat mode changed on the player
    RepeatModeChanged,
    /// Shuffle flag changed on the player
    ShuffleModeChanged,
    /// Playback speed changed on the player
    PlaybackSpeedChanged,
    /// The player hit an error; the message is surfaced verbatim
    PlayerError(String),
}

/// Handle availability transition published by a session provider
#[derive(Clone)]
pub enum SessionEvent {
    /// A connection attempt started
    Connecting,
    /// A handle became available (possibly replacing a previous one)
    Available(Arc<dyn PlayerHandle>),
    /// The handle went away
    Unavailable,
}

impl fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => write!(f, "Connecting"),
            Self::Available(_) => write!(f, "Available(<handle>)"),
            Self::Unavailable => write!(f, "Unavailable"),
        }
    }
}
