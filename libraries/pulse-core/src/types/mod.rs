mod frame;
mod ids;
mod modes;
mod player;
mod track;

pub use frame::FftFrame;
pub use ids::{ListenerId, TrackId};
pub use modes::{PlaybackModes, RepeatMode, SavedPlayback, ShuffleMode};
pub use player::{PlayerEvent, PlayerStatus, SessionEvent};
pub use track::{MediaItem, TrackRef, UNKNOWN_ARTIST, UNKNOWN_TITLE};
