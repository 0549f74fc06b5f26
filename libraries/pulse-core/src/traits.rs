/// Collaborator traits for the Pulse playback engine
///
/// The engine never constructs any of these itself; the embedding platform
/// glue provides them.
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::Result;
use crate::types::{
    FftFrame, ListenerId, MediaItem, PlaybackModes, PlayerEvent, PlayerStatus, RepeatMode,
    SavedPlayback, SessionEvent, TrackRef,
};

/// Callback the player invokes for every change notification
pub type PlayerListener = Arc<dyn Fn(PlayerEvent) + Send + Sync>;

/// Callback the visualizer invokes for every captured FFT frame
pub type FrameListener = Arc<dyn Fn(FftFrame) + Send + Sync>;

/// Handle to the platform's active player/session object
///
/// Implementations are not safe for concurrent invocation: the engine
/// only calls them from its single command lane. Every method may fail
/// with [`PulseError::HandleUnavailable`](crate::PulseError) if the
/// underlying session disappeared between two calls.
pub trait PlayerHandle: Send + Sync {
    // === Transport ===

    /// Start or resume playback
    fn play(&self) -> Result<()>;

    /// Pause playback
    fn pause(&self) -> Result<()>;

    /// Prepare the loaded item list for playback
    fn prepare(&self) -> Result<()>;

    /// Seek within the current item
    fn seek_to(&self, position_ms: i64) -> Result<()>;

    /// Jump to another item in the loaded list
    fn seek_to_item(&self, index: usize, position_ms: i64) -> Result<()>;

    /// Skip to the next item
    fn skip_to_next(&self) -> Result<()>;

    /// Skip to the previous item (or restart the current one)
    fn skip_to_previous(&self) -> Result<()>;

    // === Item list ===

    /// Replace the loaded list, starting at `start_index`
    fn set_items(&self, items: Vec<MediaItem>, start_index: usize, start_position_ms: i64)
        -> Result<()>;

    /// Insert an item at `index`
    fn add_item(&self, index: usize, item: MediaItem) -> Result<()>;

    /// Remove the item at `index`
    fn remove_item(&self, index: usize) -> Result<()>;

    /// Currently loaded items
    fn items(&self) -> Result<Vec<MediaItem>>;

    /// Index of the current item, if any
    fn current_index(&self) -> Result<Option<usize>>;

    /// The current item, if any
    fn current_item(&self) -> Result<Option<MediaItem>>;

    // === Progress ===

    /// Position within the current item
    fn position_ms(&self) -> Result<i64>;

    /// Duration of the current item; negative when unknown
    fn duration_ms(&self) -> Result<i64>;

    /// Buffered position within the current item
    fn buffered_position_ms(&self) -> Result<i64>;

    /// Whether audio is actually playing
    fn is_playing(&self) -> Result<bool>;

    /// Coarse player status
    fn status(&self) -> Result<PlayerStatus>;

    // === Modes ===

    /// Current repeat mode
    fn repeat_mode(&self) -> Result<RepeatMode>;

    /// Set the repeat mode
    fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()>;

    /// Whether shuffle is enabled
    fn shuffle_enabled(&self) -> Result<bool>;

    /// Enable or disable shuffle
    fn set_shuffle_enabled(&self, enabled: bool) -> Result<()>;

    /// Current playback speed
    fn playback_speed(&self) -> Result<f32>;

    /// Set playback speed
    fn set_playback_speed(&self, speed: f32) -> Result<()>;

    // === Session ===

    /// Audio session id of the output; `0` until real output has started
    fn audio_session_id(&self) -> Result<i32>;

    /// Attach a change listener
    fn add_listener(&self, listener: PlayerListener) -> ListenerId;

    /// Detach a previously attached listener
    fn remove_listener(&self, id: ListenerId);

    /// Release the underlying player
    fn release(&self);
}

/// Source of handle availability transitions
pub trait SessionProvider: Send + Sync {
    /// Start connecting and return the stream of transitions
    ///
    /// Called once per controller. The stream ends when the provider shuts
    /// down.
    fn connect(&self) -> mpsc::UnboundedReceiver<SessionEvent>;
}

/// Shared queue/library data source
///
/// Read-mostly snapshots; the engine writes only the playing queue.
pub trait LibrarySource: Send + Sync {
    /// Every track currently known to the library
    fn library(&self) -> Vec<TrackRef>;

    /// The current playing queue
    fn playing_queue(&self) -> Vec<TrackRef>;

    /// Replace the playing queue
    fn set_playing_queue(&self, tracks: Vec<TrackRef>);
}

/// Settings/persistence collaborator
pub trait SettingsStore: Send + Sync {
    /// The user's intended repeat/shuffle modes
    fn playback_modes(&self) -> PlaybackModes;

    /// Persist the user's intended repeat/shuffle modes
    fn save_playback_modes(&self, modes: PlaybackModes) -> Result<()>;

    /// Last saved playback point, if any
    fn last_playback(&self) -> Option<SavedPlayback>;

    /// Persist a playback point for resume-on-restart
    fn save_last_playback(&self, saved: SavedPlayback) -> Result<()>;
}

/// A running frequency capture bound to one audio session
pub trait Visualizer: Send {
    /// Enable or disable frame delivery without tearing the capture down
    fn set_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Release the capture; no frames are delivered afterwards
    fn release(&mut self);
}

/// Creates frequency captures for an audio session
pub trait VisualizerFactory: Send + Sync {
    /// Create a capture for `audio_session_id` delivering frames to `listener`
    ///
    /// Captures start disabled.
    fn create(&self, audio_session_id: i32, listener: FrameListener)
        -> Result<Box<dyn Visualizer>>;
}
