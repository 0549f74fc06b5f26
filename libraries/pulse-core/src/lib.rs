//! Pulse Core
//!
//! Platform-agnostic types, collaborator traits, and error handling for the
//! Pulse playback engine.
//!
//! This crate is the shared vocabulary between the engine crates and the
//! platform glue that embeds them (media session bridge, library storage,
//! settings, visualizer capture).
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `TrackRef`, `MediaItem`, `RepeatMode`, `ShuffleMode`, `FftFrame`
//! - **Collaborator Traits**: `PlayerHandle`, `SessionProvider`, `LibrarySource`,
//!   `SettingsStore`, `VisualizerFactory`
//! - **Error Handling**: Unified `PulseError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use pulse_core::types::{MediaItem, TrackId, TrackRef};
//!
//! let track = TrackRef::new("42", "content://media/42", "My Favorite Song");
//! let item: MediaItem = track.to_media_item();
//!
//! assert_eq!(item.media_id, "42");
//! assert_eq!(track.id, TrackId::new("42"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{PulseError, Result};
pub use traits::{
    FrameListener, LibrarySource, PlayerHandle, PlayerListener, SessionProvider, SettingsStore,
    Visualizer, VisualizerFactory,
};

pub use types::{
    FftFrame, ListenerId, MediaItem, PlaybackModes, PlayerEvent, PlayerStatus, RepeatMode,
    SavedPlayback, SessionEvent, ShuffleMode, TrackId, TrackRef, UNKNOWN_ARTIST, UNKNOWN_TITLE,
};
