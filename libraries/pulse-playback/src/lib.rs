//! Pulse Playback - the playback engine
//!
//! Sits between an external player/session handle and any number of UI
//! observers, and keeps a single [`PlaybackState`] snapshot consistent with
//! the player's ground truth.
//!
//! This crate provides:
//! - The state store and reconciliation against the handle
//! - Periodic position polling while playing or buffering
//! - Queue operations (initiate playback, play next, removal, shuffle start)
//! - Session connection lifecycle over a provider's event stream
//! - A bass-beat analysis lane feeding intensity and BPM into the state
//! - Resume of the last playback point after a restart
//!
//! # Architecture
//!
//! The handle is not safe for concurrent use, so every call against it runs
//! on one command lane. Progress polling and session observation run in the
//! background and only hop onto the lane when they need the handle. FFT
//! frames are processed on their own analysis lane. State is published as
//! whole snapshots through a `watch` channel, so observers always see a
//! complete value and slow observers only see the newest one.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_core::{RepeatMode, ShuffleMode, TrackRef};
//! use pulse_playback::test_utils::{FakePlayer, FakeSession, FakeVisualizerFactory, MemorySettings};
//! use pulse_playback::{Collaborators, EngineConfig, PlaybackController, SharedLibrary};
//! use std::sync::Arc;
//!
//! # async fn run() -> pulse_playback::Result<()> {
//! let track = TrackRef::new("1", "content://media/1", "Intro");
//! let session = Arc::new(FakeSession::new());
//! let controller = PlaybackController::start(
//!     EngineConfig::default(),
//!     Collaborators {
//!         session: session.clone(),
//!         library: Arc::new(SharedLibrary::with_tracks(vec![track.clone()])),
//!         settings: Arc::new(MemorySettings::new()),
//!         visualizers: Arc::new(FakeVisualizerFactory::new()),
//!     },
//! )?;
//!
//! session.connect_player(Arc::new(FakePlayer::new()));
//! controller
//!     .initiate_playback(track, RepeatMode::Off, ShuffleMode::Off)
//!     .await;
//!
//! let mut states = controller.subscribe();
//! states.changed().await.ok();
//! println!("{:?}", states.borrow().current_track);
//!
//! controller.release_player().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod controller;
pub mod error;
pub mod library;
pub mod queue;
pub mod resume;
pub mod session;
pub mod shuffle;
pub mod state;
pub mod store;
pub mod tracker;

mod analysis;
mod driver;
mod lane;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{EngineConfig, MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED};
pub use controller::{Collaborators, PlaybackController};
pub use error::{PlaybackError, Result};
pub use library::{find_track, SharedLibrary};
pub use queue::{QueueManager, StartMode};
pub use resume::{ResumeOutcome, ResumeWorkflow};
pub use session::{next_state, ConnectionState, SessionConnector, Transition};
pub use shuffle::pick_start_index;
pub use state::PlaybackState;
pub use store::{resolve_track, PlaybackStateStore};
pub use tracker::ProgressTracker;
