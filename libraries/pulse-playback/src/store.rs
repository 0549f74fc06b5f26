//! Single source of truth for playback state
//!
//! The snapshot lives in a `watch` channel: every mutation computes a new
//! value from the old one under the channel's lock and publishes it in one
//! step, and observers always read the latest complete value.

use crate::state::PlaybackState;
use pulse_core::{
    LibrarySource, MediaItem, PlayerHandle, PlayerStatus, RepeatMode, ShuffleMode, TrackRef,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::debug;

/// Owner of the live [`PlaybackState`]
#[derive(Debug)]
pub struct PlaybackStateStore {
    tx: watch::Sender<PlaybackState>,
    initial: PlaybackState,
    closed: AtomicBool,
}

/// Ground truth read from a handle in one pass
#[derive(Debug, Clone, PartialEq)]
struct HandleReading {
    position_ms: i64,
    duration_ms: i64,
    buffered_position_ms: i64,
    is_playing: bool,
    status: PlayerStatus,
    repeat_mode: RepeatMode,
    shuffle_enabled: bool,
    playback_speed: f32,
    current_item: Option<MediaItem>,
}

impl HandleReading {
    fn read(handle: &dyn PlayerHandle) -> pulse_core::Result<Self> {
        Ok(Self {
            position_ms: handle.position_ms()?,
            duration_ms: handle.duration_ms()?,
            buffered_position_ms: handle.buffered_position_ms()?,
            is_playing: handle.is_playing()?,
            status: handle.status()?,
            repeat_mode: handle.repeat_mode()?,
            shuffle_enabled: handle.shuffle_enabled()?,
            playback_speed: handle.playback_speed()?,
            current_item: handle.current_item()?,
        })
    }
}

impl PlaybackStateStore {
    /// Create a store whose default (and reset target) is `initial`
    pub fn new(initial: PlaybackState) -> Self {
        let (tx, _) = watch::channel(initial.clone());
        Self {
            tx,
            initial,
            closed: AtomicBool::new(false),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> PlaybackState {
        self.tx.borrow().clone()
    }

    /// Latest-value, conflated stream of snapshots
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.tx.subscribe()
    }

    /// Compute a new snapshot from the current one and publish it
    ///
    /// Observers are only notified if the snapshot actually changed.
    /// Returns `false` once the store is closed.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut PlaybackState),
    {
        let mut applied = false;
        self.tx.send_if_modified(|current| {
            if self.closed.load(Ordering::Acquire) {
                return false;
            }
            applied = true;
            let mut next = current.clone();
            f(&mut next);
            if next == *current {
                return false;
            }
            *current = next;
            true
        });
        applied
    }

    /// Reset to the default snapshot (no track, stopped)
    pub fn reset(&self) {
        let initial = self.initial.clone();
        self.update(|state| *state = initial);
    }

    /// Surface a failure to observers
    pub fn set_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|state| state.error = Some(message));
    }

    /// Clear the sticky error
    pub fn clear_error(&self) {
        self.update(|state| state.error = None);
    }

    /// Stop publishing; every later update is a no-op
    pub fn close(&self) {
        // Flipped under the channel lock so no update can straddle it
        self.tx.send_if_modified(|_| {
            self.closed.store(true, Ordering::Release);
            false
        });
    }

    /// Whether the store has been closed
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Pull ground truth from `handle` into the snapshot
    ///
    /// A failed read skips this cycle without publishing anything. The
    /// position is left alone while a scrub is in progress. Returns whether
    /// a reading was applied.
    pub fn reconcile(&self, handle: &dyn PlayerHandle, library: &dyn LibrarySource) -> bool {
        let reading = match HandleReading::read(handle) {
            Ok(reading) => reading,
            Err(e) => {
                debug!("Skipping reconciliation: {}", e);
                return false;
            }
        };

        let current_track = reading
            .current_item
            .as_ref()
            .map(|item| resolve_track(item, library));

        self.update(move |state| {
            state.current_track = current_track;
            state.is_playing = reading.is_playing;
            state.is_loading = reading.status == PlayerStatus::Buffering;
            if !state.is_seeking {
                state.position_ms = reading.position_ms.max(0);
            }
            state.duration_ms = reading.duration_ms.max(0);
            state.buffered_position_ms = reading.buffered_position_ms.max(0);
            state.repeat_mode = reading.repeat_mode;
            state.shuffle_mode = ShuffleMode::from(reading.shuffle_enabled);
            state.playback_speed = reading.playback_speed;
        })
    }
}

/// Resolve a player item to library metadata
///
/// The playing queue is consulted first, then the full library; an item
/// that matches neither keeps whatever metadata the player carries.
pub fn resolve_track(item: &MediaItem, library: &dyn LibrarySource) -> TrackRef {
    library
        .playing_queue()
        .into_iter()
        .find(|track| track.matches(item))
        .or_else(|| {
            library
                .library()
                .into_iter()
                .find(|track| track.matches(item))
        })
        .unwrap_or_else(|| TrackRef::from_media_item(item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::SharedLibrary;
    use crate::test_utils::FakePlayer;
    use pulse_core::{PulseError, UNKNOWN_TITLE};

    fn track(id: &str) -> TrackRef {
        TrackRef::new(id, format!("content://media/{id}"), format!("Song {id}"))
            .with_artist("Band")
            .with_duration_ms(180_000)
    }

    fn loaded_player(tracks: &[TrackRef]) -> FakePlayer {
        let player = FakePlayer::new();
        player
            .set_items(tracks.iter().map(TrackRef::to_media_item).collect(), 0, 0)
            .unwrap();
        player.prepare().unwrap();
        player
    }

    #[test]
    fn reconcile_resolves_library_metadata() {
        let library = SharedLibrary::with_tracks(vec![track("a"), track("b")]);
        let player = FakePlayer::new();
        // The player only carries the id
        player.set_items(vec![MediaItem::bare("b")], 0, 0).unwrap();

        let store = PlaybackStateStore::new(PlaybackState::default());
        assert!(store.reconcile(&player, &library));

        assert_eq!(store.snapshot().current_track, Some(track("b")));
    }

    #[test]
    fn reconcile_falls_back_to_player_metadata() {
        let library = SharedLibrary::new();
        let player = FakePlayer::new();
        player.set_items(vec![MediaItem::bare("ghost")], 0, 0).unwrap();

        let store = PlaybackStateStore::new(PlaybackState::default());
        store.reconcile(&player, &library);

        let current = store.snapshot().current_track.unwrap();
        assert_eq!(current.id.as_str(), "ghost");
        assert_eq!(current.title, UNKNOWN_TITLE);
    }

    #[test]
    fn negative_duration_is_clamped_to_zero() {
        let library = SharedLibrary::new();
        let player = loaded_player(&[track("a")]);
        player.set_duration_ms(-1);

        let store = PlaybackStateStore::new(PlaybackState::default());
        store.reconcile(&player, &library);

        assert_eq!(store.snapshot().duration_ms, 0);
    }

    #[test]
    fn seeking_protects_position_until_committed() {
        let library = SharedLibrary::new();
        let player = loaded_player(&[track("a")]);
        player.seek_to(10_000).unwrap();

        let store = PlaybackStateStore::new(PlaybackState::default());
        store.update(|state| {
            state.is_seeking = true;
            state.position_ms = 42_000;
        });

        store.reconcile(&player, &library);
        assert_eq!(store.snapshot().position_ms, 42_000);
        assert_eq!(store.snapshot().duration_ms, 180_000);

        store.update(|state| state.is_seeking = false);
        store.reconcile(&player, &library);
        assert_eq!(store.snapshot().position_ms, 10_000);
    }

    #[test]
    fn failed_read_publishes_nothing() {
        let library = SharedLibrary::new();
        let player = loaded_player(&[track("a")]);
        let store = PlaybackStateStore::new(PlaybackState::default());
        let mut rx = store.subscribe();

        player.fail_with(Some(PulseError::HandleUnavailable));
        assert!(!store.reconcile(&player, &library));

        assert!(!rx.has_changed().unwrap());
        assert_eq!(store.snapshot(), PlaybackState::default());
    }

    #[test]
    fn error_is_sticky_across_reconciliation() {
        let library = SharedLibrary::new();
        let player = loaded_player(&[track("a")]);
        let store = PlaybackStateStore::new(PlaybackState::default());

        store.set_error("Source error");
        store.reconcile(&player, &library);
        assert_eq!(store.snapshot().error.as_deref(), Some("Source error"));

        store.clear_error();
        assert_eq!(store.snapshot().error, None);
    }

    #[test]
    fn unchanged_snapshot_does_not_notify() {
        let store = PlaybackStateStore::new(PlaybackState::default());
        let mut rx = store.subscribe();

        store.update(|state| state.position_ms = 0);
        assert!(!rx.has_changed().unwrap());

        store.update(|state| state.position_ms = 1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().position_ms, 1);
    }

    #[test]
    fn reset_restores_initial_snapshot() {
        let store = PlaybackStateStore::new(PlaybackState::with_speed(1.5));
        store.update(|state| {
            state.current_track = Some(track("a"));
            state.is_playing = true;
            state.position_ms = 3_000;
            state.bass_intensity = 0.7;
        });

        store.reset();
        assert_eq!(store.snapshot(), PlaybackState::with_speed(1.5));
    }

    #[test]
    fn closed_store_ignores_updates() {
        let store = PlaybackStateStore::new(PlaybackState::default());
        store.close();

        assert!(!store.update(|state| state.is_playing = true));
        store.set_error("late");
        assert!(store.is_closed());
        assert_eq!(store.snapshot(), PlaybackState::default());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_never_tear_snapshots() {
        use std::sync::Arc;

        let store = Arc::new(PlaybackStateStore::new(PlaybackState::default()));

        // Each writer keeps an invariant across the fields it touches
        let progress = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for n in 0..2_000i64 {
                    store.update(|state| {
                        state.position_ms = n;
                        state.duration_ms = n;
                        state.buffered_position_ms = n;
                    });
                    tokio::task::yield_now().await;
                }
            })
        };
        let analysis = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for k in 0..2_000u16 {
                    store.update(|state| {
                        state.estimated_bpm = f32::from(k);
                        state.bass_intensity = f32::from(k) / 2_000.0;
                    });
                    tokio::task::yield_now().await;
                }
            })
        };

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..4_000 {
                    let s = store.snapshot();
                    assert_eq!(s.position_ms, s.duration_ms);
                    assert_eq!(s.position_ms, s.buffered_position_ms);
                    if s.bass_intensity > 0.0 {
                        assert!((s.estimated_bpm - s.bass_intensity * 2_000.0).abs() < 0.01);
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        progress.await.unwrap();
        analysis.await.unwrap();
        reader.await.unwrap();
    }
}
