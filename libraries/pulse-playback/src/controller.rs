//! Playback controller - the public control surface
//!
//! Composes the state store, command lane, progress tracker, queue
//! manager, session connector and analysis lane:
//!
//! ```text
//!   SessionProvider ──> SessionConnector ──┐
//!                                          v
//!   PlayerHandle callbacks ─────────────> driver ──> command lane ──> PlayerHandle
//!                                          │              │
//!   caller ──> PlaybackController ─────────┼──────────────┘
//!                                          v
//!   VisualizerFactory frames ──> analysis lane ──> PlaybackStateStore ──> observers
//! ```
//!
//! Every operation that touches the handle runs on the command lane and
//! reconciles afterwards, so the returned state already reflects it. No
//! operation fails: without a handle, advisory operations are no-ops and
//! user-visible ones set the sticky `error` field instead.

use crate::analysis::{spawn_analysis, AnalysisHandle};
use crate::config::{EngineConfig, MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED};
use crate::driver;
use crate::error::{PlaybackError, Result};
use crate::lane::{CommandLane, HandleSlot};
use crate::queue::QueueManager;
use crate::session::{ConnectionState, SessionConnector};
use crate::state::PlaybackState;
use crate::store::PlaybackStateStore;
use crate::tracker::ProgressTracker;
use pulse_core::{
    LibrarySource, PlaybackModes, PlayerHandle, PlayerStatus, PulseError, RepeatMode,
    SessionProvider, SettingsStore, ShuffleMode, TrackRef, VisualizerFactory,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// External collaborators the controller is wired to
pub struct Collaborators {
    /// Yields handle availability transitions
    pub session: Arc<dyn SessionProvider>,
    /// Shared library and playing queue
    pub library: Arc<dyn LibrarySource>,
    /// Intended modes and resume point persistence
    pub settings: Arc<dyn SettingsStore>,
    /// Frequency capture for the analysis lane
    pub visualizers: Arc<dyn VisualizerFactory>,
}

/// State shared between the controller and its background tasks
pub(crate) struct Engine {
    pub config: EngineConfig,
    pub store: Arc<PlaybackStateStore>,
    pub lane: CommandLane,
    pub queue: QueueManager,
    pub settings: Arc<dyn SettingsStore>,
    pub connector: Arc<SessionConnector>,
    pub tracker: ProgressTracker,
    pub analysis: AnalysisHandle,
    intent: Mutex<PlaybackModes>,
    released: AtomicBool,
}

impl Engine {
    /// The user's intended modes
    pub fn intent(&self) -> PlaybackModes {
        *lock(&self.intent)
    }

    /// Reconcile the store against `handle`
    pub fn reconcile(&self, handle: &dyn PlayerHandle) -> bool {
        self.store.reconcile(handle, self.queue.library().as_ref())
    }

    /// One progress tick: reconcile if the player is buffering or ready
    pub async fn poll_progress(self: Arc<Self>) {
        let engine = Arc::clone(&self);
        let polled = self
            .lane
            .run(move |slot| {
                let Some(handle) = slot.handle() else {
                    return;
                };
                match handle.status() {
                    Ok(status) if status.is_active() => {
                        engine.reconcile(handle.as_ref());
                    }
                    Ok(_) => {}
                    Err(e) => debug!("Progress poll skipped: {}", e),
                }
            })
            .await;

        if let Err(e) = polled {
            debug!("Progress poll dropped: {}", e);
        }
    }
}

/// Whether a missing handle is worth telling the user about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Advisory,
    UserVisible,
}

enum Outcome {
    Done,
    NoHandle,
    Failed(PulseError),
}

/// The playback engine's façade
///
/// Must be started inside a Tokio runtime. Dropping the controller cancels
/// its background work; [`release_player`](Self::release_player) also
/// releases the handle and waits for everything to stop.
pub struct PlaybackController {
    engine: Arc<Engine>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PlaybackController {
    /// Wire the engine to its collaborators and start the background lanes
    pub fn start(config: EngineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;

        let cancel = CancellationToken::new();
        let store = Arc::new(PlaybackStateStore::new(PlaybackState::with_speed(
            config.default_playback_speed,
        )));

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (lane, lane_task) = CommandLane::spawn(HandleSlot::new(events_tx), cancel.clone());

        let (analysis, analysis_task) = spawn_analysis(
            Arc::clone(&store),
            collaborators.visualizers,
            config.detector,
            config.analysis_frame_buffer,
            cancel.clone(),
        );

        let intent = collaborators.settings.playback_modes();
        debug!(
            "Intended modes from settings: repeat {}, shuffle {:?}",
            intent.repeat, intent.shuffle
        );

        let engine = Arc::new(Engine {
            tracker: ProgressTracker::new(config.progress_interval()),
            config,
            store,
            lane,
            queue: QueueManager::new(collaborators.library),
            settings: collaborators.settings,
            connector: Arc::new(SessionConnector::new()),
            analysis,
            intent: Mutex::new(intent),
            released: AtomicBool::new(false),
        });

        let tracker_task = {
            let engine_for_poll = Arc::clone(&engine);
            engine.tracker.spawn(
                move || Arc::clone(&engine_for_poll).poll_progress(),
                cancel.clone(),
            )
        };

        let (transitions_tx, transitions_rx) = mpsc::unbounded_channel();
        let session_task = engine.connector.spawn(
            collaborators.session.as_ref(),
            transitions_tx,
            cancel.clone(),
        );

        let driver_task = tokio::spawn(driver::run(
            Arc::clone(&engine),
            transitions_rx,
            events_rx,
            cancel.clone(),
        ));

        info!("Playback controller started");
        Ok(Self {
            engine,
            cancel,
            tasks: Mutex::new(vec![
                lane_task,
                analysis_task,
                tracker_task,
                session_task,
                driver_task,
            ]),
        })
    }

    // ===== Observation =====

    /// Current state snapshot
    pub fn state(&self) -> PlaybackState {
        self.engine.store.snapshot()
    }

    /// Latest-value stream of state snapshots
    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.engine.store.subscribe()
    }

    /// Latest-value stream of the session connection state
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.engine.connector.subscribe()
    }

    /// Snapshot of the shared playing queue
    pub fn queue(&self) -> Vec<TrackRef> {
        self.engine.queue.queue()
    }

    /// The user's intended repeat/shuffle modes
    pub fn intended_modes(&self) -> PlaybackModes {
        self.engine.intent()
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.engine.config
    }

    /// Whether [`release_player`](Self::release_player) has run
    pub fn is_released(&self) -> bool {
        self.engine.released.load(Ordering::Acquire)
    }

    // ===== Transport =====

    /// Toggle between playing and paused
    pub async fn play_pause(&self) {
        self.on_handle("play/pause", Visibility::Advisory, |handle| {
            if handle.is_playing()? {
                return handle.pause();
            }
            match handle.status()? {
                PlayerStatus::Idle => handle.prepare()?,
                PlayerStatus::Ended => handle.seek_to(0)?,
                PlayerStatus::Buffering | PlayerStatus::Ready => {}
            }
            handle.play()
        })
        .await;
    }

    /// Skip to the next item
    pub async fn skip_to_next(&self) {
        self.on_handle("skip to next", Visibility::Advisory, |handle| {
            handle.skip_to_next()
        })
        .await;
    }

    /// Skip to the previous item (or restart the current one)
    pub async fn skip_to_previous(&self) {
        self.on_handle("skip to previous", Visibility::Advisory, |handle| {
            handle.skip_to_previous()
        })
        .await;
    }

    // ===== Seeking =====

    /// Start a user scrub: reconciliation stops moving the position
    pub fn begin_seek(&self) {
        self.engine.store.update(|state| state.is_seeking = true);
    }

    /// Move the displayed position during a scrub
    pub fn update_seek_position(&self, position_ms: i64) {
        self.engine.store.update(|state| {
            state.is_seeking = true;
            state.position_ms = clamp_position(position_ms, state.duration_ms);
        });
    }

    /// Abandon a scrub without seeking
    pub async fn cancel_seek(&self) {
        self.engine.store.update(|state| state.is_seeking = false);
        self.refresh().await;
    }

    /// Seek within the current item, committing any scrub in progress
    pub async fn seek_to(&self, position_ms: i64) {
        let position_ms = position_ms.max(0);
        // Position is published by the reconcile that follows the seek
        self.engine.store.update(|state| state.is_seeking = false);
        self.on_handle("seek", Visibility::Advisory, move |handle| {
            handle.seek_to(position_ms)
        })
        .await;
    }

    // ===== Modes =====

    /// Set (and remember) the repeat mode
    pub async fn set_repeat_mode(&self, mode: RepeatMode) {
        self.remember(|intent| intent.repeat = mode);
        self.on_handle("set repeat mode", Visibility::Advisory, move |handle| {
            handle.set_repeat_mode(mode)
        })
        .await;
    }

    /// Set (and remember) the shuffle mode
    pub async fn set_shuffle_mode(&self, mode: ShuffleMode) {
        self.remember(|intent| intent.shuffle = mode);
        self.on_handle("set shuffle mode", Visibility::Advisory, move |handle| {
            handle.set_shuffle_enabled(mode.is_enabled())
        })
        .await;
    }

    /// Set the playback speed, clamped to the supported range
    pub async fn set_playback_speed(&self, speed: f32) {
        if !speed.is_finite() {
            warn!("Ignoring non-finite playback speed {}", speed);
            return;
        }
        let speed = speed.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED);
        self.on_handle("set playback speed", Visibility::Advisory, move |handle| {
            handle.set_playback_speed(speed)
        })
        .await;
    }

    // ===== Queue =====

    /// Play `track` within the playing queue (or the library when the queue
    /// is empty) with the given modes
    pub async fn initiate_playback(&self, track: TrackRef, repeat: RepeatMode, shuffle: ShuffleMode) {
        self.remember(|intent| {
            intent.repeat = repeat;
            intent.shuffle = shuffle;
        });
        let engine = Arc::clone(&self.engine);
        self.on_handle("start playback", Visibility::UserVisible, move |handle| {
            let mode = engine
                .queue
                .initiate_playback(handle, &track, repeat, shuffle)?;
            debug!("Playback of {} started ({:?})", track.id, mode);
            Ok(())
        })
        .await;
    }

    /// Make `tracks` the playing queue and play `start` with the intended modes
    pub async fn play_tracks(&self, tracks: Vec<TrackRef>, start: TrackRef) {
        if tracks.is_empty() {
            warn!("Nothing to play: empty track list");
            return;
        }
        let intent = self.engine.intent();
        let engine = Arc::clone(&self.engine);
        self.on_handle("start playback", Visibility::UserVisible, move |handle| {
            engine
                .queue
                .play_tracks(handle, tracks, &start, intent.repeat, intent.shuffle)
                .map(|_| ())
        })
        .await;
    }

    /// Enable shuffle and start `tracks` at a random member
    ///
    /// An empty list changes nothing.
    pub async fn initiate_shuffle_playback(&self, tracks: Vec<TrackRef>) {
        if tracks.is_empty() {
            warn!("Shuffle requested with nothing playable");
            return;
        }
        self.remember(|intent| intent.shuffle = ShuffleMode::On);
        let repeat = self.engine.intent().repeat;
        let engine = Arc::clone(&self.engine);
        self.on_handle("shuffle playback", Visibility::UserVisible, move |handle| {
            engine
                .queue
                .initiate_shuffle_playback(handle, tracks, repeat)
                .map(|_| ())
        })
        .await;
    }

    /// Insert `track` right after the current item ("play next")
    pub async fn add_audio_to_queue_next(&self, track: TrackRef) {
        let engine = Arc::clone(&self.engine);
        self.on_handle("add to queue", Visibility::UserVisible, move |handle| {
            let index = engine.queue.add_audio_to_queue_next(handle, &track)?;
            debug!("Queued {} at index {}", track.id, index);
            Ok(())
        })
        .await;
    }

    /// Remove every occurrence of `track` from the queue
    pub async fn remove_from_queue(&self, track: TrackRef) {
        self.remove("remove from queue", track).await;
    }

    /// A library file disappeared: drop it from the queue
    pub async fn on_audio_file_removed(&self, track: TrackRef) {
        info!("Audio file removed: {}", track.id);
        self.remove("drop removed file", track).await;
    }

    // ===== Errors and lifecycle =====

    /// Clear the sticky error
    pub fn clear_playback_error(&self) {
        self.engine.store.clear_error();
    }

    /// Force one reconciliation against the attached handle
    pub async fn refresh(&self) {
        self.on_handle("refresh", Visibility::Advisory, |_| Ok(())).await;
    }

    /// Tear everything down
    ///
    /// Releases the handle, stops every background lane and waits for them
    /// to finish. No state is published afterwards. Further operations are
    /// ignored.
    pub async fn release_player(&self) {
        if self.engine.released.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("Releasing playback controller");

        let released = self
            .engine
            .lane
            .run(|slot| {
                if let Some(handle) = slot.detach() {
                    handle.release();
                }
            })
            .await;
        if let Err(e) = released {
            debug!("Handle release skipped: {}", e);
        }

        self.engine.tracker.stop();
        self.engine.analysis.stop();
        self.cancel.cancel();
        self.engine.store.close();

        let tasks = std::mem::take(&mut *lock(&self.tasks));
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Background task ended abnormally: {}", e);
            }
        }
        info!("Playback controller released");
    }

    // ===== Internals =====

    /// Update the intended modes and persist them
    fn remember(&self, f: impl FnOnce(&mut PlaybackModes)) {
        let modes = {
            let mut intent = lock(&self.engine.intent);
            f(&mut intent);
            *intent
        };
        if let Err(e) = self.engine.settings.save_playback_modes(modes) {
            warn!("Failed to persist playback modes: {}", e);
        }
    }

    /// Run `f` against the handle on the command lane, then reconcile
    async fn on_handle<F>(&self, op: &'static str, visibility: Visibility, f: F)
    where
        F: FnOnce(&dyn PlayerHandle) -> pulse_core::Result<()> + Send + 'static,
    {
        if self.is_released() {
            debug!("{} ignored: {}", op, PlaybackError::Released);
            return;
        }

        let engine = Arc::clone(&self.engine);
        let outcome = self
            .engine
            .lane
            .run(move |slot| {
                let Some(handle) = slot.handle() else {
                    return Outcome::NoHandle;
                };
                let result = f(handle.as_ref());
                engine.reconcile(handle.as_ref());
                match result {
                    Ok(()) => Outcome::Done,
                    Err(e) => Outcome::Failed(e),
                }
            })
            .await;

        match outcome {
            Ok(Outcome::Done) => {}
            Ok(Outcome::NoHandle) => match visibility {
                Visibility::Advisory => debug!("{} ignored: {}", op, PlaybackError::NoHandle),
                Visibility::UserVisible => {
                    warn!("Cannot {}: {}", op, PlaybackError::NoHandle);
                    self.engine
                        .store
                        .set_error(format!("Cannot {op}: player not connected"));
                }
            },
            Ok(Outcome::Failed(e)) => self.surface(op, &e),
            Err(e) => debug!("{} ignored: {}", op, e),
        }
    }

    async fn remove(&self, op: &'static str, track: TrackRef) {
        if self.is_released() {
            debug!("{} ignored: {}", op, PlaybackError::Released);
            return;
        }

        let engine = Arc::clone(&self.engine);
        let outcome = self
            .engine
            .lane
            .run(move |slot| {
                let handle = slot.handle();
                let result = engine
                    .queue
                    .remove_from_queue(handle.as_deref(), &track);
                if let Some(handle) = &handle {
                    engine.reconcile(handle.as_ref());
                }
                result
            })
            .await;

        match outcome {
            Ok(Ok(removed)) => debug!("{}: {} player entries removed", op, removed),
            Ok(Err(e)) => self.surface(op, &e),
            Err(e) => debug!("{} ignored: {}", op, e),
        }
    }

    fn surface(&self, op: &str, e: &PulseError) {
        error!("Failed to {}: {}", op, e);
        self.engine.store.set_error(e.to_string());
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Clamp a scrub position to the known duration
fn clamp_position(position_ms: i64, duration_ms: i64) -> i64 {
    if duration_ms > 0 {
        position_ms.clamp(0, duration_ms)
    } else {
        position_ms.max(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
