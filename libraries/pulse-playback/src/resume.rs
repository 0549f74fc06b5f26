//! Resume on restart
//!
//! Remembers the last playback point through the settings store and
//! restores it once a player is connected.

use crate::config::EngineConfig;
use crate::controller::PlaybackController;
use crate::library::find_track;
use pulse_core::{LibrarySource, SavedPlayback, SettingsStore, TrackId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a resume attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// No playback point was saved
    NothingSaved,
    /// The saved track is no longer in the library
    TrackMissing,
    /// The player reached the saved track and seeked to the saved position
    Resumed { position_ms: i64 },
    /// The player never became ready; playback started from zero
    TimedOut,
}

/// Save/restore of the last playback point
pub struct ResumeWorkflow {
    settings: Arc<dyn SettingsStore>,
    library: Arc<dyn LibrarySource>,
    ready_timeout: Duration,
}

impl ResumeWorkflow {
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        library: Arc<dyn LibrarySource>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            settings,
            library,
            ready_timeout: config.resume_ready_timeout(),
        }
    }

    /// Persist the current track and position
    ///
    /// Returns `false` when nothing is playing or the store refused it.
    pub fn save(&self, controller: &PlaybackController) -> bool {
        let state = controller.state();
        let Some(track) = state.current_track else {
            debug!("Nothing to save: no current track");
            return false;
        };

        let saved = SavedPlayback {
            track_id: track.id,
            position_ms: state.position_ms,
        };
        match self.settings.save_last_playback(saved) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to save playback point: {}", e);
                false
            }
        }
    }

    /// Restart the saved track and seek to the saved position
    pub async fn resume(&self, controller: &PlaybackController) -> ResumeOutcome {
        let Some(saved) = self.settings.last_playback() else {
            return ResumeOutcome::NothingSaved;
        };
        let Some(track) = find_track(self.library.as_ref(), &saved.track_id) else {
            info!("Saved track {} is gone; not resuming", saved.track_id);
            return ResumeOutcome::TrackMissing;
        };

        let queue = self.library.playing_queue();
        if queue.is_empty() || queue.iter().any(|queued| queued.id == track.id) {
            let intent = controller.intended_modes();
            controller
                .initiate_playback(track, intent.repeat, intent.shuffle)
                .await;
        } else {
            debug!("Saved track {} is not queued; playing from the library", track.id);
            controller.play_tracks(self.library.library(), track).await;
        }

        if self.wait_until_ready(controller, &saved.track_id).await {
            controller.seek_to(saved.position_ms).await;
            info!(
                "Resumed {} at {}ms",
                saved.track_id, saved.position_ms
            );
            ResumeOutcome::Resumed {
                position_ms: saved.position_ms,
            }
        } else {
            warn!(
                "Player not ready after {:?}; starting {} from the beginning",
                self.ready_timeout, saved.track_id
            );
            controller.seek_to(0).await;
            ResumeOutcome::TimedOut
        }
    }

    async fn wait_until_ready(&self, controller: &PlaybackController, id: &TrackId) -> bool {
        let mut rx = controller.subscribe();
        let ready = rx.wait_for(|state| {
            !state.is_loading
                && state
                    .current_track
                    .as_ref()
                    .is_some_and(|track| &track.id == id)
        });

        let reached = matches!(tokio::time::timeout(self.ready_timeout, ready).await, Ok(Ok(_)));
        reached
    }
}
