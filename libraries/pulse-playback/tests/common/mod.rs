//! Shared rig for controller integration tests

#![allow(dead_code)]

use pulse_core::{
    LibrarySource, PlayerHandle, SessionProvider, SettingsStore, TrackRef, VisualizerFactory,
};
use pulse_playback::test_utils::{FakePlayer, FakeSession, FakeVisualizerFactory, MemorySettings};
use pulse_playback::{
    Collaborators, ConnectionState, EngineConfig, PlaybackController, SharedLibrary,
};
use std::sync::Arc;
use std::time::Duration;

pub fn track(id: &str) -> TrackRef {
    TrackRef::new(id, format!("content://media/{id}"), format!("Song {id}"))
        .with_artist("Test Artist")
        .with_duration_ms(200_000)
}

pub fn tracks(ids: &[&str]) -> Vec<TrackRef> {
    ids.iter().map(|id| track(id)).collect()
}

pub fn queue_ids(controller: &PlaybackController) -> Vec<String> {
    controller
        .queue()
        .iter()
        .map(|track| track.id.as_str().to_string())
        .collect()
}

pub fn item_ids(player: &FakePlayer) -> Vec<String> {
    player
        .items()
        .unwrap()
        .iter()
        .map(|item| item.media_id.clone())
        .collect()
}

/// Poll `condition` until it holds, failing the test after a few seconds
pub async fn eventually<F: FnMut() -> bool>(what: &str, mut condition: F) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for: {what}");
}

/// A controller wired to in-memory collaborators
pub struct Rig {
    pub controller: PlaybackController,
    pub session: Arc<FakeSession>,
    pub library: Arc<SharedLibrary>,
    pub settings: Arc<dyn SettingsStore>,
    pub visualizers: FakeVisualizerFactory,
}

impl Rig {
    pub fn start(library: Vec<TrackRef>) -> Self {
        Self::with_settings(library, Arc::new(MemorySettings::new()))
    }

    pub fn with_settings(library: Vec<TrackRef>, settings: Arc<dyn SettingsStore>) -> Self {
        Self::with_config(library, settings, EngineConfig::default())
    }

    pub fn with_config(
        library: Vec<TrackRef>,
        settings: Arc<dyn SettingsStore>,
        config: EngineConfig,
    ) -> Self {
        let session = Arc::new(FakeSession::new());
        let library = Arc::new(SharedLibrary::with_tracks(library));
        let visualizers = FakeVisualizerFactory::new();

        let controller = PlaybackController::start(
            config,
            Collaborators {
                session: Arc::clone(&session) as Arc<dyn SessionProvider>,
                library: Arc::clone(&library) as Arc<dyn LibrarySource>,
                settings: Arc::clone(&settings),
                visualizers: Arc::new(visualizers.clone()) as Arc<dyn VisualizerFactory>,
            },
        )
        .expect("controller starts");

        Self {
            controller,
            session,
            library,
            settings,
            visualizers,
        }
    }

    /// Connect `player` and wait until the controller has attached it
    pub async fn connect(&self, player: &Arc<FakePlayer>) {
        self.session
            .connect_player(Arc::clone(player) as Arc<dyn PlayerHandle>);
        self.wait_attached(player).await;
    }

    pub async fn wait_attached(&self, player: &Arc<FakePlayer>) {
        let connection = self.controller.connection_state();
        eventually("player attached", || {
            *connection.borrow() == ConnectionState::Connected && player.listener_count() == 1
        })
        .await;
        // Let the driver finish the rest of the connect sequence
        self.controller.refresh().await;
        tokio::task::yield_now().await;
    }
}
