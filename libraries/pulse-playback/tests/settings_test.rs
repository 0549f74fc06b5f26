//! Settings persistence tests
//!
//! The settings store is mocked so each test pins down exactly which
//! reads and writes the controller performs.

mod common;

use common::{tracks, Rig};
use mockall::mock;
use mockall::predicate::eq;
use pulse_core::{
    LibrarySource, PlaybackModes, PlayerHandle, PulseError, RepeatMode, SavedPlayback,
    SettingsStore, ShuffleMode,
};
use pulse_playback::test_utils::FakePlayer;
use pulse_playback::ResumeWorkflow;
use std::sync::Arc;

mock! {
    pub Settings {}

    impl SettingsStore for Settings {
        fn playback_modes(&self) -> PlaybackModes;
        fn save_playback_modes(&self, modes: PlaybackModes) -> pulse_core::Result<()>;
        fn last_playback(&self) -> Option<SavedPlayback>;
        fn save_last_playback(&self, saved: SavedPlayback) -> pulse_core::Result<()>;
    }
}

fn modes(repeat: RepeatMode, shuffle: ShuffleMode) -> PlaybackModes {
    PlaybackModes { repeat, shuffle }
}

fn settings_with(initial: PlaybackModes) -> MockSettings {
    let mut settings = MockSettings::new();
    settings
        .expect_playback_modes()
        .times(1)
        .return_const(initial);
    settings
}

#[tokio::test]
async fn test_intent_seeded_from_settings() {
    let settings = settings_with(modes(RepeatMode::One, ShuffleMode::On));
    let rig = Rig::with_settings(tracks(&["a"]), Arc::new(settings));
    assert_eq!(
        rig.controller.intended_modes(),
        modes(RepeatMode::One, ShuffleMode::On)
    );

    let player = Arc::new(FakePlayer::new());
    rig.connect(&player).await;
    assert_eq!(player.repeat_mode().unwrap(), RepeatMode::One);
    assert!(player.shuffle_enabled().unwrap());

    rig.controller.release_player().await;
}

#[tokio::test]
async fn test_mode_changes_are_persisted() {
    let mut settings = settings_with(PlaybackModes::default());
    settings
        .expect_save_playback_modes()
        .with(eq(modes(RepeatMode::All, ShuffleMode::Off)))
        .times(1)
        .returning(|_| Ok(()));
    settings
        .expect_save_playback_modes()
        .with(eq(modes(RepeatMode::All, ShuffleMode::On)))
        .times(1)
        .returning(|_| Ok(()));

    let rig = Rig::with_settings(tracks(&["a"]), Arc::new(settings));
    rig.controller.set_repeat_mode(RepeatMode::All).await;
    rig.controller.set_shuffle_mode(ShuffleMode::On).await;

    rig.controller.release_player().await;
}

#[tokio::test]
async fn test_failed_persist_still_applies_mode() {
    let mut settings = settings_with(PlaybackModes::default());
    settings
        .expect_save_playback_modes()
        .times(1)
        .returning(|_| Err(PulseError::settings("disk full")));

    let rig = Rig::with_settings(tracks(&["a"]), Arc::new(settings));
    let player = Arc::new(FakePlayer::new());
    rig.connect(&player).await;

    rig.controller.set_repeat_mode(RepeatMode::One).await;

    assert_eq!(player.repeat_mode().unwrap(), RepeatMode::One);
    assert_eq!(rig.controller.state().repeat_mode, RepeatMode::One);
    assert_eq!(rig.controller.state().error, None);

    rig.controller.release_player().await;
}

#[tokio::test]
async fn test_shuffle_playback_persists_shuffle_on() {
    let mut settings = settings_with(modes(RepeatMode::All, ShuffleMode::Off));
    settings
        .expect_save_playback_modes()
        .with(eq(modes(RepeatMode::All, ShuffleMode::On)))
        .times(1)
        .returning(|_| Ok(()));

    let rig = Rig::with_settings(tracks(&["a", "b"]), Arc::new(settings));
    let player = Arc::new(FakePlayer::new());
    rig.connect(&player).await;

    rig.controller
        .initiate_shuffle_playback(tracks(&["a", "b"]))
        .await;
    assert_eq!(player.repeat_mode().unwrap(), RepeatMode::All);

    rig.controller.release_player().await;
}

#[tokio::test]
async fn test_failed_resume_save_reports_false() {
    let mut settings = settings_with(PlaybackModes::default());
    settings
        .expect_save_playback_modes()
        .returning(|_| Ok(()));
    settings
        .expect_save_last_playback()
        .times(1)
        .returning(|_| Err(PulseError::settings("read-only")));
    let settings = Arc::new(settings);

    let rig = Rig::with_settings(tracks(&["a"]), settings.clone());
    let player = Arc::new(FakePlayer::new());
    rig.connect(&player).await;
    rig.controller
        .initiate_playback(common::track("a"), RepeatMode::Off, ShuffleMode::Off)
        .await;

    let workflow = ResumeWorkflow::new(
        settings as Arc<dyn SettingsStore>,
        Arc::clone(&rig.library) as Arc<dyn LibrarySource>,
        rig.controller.config(),
    );
    assert!(!workflow.save(&rig.controller));

    rig.controller.release_player().await;
}
