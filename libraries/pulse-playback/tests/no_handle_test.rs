//! Operations before any player is connected
//!
//! Nothing may fail or panic. Advisory operations are silent; operations
//! the user would otherwise see fail report through `error`.

mod common;

use common::{track, tracks, Rig};
use pulse_core::{RepeatMode, ShuffleMode};
use pulse_playback::PlaybackState;

#[tokio::test]
async fn test_advisory_operations_are_silent() {
    let rig = Rig::start(tracks(&["a", "b"]));
    let c = &rig.controller;

    c.play_pause().await;
    c.skip_to_next().await;
    c.skip_to_previous().await;
    c.seek_to(10_000).await;
    c.set_playback_speed(2.0).await;
    c.set_repeat_mode(RepeatMode::One).await;
    c.set_shuffle_mode(ShuffleMode::On).await;
    c.remove_from_queue(track("a")).await;
    c.refresh().await;

    let state = c.state();
    assert_eq!(state.error, None);
    assert!(state.current_track.is_none());
    assert!(!state.is_playing);
}

#[tokio::test]
async fn test_seek_without_handle_leaves_position_alone() {
    let rig = Rig::start(tracks(&["a"]));

    rig.controller.begin_seek();
    rig.controller.update_seek_position(3_000);
    rig.controller.seek_to(7_000).await;

    let state = rig.controller.state();
    assert!(!state.is_seeking);
    assert_eq!(state.position_ms, 3_000);
    assert_eq!(state.error, None);

    rig.controller.seek_to(9_000).await;
    assert_eq!(rig.controller.state().position_ms, 3_000);
}

#[tokio::test]
async fn test_initiate_playback_reports_error() {
    let rig = Rig::start(tracks(&["a"]));

    rig.controller
        .initiate_playback(track("a"), RepeatMode::All, ShuffleMode::Off)
        .await;

    let error = rig.controller.state().error.expect("error surfaced");
    assert!(error.contains("not connected"));

    // Intent is still remembered for when a player shows up
    assert_eq!(rig.controller.intended_modes().repeat, RepeatMode::All);
}

#[tokio::test]
async fn test_shuffle_playback_reports_error() {
    let rig = Rig::start(tracks(&["a"]));

    rig.controller.initiate_shuffle_playback(tracks(&["a"])).await;
    assert!(rig.controller.state().error.is_some());

    rig.controller.clear_playback_error();
    assert_eq!(rig.controller.state(), PlaybackState::default());
}

#[tokio::test]
async fn test_release_without_handle() {
    let rig = Rig::start(tracks(&["a"]));

    rig.controller.release_player().await;
    assert!(rig.controller.is_released());

    rig.controller
        .initiate_playback(track("a"), RepeatMode::Off, ShuffleMode::Off)
        .await;
    assert_eq!(rig.controller.state().error, None);
}
