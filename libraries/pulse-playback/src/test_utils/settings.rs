//! In-memory settings store

use pulse_core::{PlaybackModes, Result, SavedPlayback, SettingsStore};
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    modes: PlaybackModes,
    last: Option<SavedPlayback>,
    mode_saves: usize,
}

/// [`SettingsStore`] kept in memory
#[derive(Default)]
pub struct MemorySettings {
    inner: Mutex<Inner>,
}

impl MemorySettings {
    /// Empty settings (repeat off, shuffle off, nothing saved)
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings with the given intended modes
    pub fn with_modes(modes: PlaybackModes) -> Self {
        let settings = Self::default();
        settings.lock().modes = modes;
        settings
    }

    /// Settings with a saved playback point
    #[must_use]
    pub fn with_last_playback(self, saved: SavedPlayback) -> Self {
        self.lock().last = Some(saved);
        self
    }

    /// How many times the modes were saved
    pub fn mode_saves(&self) -> usize {
        self.lock().mode_saves
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SettingsStore for MemorySettings {
    fn playback_modes(&self) -> PlaybackModes {
        self.lock().modes
    }

    fn save_playback_modes(&self, modes: PlaybackModes) -> Result<()> {
        let mut inner = self.lock();
        inner.modes = modes;
        inner.mode_saves += 1;
        Ok(())
    }

    fn last_playback(&self) -> Option<SavedPlayback> {
        self.lock().last.clone()
    }

    fn save_last_playback(&self, saved: SavedPlayback) -> Result<()> {
        self.lock().last = Some(saved);
        Ok(())
    }
}
