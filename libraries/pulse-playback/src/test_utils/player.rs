//! In-memory player handle
//!
//! Behaves like a platform player closely enough for engine tests:
//! an item list with a current index, transport flags, modes, listeners
//! notified synchronously, and switchable failure injection.

use pulse_core::{
    ListenerId, MediaItem, PlayerEvent, PlayerHandle, PlayerListener, PlayerStatus, PulseError,
    RepeatMode, Result,
};
use std::sync::{Mutex, MutexGuard};

/// `skip_to_previous` restarts the current item past this position
const RESTART_THRESHOLD_MS: i64 = 3_000;

#[derive(Default)]
struct Inner {
    items: Vec<MediaItem>,
    current: Option<usize>,
    position_ms: i64,
    buffered_position_ms: i64,
    duration_override: Option<i64>,
    playing: bool,
    play_when_ready: bool,
    status: PlayerStatus,
    repeat: RepeatMode,
    shuffle: bool,
    speed: f32,
    audio_session_id: i32,
    buffer_on_prepare: bool,
    listeners: Vec<(ListenerId, PlayerListener)>,
    next_listener: u64,
    failure: Option<PulseError>,
    released: bool,
    calls: Vec<String>,
}

/// Fake [`PlayerHandle`]
pub struct FakePlayer {
    inner: Mutex<Inner>,
}

impl Default for FakePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePlayer {
    /// Empty, idle player with audio session id `0` (unset)
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                speed: 1.0,
                ..Inner::default()
            }),
        }
    }

    /// Report `id` as the audio session
    #[must_use]
    pub fn with_audio_session_id(self, id: i32) -> Self {
        self.lock().audio_session_id = id;
        self
    }

    /// Stay in `Buffering` after `prepare` until [`finish_buffering`] is called
    ///
    /// [`finish_buffering`]: Self::finish_buffering
    #[must_use]
    pub fn buffering_on_prepare(self) -> Self {
        self.lock().buffer_on_prepare = true;
        self
    }

    // ===== Test controls =====

    /// Override the reported duration (negative means unknown)
    pub fn set_duration_ms(&self, duration_ms: i64) {
        self.lock().duration_override = Some(duration_ms);
    }

    /// Move the position without a seek call (playback progressing)
    pub fn advance_ms(&self, delta_ms: i64) {
        let mut inner = self.lock();
        inner.position_ms += delta_ms;
        inner.buffered_position_ms = inner.buffered_position_ms.max(inner.position_ms);
    }

    /// Change the reported audio session id
    pub fn set_audio_session_id(&self, id: i32) {
        self.lock().audio_session_id = id;
    }

    /// Leave `Buffering`, start playing if `play` was requested, and
    /// notify listeners
    pub fn finish_buffering(&self) {
        let start = {
            let mut inner = self.lock();
            if inner.status != PlayerStatus::Buffering {
                return;
            }
            inner.status = PlayerStatus::Ready;
            inner.play_when_ready && inner.current.is_some()
        };
        self.emit(PlayerEvent::StatusChanged(PlayerStatus::Ready));
        if start {
            self.set_playing(self.lock(), true);
        }
    }

    /// Make every fallible call fail with `failure` (or succeed again with `None`)
    pub fn fail_with(&self, failure: Option<PulseError>) {
        self.lock().failure = failure;
    }

    /// Deliver `event` to every listener
    pub fn emit(&self, event: PlayerEvent) {
        let listeners: Vec<PlayerListener> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event.clone());
        }
    }

    /// Number of attached listeners
    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Whether `release` was called
    pub fn is_released(&self) -> bool {
        self.lock().released
    }

    /// Names of mutating calls received, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    // ===== Internals =====

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Lock for a fallible call, failing if released or failure is injected
    fn checked(&self) -> Result<MutexGuard<'_, Inner>> {
        let inner = self.lock();
        if inner.released {
            return Err(PulseError::HandleUnavailable);
        }
        if let Some(failure) = &inner.failure {
            return Err(failure.clone());
        }
        Ok(inner)
    }

    /// Lock for a mutating call and record it
    fn mutate(&self, name: &str) -> Result<MutexGuard<'_, Inner>> {
        let mut inner = self.checked()?;
        inner.calls.push(name.to_string());
        Ok(inner)
    }

    fn set_playing(&self, mut inner: MutexGuard<'_, Inner>, playing: bool) {
        let changed = inner.playing != playing;
        inner.playing = playing;
        drop(inner);
        if changed {
            self.emit(PlayerEvent::IsPlayingChanged(playing));
        }
    }

    fn transition(&self, inner: MutexGuard<'_, Inner>) {
        let media_id = inner
            .current
            .and_then(|i| inner.items.get(i))
            .map(|item| item.media_id.clone());
        drop(inner);
        self.emit(PlayerEvent::MediaItemTransition { media_id });
    }
}

impl PlayerHandle for FakePlayer {
    fn play(&self) -> Result<()> {
        let mut inner = self.mutate("play")?;
        inner.play_when_ready = true;
        let can_play = inner.status == PlayerStatus::Ready && inner.current.is_some();
        if can_play {
            self.set_playing(inner, true);
        }
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        let mut inner = self.mutate("pause")?;
        inner.play_when_ready = false;
        self.set_playing(inner, false);
        Ok(())
    }

    fn prepare(&self) -> Result<()> {
        let status = {
            let mut inner = self.mutate("prepare")?;
            inner.status = if inner.items.is_empty() {
                PlayerStatus::Ended
            } else if inner.buffer_on_prepare {
                PlayerStatus::Buffering
            } else {
                PlayerStatus::Ready
            };
            inner.status
        };
        self.emit(PlayerEvent::StatusChanged(status));
        Ok(())
    }

    fn seek_to(&self, position_ms: i64) -> Result<()> {
        {
            let mut inner = self.mutate("seek_to")?;
            inner.position_ms = position_ms.max(0);
        }
        self.emit(PlayerEvent::PositionDiscontinuity);
        Ok(())
    }

    fn seek_to_item(&self, index: usize, position_ms: i64) -> Result<()> {
        let mut inner = self.mutate("seek_to_item")?;
        if index >= inner.items.len() {
            return Err(PulseError::invalid_input(format!(
                "Item index {index} out of range"
            )));
        }
        inner.current = Some(index);
        inner.position_ms = position_ms.max(0);
        self.transition(inner);
        Ok(())
    }

    fn skip_to_next(&self) -> Result<()> {
        let mut inner = self.mutate("skip_to_next")?;
        let len = inner.items.len();
        let next = match inner.current {
            Some(current) if current + 1 < len => Some(current + 1),
            Some(_) if inner.repeat == RepeatMode::All && len > 0 => Some(0),
            _ => None,
        };
        if let Some(next) = next {
            inner.current = Some(next);
            inner.position_ms = 0;
            self.transition(inner);
        }
        Ok(())
    }

    fn skip_to_previous(&self) -> Result<()> {
        let mut inner = self.mutate("skip_to_previous")?;
        let current = inner.current;
        match current {
            Some(current) if inner.position_ms <= RESTART_THRESHOLD_MS && current > 0 => {
                inner.current = Some(current - 1);
                inner.position_ms = 0;
                self.transition(inner);
            }
            _ => inner.position_ms = 0,
        }
        Ok(())
    }

    fn set_items(
        &self,
        items: Vec<MediaItem>,
        start_index: usize,
        start_position_ms: i64,
    ) -> Result<()> {
        let mut inner = self.mutate("set_items")?;
        inner.current = if items.is_empty() {
            None
        } else {
            Some(start_index.min(items.len() - 1))
        };
        inner.items = items;
        inner.position_ms = start_position_ms.max(0);
        inner.buffered_position_ms = inner.position_ms;
        inner.status = PlayerStatus::Idle;
        self.set_playing(inner, false);
        self.emit(PlayerEvent::TimelineChanged);
        Ok(())
    }

    fn add_item(&self, index: usize, item: MediaItem) -> Result<()> {
        {
            let mut inner = self.mutate("add_item")?;
            let index = index.min(inner.items.len());
            inner.items.insert(index, item);
            inner.current = match inner.current {
                Some(current) if index <= current => Some(current + 1),
                Some(current) => Some(current),
                None => Some(0),
            };
        }
        self.emit(PlayerEvent::TimelineChanged);
        Ok(())
    }

    fn remove_item(&self, index: usize) -> Result<()> {
        let (stopped, transitioned) = {
            let mut inner = self.mutate("remove_item")?;
            if index >= inner.items.len() {
                return Err(PulseError::invalid_input(format!(
                    "Item index {index} out of range"
                )));
            }
            inner.items.remove(index);
            let len = inner.items.len();

            let mut stopped = false;
            let mut transitioned = None;
            let current = inner.current;
            match current {
                Some(_) if len == 0 => {
                    inner.current = None;
                    inner.position_ms = 0;
                    inner.status = PlayerStatus::Idle;
                    stopped = inner.playing;
                    inner.playing = false;
                }
                Some(current) if index < current => inner.current = Some(current - 1),
                Some(current) if index == current => {
                    // Auto-advance: the next item slides into place
                    let current = if current >= len {
                        inner.status = PlayerStatus::Ended;
                        len - 1
                    } else {
                        current
                    };
                    inner.current = Some(current);
                    inner.position_ms = 0;
                    transitioned = Some(inner.items[current].media_id.clone());
                }
                _ => {}
            }
            (stopped, transitioned)
        };

        if stopped {
            self.emit(PlayerEvent::IsPlayingChanged(false));
        }
        if let Some(media_id) = transitioned {
            self.emit(PlayerEvent::MediaItemTransition {
                media_id: Some(media_id),
            });
        }
        self.emit(PlayerEvent::TimelineChanged);
        Ok(())
    }

    fn items(&self) -> Result<Vec<MediaItem>> {
        Ok(self.checked()?.items.clone())
    }

    fn current_index(&self) -> Result<Option<usize>> {
        Ok(self.checked()?.current)
    }

    fn current_item(&self) -> Result<Option<MediaItem>> {
        let inner = self.checked()?;
        Ok(inner.current.and_then(|i| inner.items.get(i)).cloned())
    }

    fn position_ms(&self) -> Result<i64> {
        Ok(self.checked()?.position_ms)
    }

    fn duration_ms(&self) -> Result<i64> {
        let inner = self.checked()?;
        if let Some(duration) = inner.duration_override {
            return Ok(duration);
        }
        Ok(inner
            .current
            .and_then(|i| inner.items.get(i))
            .and_then(|item| item.duration_ms)
            .filter(|duration| *duration > 0)
            .unwrap_or(-1))
    }

    fn buffered_position_ms(&self) -> Result<i64> {
        Ok(self.checked()?.buffered_position_ms)
    }

    fn is_playing(&self) -> Result<bool> {
        Ok(self.checked()?.playing)
    }

    fn status(&self) -> Result<PlayerStatus> {
        Ok(self.checked()?.status)
    }

    fn repeat_mode(&self) -> Result<RepeatMode> {
        Ok(self.checked()?.repeat)
    }

    fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        {
            let mut inner = self.mutate("set_repeat_mode")?;
            inner.repeat = mode;
        }
        self.emit(PlayerEvent::RepeatModeChanged);
        Ok(())
    }

    fn shuffle_enabled(&self) -> Result<bool> {
        Ok(self.checked()?.shuffle)
    }

    fn set_shuffle_enabled(&self, enabled: bool) -> Result<()> {
        {
            let mut inner = self.mutate("set_shuffle_enabled")?;
            inner.shuffle = enabled;
        }
        self.emit(PlayerEvent::ShuffleModeChanged);
        Ok(())
    }

    fn playback_speed(&self) -> Result<f32> {
        Ok(self.checked()?.speed)
    }

    fn set_playback_speed(&self, speed: f32) -> Result<()> {
        {
            let mut inner = self.mutate("set_playback_speed")?;
            inner.speed = speed;
        }
        self.emit(PlayerEvent::PlaybackSpeedChanged);
        Ok(())
    }

    fn audio_session_id(&self) -> Result<i32> {
        Ok(self.checked()?.audio_session_id)
    }

    fn add_listener(&self, listener: PlayerListener) -> ListenerId {
        let mut inner = self.lock();
        inner.next_listener += 1;
        let id = ListenerId(inner.next_listener);
        inner.listeners.push((id, listener));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.lock().listeners.retain(|(existing, _)| *existing != id);
    }

    fn release(&self) {
        let mut inner = self.lock();
        inner.calls.push("release".to_string());
        inner.released = true;
        inner.playing = false;
        inner.listeners.clear();
    }
}
