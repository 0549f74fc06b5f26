//! Queue construction and editing against the player handle
//!
//! The player's item list and the shared playing queue are kept in step:
//! every edit is applied to both. All methods run on the command lane.
//!
//! "Play next" never suppresses duplicates: a track added twice plays
//! twice, and each insert lands right after the then-current item.

use crate::shuffle::pick_start_index;
use pulse_core::{
    LibrarySource, MediaItem, PlayerHandle, PlayerStatus, RepeatMode, Result, ShuffleMode,
    TrackRef,
};
use std::sync::Arc;
use tracing::{debug, info};

/// How a playback request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Same items, same position: just resumed
    Resumed,
    /// Same items, different position: jumped to the requested index
    Repositioned,
    /// Item list replaced and prepared
    Reloaded,
}

/// Queue operations over a handle and the shared queue source
pub struct QueueManager {
    library: Arc<dyn LibrarySource>,
}

impl QueueManager {
    /// Create a manager over the shared library/queue source
    pub fn new(library: Arc<dyn LibrarySource>) -> Self {
        Self { library }
    }

    /// The shared library/queue source
    pub fn library(&self) -> &Arc<dyn LibrarySource> {
        &self.library
    }

    /// Snapshot of the shared playing queue
    pub fn queue(&self) -> Vec<TrackRef> {
        self.library.playing_queue()
    }

    /// Start playing `track` within the intended set
    ///
    /// The intended set is the shared playing queue, or the full library
    /// when the queue is empty (which then becomes the queue). A track that
    /// is not in the set starts the set from index 0.
    pub fn initiate_playback(
        &self,
        handle: &dyn PlayerHandle,
        track: &TrackRef,
        repeat: RepeatMode,
        shuffle: ShuffleMode,
    ) -> Result<StartMode> {
        let mut targets = self.library.playing_queue();
        if targets.is_empty() {
            targets = self.library.library();
            if targets.is_empty() {
                targets = vec![track.clone()];
            }
            self.library.set_playing_queue(targets.clone());
        }

        let index = targets
            .iter()
            .position(|candidate| candidate.id == track.id)
            .unwrap_or(0);

        self.start_at(handle, &targets, index, repeat, shuffle)
    }

    /// Make `tracks` the playing queue and start at `start`
    pub fn play_tracks(
        &self,
        handle: &dyn PlayerHandle,
        tracks: Vec<TrackRef>,
        start: &TrackRef,
        repeat: RepeatMode,
        shuffle: ShuffleMode,
    ) -> Result<StartMode> {
        self.library.set_playing_queue(tracks);
        self.initiate_playback(handle, start, repeat, shuffle)
    }

    /// Enable shuffle, publish `tracks` as the queue and start at a random
    /// member
    ///
    /// Returns the chosen track, or `None` for an empty list (nothing is
    /// touched in that case).
    pub fn initiate_shuffle_playback(
        &self,
        handle: &dyn PlayerHandle,
        tracks: Vec<TrackRef>,
        repeat: RepeatMode,
    ) -> Result<Option<TrackRef>> {
        let Some(index) = pick_start_index(tracks.len()) else {
            return Ok(None);
        };

        let start = tracks[index].clone();
        self.library.set_playing_queue(tracks.clone());
        self.start_at(handle, &tracks, index, repeat, ShuffleMode::On)?;

        info!("Shuffle playback starting at {}", start.id);
        Ok(Some(start))
    }

    /// Insert `track` right after the current item
    ///
    /// Inserts at 0 when nothing is current or the list is empty, and
    /// starts playback when the insert makes the list non-empty. Returns
    /// the insertion index in the player's list.
    pub fn add_audio_to_queue_next(
        &self,
        handle: &dyn PlayerHandle,
        track: &TrackRef,
    ) -> Result<usize> {
        let items = handle.items()?;
        let current = handle.current_index()?;

        let index = match current {
            Some(current) if !items.is_empty() => (current + 1).min(items.len()),
            _ => 0,
        };
        handle.add_item(index, track.to_media_item())?;

        // Mirror into the shared queue after the same current track
        let current_item = current.and_then(|i| items.get(i));
        let mut queue = self.library.playing_queue();
        let queue_index = current_item
            .and_then(|item| queue.iter().position(|t| t.matches(item)))
            .map_or(index, |position| position + 1)
            .min(queue.len());
        queue.insert(queue_index, track.clone());
        self.library.set_playing_queue(queue);

        if items.is_empty() {
            debug!("Queue was empty; starting playback of {}", track.id);
            handle.prepare()?;
            handle.play()?;
        }

        Ok(index)
    }

    /// Remove every occurrence of `track` from the shared queue and, when
    /// attached, from the player's list
    ///
    /// Removing the current item leaves the player to auto-advance.
    /// Returns how many entries were removed from the player's list.
    pub fn remove_from_queue(
        &self,
        handle: Option<&dyn PlayerHandle>,
        track: &TrackRef,
    ) -> Result<usize> {
        let mut queue = self.library.playing_queue();
        let before = queue.len();
        queue.retain(|candidate| !track.same_track(candidate));
        if queue.len() != before {
            self.library.set_playing_queue(queue);
        }

        let Some(handle) = handle else {
            return Ok(0);
        };

        let items = handle.items()?;
        let mut removed = 0;
        // Back to front so earlier indices stay valid
        for (index, item) in items.iter().enumerate().rev() {
            if track.matches(item) {
                handle.remove_item(index)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn start_at(
        &self,
        handle: &dyn PlayerHandle,
        targets: &[TrackRef],
        index: usize,
        repeat: RepeatMode,
        shuffle: ShuffleMode,
    ) -> Result<StartMode> {
        handle.set_repeat_mode(repeat)?;
        handle.set_shuffle_enabled(shuffle.is_enabled())?;

        let loaded = handle.items()?;
        if same_identities(&loaded, targets) {
            let mode = if handle.current_index()? == Some(index) {
                StartMode::Resumed
            } else {
                handle.seek_to_item(index, 0)?;
                StartMode::Repositioned
            };
            if handle.status()? == PlayerStatus::Idle {
                handle.prepare()?;
            }
            handle.play()?;
            debug!("Playback {:?} at index {}", mode, index);
            return Ok(mode);
        }

        let items = targets.iter().map(TrackRef::to_media_item).collect();
        handle.set_items(items, index, 0)?;
        handle.prepare()?;
        handle.play()?;
        debug!("Loaded {} items, starting at index {}", targets.len(), index);
        Ok(StartMode::Reloaded)
    }
}

fn same_identities(loaded: &[MediaItem], targets: &[TrackRef]) -> bool {
    loaded.len() == targets.len()
        && loaded
            .iter()
            .zip(targets)
            .all(|(item, track)| item.media_id == track.id.as_str())
}
