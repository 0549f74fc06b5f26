//! In-memory shared library/queue source
//!
//! Both lists are observable: the playlist layer and the engine publish
//! into `watch` channels and any number of readers follow the latest value.

use pulse_core::{LibrarySource, TrackId, TrackRef};
use tokio::sync::watch;

/// Observable "known tracks" and "playing queue" lists
#[derive(Debug)]
pub struct SharedLibrary {
    library: watch::Sender<Vec<TrackRef>>,
    queue: watch::Sender<Vec<TrackRef>>,
}

impl Default for SharedLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::with_tracks(Vec::new())
    }

    /// Create a library with known tracks and an empty queue
    pub fn with_tracks(tracks: Vec<TrackRef>) -> Self {
        let (library, _) = watch::channel(tracks);
        let (queue, _) = watch::channel(Vec::new());
        Self { library, queue }
    }

    /// Replace the known tracks
    pub fn set_library(&self, tracks: Vec<TrackRef>) {
        self.library.send_replace(tracks);
    }

    /// Look up a track by id, preferring the playing queue
    pub fn find(&self, id: &TrackId) -> Option<TrackRef> {
        find_track(self, id)
    }

    /// Follow the known tracks
    pub fn subscribe_library(&self) -> watch::Receiver<Vec<TrackRef>> {
        self.library.subscribe()
    }

    /// Follow the playing queue
    pub fn subscribe_queue(&self) -> watch::Receiver<Vec<TrackRef>> {
        self.queue.subscribe()
    }
}

impl LibrarySource for SharedLibrary {
    fn library(&self) -> Vec<TrackRef> {
        self.library.borrow().clone()
    }

    fn playing_queue(&self) -> Vec<TrackRef> {
        self.queue.borrow().clone()
    }

    fn set_playing_queue(&self, tracks: Vec<TrackRef>) {
        self.queue.send_replace(tracks);
    }
}

/// Find a track by id in any library source, preferring the playing queue
pub fn find_track(source: &dyn LibrarySource, id: &TrackId) -> Option<TrackRef> {
    source
        .playing_queue()
        .into_iter()
        .find(|track| &track.id == id)
        .or_else(|| source.library().into_iter().find(|track| &track.id == id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_and_library_are_independent() {
        let library = SharedLibrary::with_tracks(vec![TrackRef::new("1", "u1", "One")]);
        assert_eq!(library.library().len(), 1);
        assert!(library.playing_queue().is_empty());

        library.set_playing_queue(vec![TrackRef::new("2", "u2", "Two")]);
        assert_eq!(library.library().len(), 1);
        assert_eq!(library.playing_queue()[0].id.as_str(), "2");
    }

    #[test]
    fn find_prefers_queue_entry() {
        let library =
            SharedLibrary::with_tracks(vec![TrackRef::new("1", "u1", "Library title")]);
        library.set_playing_queue(vec![TrackRef::new("1", "u1", "Queue title")]);

        let found = library.find(&TrackId::new("1")).unwrap();
        assert_eq!(found.title, "Queue title");
        assert!(library.find(&TrackId::new("404")).is_none());
    }

    #[test]
    fn observers_see_queue_updates() {
        let library = SharedLibrary::new();
        let mut rx = library.subscribe_queue();

        library.set_playing_queue(vec![TrackRef::new("1", "u1", "One")]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
