//! Track and media item types
//!
//! `TrackRef` is what the engine publishes to observers; `MediaItem` is the
//! thinner record the platform player carries for each loaded entry.

use serde::{Deserialize, Serialize};

use super::ids::TrackId;

/// Title shown when neither the library nor the player knows one
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Artist shown when neither the library nor the player knows one
pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// Identity and display metadata for one playable item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRef {
    /// Library identity; also the media id handed to the player
    pub id: TrackId,

    /// Content URI of the audio file
    pub uri: String,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name (optional)
    pub album: Option<String>,

    /// Duration in milliseconds as known by the library (0 if unknown)
    pub duration_ms: i64,
}

impl TrackRef {
    /// Create a track with the given identity, URI and title
    pub fn new(id: impl Into<String>, uri: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(id),
            uri: uri.into(),
            title: title.into(),
            artist: UNKNOWN_ARTIST.to_string(),
            album: None,
            duration_ms: 0,
        }
    }

    /// Set the artist
    #[must_use]
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }

    /// Set the album
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the duration in milliseconds
    #[must_use]
    pub fn with_duration_ms(mut self, duration_ms: i64) -> Self {
        self.duration_ms = duration_ms.max(0);
        self
    }

    /// Build the player-side item for this track
    pub fn to_media_item(&self) -> MediaItem {
        MediaItem {
            media_id: self.id.as_str().to_string(),
            uri: Some(self.uri.clone()),
            title: Some(self.title.clone()),
            artist: Some(self.artist.clone()),
            album: self.album.clone(),
            duration_ms: Some(self.duration_ms),
        }
    }

    /// Derive minimal metadata from a player item that matched nothing in
    /// the library
    pub fn from_media_item(item: &MediaItem) -> Self {
        Self {
            id: TrackId::new(item.media_id.clone()),
            uri: item.uri.clone().unwrap_or_default(),
            title: item
                .title
                .clone()
                .unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            artist: item
                .artist
                .clone()
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: item.album.clone(),
            duration_ms: item.duration_ms.unwrap_or(0).max(0),
        }
    }

    /// Same track by id, or by a non-empty URI
    pub fn same_track(&self, other: &TrackRef) -> bool {
        self.id == other.id || (!self.uri.is_empty() && self.uri == other.uri)
    }

    /// Identity-or-URI match against a player item
    pub fn matches(&self, item: &MediaItem) -> bool {
        if self.id.as_str() == item.media_id {
            return true;
        }
        match &item.uri {
            Some(uri) => !uri.is_empty() && *uri == self.uri,
            None => false,
        }
    }
}

/// An entry in the platform player's item list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Media id (the library `TrackId` when the engine loaded it)
    pub media_id: String,

    /// Content URI, if the player exposes it
    pub uri: Option<String>,

    /// Title metadata carried by the player
    pub title: Option<String>,

    /// Artist metadata carried by the player
    pub artist: Option<String>,

    /// Album metadata carried by the player
    pub album: Option<String>,

    /// Duration metadata carried by the player
    pub duration_ms: Option<i64>,
}

impl MediaItem {
    /// An item with only a media id
    pub fn bare(media_id: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            uri: None,
            title: None,
            artist: None,
            album: None,
            duration_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_item_roundtrip_keeps_identity() {
        let track = TrackRef::new("7", "content://7", "Seven")
            .with_artist("Band")
            .with_duration_ms(1000);
        let item = track.to_media_item();
        assert_eq!(item.media_id, "7");
        assert_eq!(TrackRef::from_media_item(&item), track);
    }

    #[test]
    fn fallback_metadata_for_bare_item() {
        let track = TrackRef::from_media_item(&MediaItem::bare("x"));
        assert_eq!(track.title, UNKNOWN_TITLE);
        assert_eq!(track.artist, UNKNOWN_ARTIST);
        assert_eq!(track.duration_ms, 0);
    }

    #[test]
    fn matches_by_id_or_uri() {
        let track = TrackRef::new("1", "content://a", "A");

        assert!(track.matches(&MediaItem::bare("1")));

        let mut by_uri = MediaItem::bare("other");
        by_uri.uri = Some("content://a".to_string());
        assert!(track.matches(&by_uri));

        let mut empty_uri = MediaItem::bare("other");
        empty_uri.uri = Some(String::new());
        assert!(!TrackRef::new("1", "", "A").matches(&empty_uri));
    }

    #[test]
    fn same_track_uses_the_item_match_rule() {
        let track = TrackRef::new("1", "content://a", "A");
        let moved = TrackRef::new("99", "content://a", "A");

        assert!(track.same_track(&moved));
        assert_eq!(track.same_track(&moved), track.matches(&moved.to_media_item()));
        assert!(!TrackRef::new("1", "", "A").same_track(&TrackRef::new("2", "", "B")));
    }

    #[test]
    fn negative_duration_is_clamped() {
        let track = TrackRef::new("1", "u", "t").with_duration_ms(-5);
        assert_eq!(track.duration_ms, 0);
    }
}
