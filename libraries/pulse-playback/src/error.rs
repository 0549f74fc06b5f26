//! Error types for the playback engine

use pulse_core::PulseError;
use thiserror::Error;

/// Playback engine errors
///
/// Public controller operations absorb these (see [`PlaybackController`]);
/// they surface only from construction and configuration loading.
///
/// [`PlaybackController`]: crate::PlaybackController
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No player handle is attached
    #[error("No player handle attached")]
    NoHandle,

    /// The command lane has shut down
    #[error("Command lane closed")]
    LaneClosed,

    /// The controller was released
    #[error("Controller released")]
    Released,

    /// The player handle (or another collaborator) failed
    #[error(transparent)]
    Handle(#[from] PulseError),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for playback engine operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_errors_convert_transparently() {
        let err: PlaybackError = PulseError::player("decoder crashed").into();
        assert_eq!(err.to_string(), "Player error: decoder crashed");
    }
}
