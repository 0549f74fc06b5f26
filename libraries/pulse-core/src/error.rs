/// Core error types for the Pulse playback engine
use thiserror::Error;

/// Result type alias using `PulseError`
pub type Result<T> = std::result::Result<T, PulseError>;

/// Core error type shared by every collaborator boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PulseError {
    /// The player handle has gone away (session released or replaced)
    #[error("Player handle unavailable")]
    HandleUnavailable,

    /// The platform player rejected or failed an operation
    #[error("Player error: {0}")]
    Player(String),

    /// Media session connection errors
    #[error("Session error: {0}")]
    Session(String),

    /// Visualizer / analysis pipeline errors
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Settings persistence errors
    #[error("Settings error: {0}")]
    Settings(String),

    /// Entity not found
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl PulseError {
    /// Create a player error
    pub fn player(msg: impl Into<String>) -> Self {
        Self::Player(msg.into())
    }

    /// Create a session error
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// Create an analysis error
    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    /// Create a settings error
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::Settings(msg.into())
    }

    /// Create a not found error
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the error means the handle itself is gone rather than the
    /// operation failing on a live handle
    pub fn is_handle_lost(&self) -> bool {
        matches!(self, Self::HandleUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_entity_and_id() {
        let err = PulseError::not_found("Track", "42");
        assert_eq!(err.to_string(), "Track not found: 42");
    }

    #[test]
    fn handle_lost_only_for_unavailable() {
        assert!(PulseError::HandleUnavailable.is_handle_lost());
        assert!(!PulseError::player("boom").is_handle_lost());
    }
}
