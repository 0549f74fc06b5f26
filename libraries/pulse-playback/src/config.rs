//! Engine configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `PULSE_`
//! environment variables (`__` separates nested keys, e.g.
//! `PULSE_DETECTOR__BASS_HIGH_HZ=120`).

use crate::error::{PlaybackError, Result};
use pulse_analysis::DetectorSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Lowest playback speed accepted by the engine
pub const MIN_PLAYBACK_SPEED: f32 = 0.25;

/// Highest playback speed accepted by the engine
pub const MAX_PLAYBACK_SPEED: f32 = 4.0;

/// Tunables for the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Progress polling period in milliseconds
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// How long resume waits for the player to become ready
    #[serde(default = "default_resume_ready_timeout_ms")]
    pub resume_ready_timeout_ms: u64,

    /// Capacity of the FFT frame channel
    #[serde(default = "default_analysis_frame_buffer")]
    pub analysis_frame_buffer: usize,

    /// Speed published before the first reconciliation
    #[serde(default = "default_playback_speed")]
    pub default_playback_speed: f32,

    /// Beat detector tunables
    #[serde(default)]
    pub detector: DetectorSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval_ms(),
            resume_ready_timeout_ms: default_resume_ready_timeout_ms(),
            analysis_frame_buffer: default_analysis_frame_buffer(),
            default_playback_speed: default_playback_speed(),
            detector: DetectorSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            settings = settings.add_source(
                config::File::from(path.to_path_buf()).format(config::FileFormat::Toml),
            );
        }

        // Override with environment variables (prefixed with PULSE_)
        settings = settings.add_source(
            config::Environment::with_prefix("PULSE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        let engine: Self = config
            .try_deserialize()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        engine.validate()?;
        Ok(engine)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.progress_interval_ms == 0 {
            return Err(PlaybackError::Config(
                "progress_interval_ms must be positive".to_string(),
            ));
        }

        if self.analysis_frame_buffer == 0 {
            return Err(PlaybackError::Config(
                "analysis_frame_buffer must be positive".to_string(),
            ));
        }

        if !(MIN_PLAYBACK_SPEED..=MAX_PLAYBACK_SPEED).contains(&self.default_playback_speed) {
            return Err(PlaybackError::Config(format!(
                "default_playback_speed must be within {MIN_PLAYBACK_SPEED}..={MAX_PLAYBACK_SPEED} (got {})",
                self.default_playback_speed
            )));
        }

        self.detector
            .validate()
            .map_err(|e| PlaybackError::Config(e.to_string()))
    }

    /// Progress polling period
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    /// Resume wait bound
    pub fn resume_ready_timeout(&self) -> Duration {
        Duration::from_millis(self.resume_ready_timeout_ms)
    }
}

// Default values
fn default_progress_interval_ms() -> u64 {
    500
}

fn default_resume_ready_timeout_ms() -> u64 {
    10_000
}

fn default_analysis_frame_buffer() -> usize {
    4
}

fn default_playback_speed() -> f32 {
    1.0
}
