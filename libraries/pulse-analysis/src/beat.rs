//! Beat detection and tempo estimation
//!
//! Works on frequency-domain magnitudes restricted to a bass band:
//! 1. Band energy (mean squared magnitude) is compared against an adaptive
//!    threshold derived from the mean and variance of recent energies
//! 2. Detected beats feed a rolling list of inter-beat intervals whose
//!    median gives the tempo
//! 3. Band amplitude is normalised against a slowly decaying running max
//!    and smoothed into the published intensity

use pulse_core::{FftFrame, PulseError};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::Range;
use std::time::Instant;

/// Tempo reported before any interval has been measured
pub const DEFAULT_BPM: f32 = 120.0;

/// Median interval assumed when no interval has been accepted yet
const SENTINEL_INTERVAL_MS: u64 = 500;

/// Threshold coefficient `C = VARIANCE_SLOPE * variance + VARIANCE_OFFSET`
const VARIANCE_SLOPE: f32 = -0.002_571_4;
const VARIANCE_OFFSET: f32 = 1.514_285_7;

/// Per-frame decay of the running max amplitude
const MAX_AMPLITUDE_DECAY: f32 = 0.995;

/// Floor for the normalisation divisor
const MIN_NORMALISER: f32 = 1.0;

/// Weight of the previous smoothed intensity
const SMOOTHING_KEEP: f32 = 0.6;

/// Weight of the new normalised amplitude
const SMOOTHING_NEW: f32 = 0.4;

/// Beat detector settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    /// Lower edge of the bass band in Hz
    pub bass_low_hz: f32,
    /// Upper edge of the bass band in Hz
    pub bass_high_hz: f32,
    /// Number of energy samples in the history ring
    pub history_len: usize,
    /// Maximum number of inter-beat intervals kept
    pub max_intervals: usize,
    /// Shortest accepted inter-beat interval (300 BPM)
    pub min_interval_ms: u64,
    /// Longest accepted inter-beat interval (30 BPM)
    pub max_interval_ms: u64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            bass_low_hz: 50.0,
            bass_high_hz: 150.0,
            history_len: 20,
            max_intervals: 20,
            min_interval_ms: 200,
            max_interval_ms: 2000,
        }
    }
}

impl DetectorSettings {
    /// Validate settings
    pub fn validate(&self) -> pulse_core::Result<()> {
        if !(self.bass_low_hz >= 0.0 && self.bass_high_hz > self.bass_low_hz) {
            return Err(PulseError::Config(format!(
                "Bass band must satisfy 0 <= low < high (got {}..{} Hz)",
                self.bass_low_hz, self.bass_high_hz
            )));
        }
        if self.history_len == 0 {
            return Err(PulseError::Config(
                "Energy history length must be positive".to_string(),
            ));
        }
        if self.max_intervals == 0 {
            return Err(PulseError::Config(
                "Interval list capacity must be positive".to_string(),
            ));
        }
        if self.min_interval_ms > self.max_interval_ms {
            return Err(PulseError::Config(format!(
                "Interval range is inverted ({}..{} ms)",
                self.min_interval_ms, self.max_interval_ms
            )));
        }
        Ok(())
    }
}

/// Bass beat detector
///
/// Fed one frame at a time. State persists across frames within a playing
/// session and is cleared by [`reset`](Self::reset) whenever playback stops.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatDetector {
    settings: DetectorSettings,

    /// Circular buffer of recent band energies
    energy_history: Vec<f32>,
    /// Next slot to overwrite in `energy_history`
    history_index: usize,

    /// Timestamp of the last detected beat
    last_beat_ms: Option<u64>,
    /// Accepted inter-beat intervals, oldest first
    intervals: VecDeque<u64>,
    estimated_bpm: f32,

    /// Decaying running max of band amplitude
    max_amplitude: f32,
    smoothed_intensity: f32,

    /// Whether the last processed frame was a beat
    last_was_beat: bool,

    /// Origin for wall-clock timestamps
    epoch: Instant,
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl BeatDetector {
    /// Create a detector with default settings
    pub fn new() -> Self {
        Self::with_settings(DetectorSettings::default())
    }

    /// Create a detector with specific settings
    ///
    /// Zero capacities are raised to one so the ring and interval list are
    /// always usable; call [`DetectorSettings::validate`] to reject them
    /// instead.
    pub fn with_settings(settings: DetectorSettings) -> Self {
        let settings = DetectorSettings {
            history_len: settings.history_len.max(1),
            max_intervals: settings.max_intervals.max(1),
            ..settings
        };

        Self {
            settings,
            energy_history: vec![0.0; settings.history_len],
            history_index: 0,
            last_beat_ms: None,
            intervals: VecDeque::with_capacity(settings.max_intervals),
            estimated_bpm: DEFAULT_BPM,
            max_amplitude: 0.0,
            smoothed_intensity: 0.0,
            last_was_beat: false,
            epoch: Instant::now(),
        }
    }

    /// Settings in use
    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Analyse one captured frame using the wall clock for beat timing
    pub fn process_frame(&mut self, frame: &FftFrame) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let sample_rate_hz = frame.sample_rate_hz as f32;
        self.detect_beat(&frame.magnitudes(), sample_rate_hz)
    }

    /// Analyse one frame of bin magnitudes using the wall clock for beat timing
    ///
    /// Returns the smoothed bass intensity in `[0, 1]`.
    pub fn detect_beat(&mut self, magnitudes: &[f32], sample_rate_hz: f32) -> f32 {
        let now_ms = u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.detect_beat_at(magnitudes, sample_rate_hz, now_ms)
    }

    /// Analyse one frame of bin magnitudes captured at `timestamp_ms`
    ///
    /// `magnitudes` holds one value per bin; the FFT size used for the
    /// bin width is twice its length. Returns the smoothed bass intensity
    /// in `[0, 1]`. An empty frame leaves all state untouched.
    pub fn detect_beat_at(
        &mut self,
        magnitudes: &[f32],
        sample_rate_hz: f32,
        timestamp_ms: u64,
    ) -> f32 {
        if magnitudes.is_empty() {
            return self.smoothed_intensity;
        }

        let band = &magnitudes[self.bass_band(magnitudes.len(), sample_rate_hz)];
        #[allow(clippy::cast_precision_loss)]
        let bins = band.len() as f32;
        let current_energy = band.iter().map(|m| m * m).sum::<f32>() / bins;
        let current_amplitude = band.iter().sum::<f32>() / bins;

        // Threshold from the history as it was before this frame
        let is_beat = current_energy > self.beat_threshold();

        self.energy_history[self.history_index] = current_energy;
        self.history_index = (self.history_index + 1) % self.energy_history.len();

        if is_beat {
            self.record_beat(timestamp_ms);
        }
        self.last_was_beat = is_beat;

        self.max_amplitude = (self.max_amplitude * MAX_AMPLITUDE_DECAY).max(current_amplitude);
        let normalised = current_amplitude / self.max_amplitude.max(MIN_NORMALISER);
        self.smoothed_intensity =
            (SMOOTHING_KEEP * self.smoothed_intensity + SMOOTHING_NEW * normalised).clamp(0.0, 1.0);

        self.smoothed_intensity
    }

    /// Energy a frame must exceed to count as a beat, given the current history
    pub fn beat_threshold(&self) -> f32 {
        let (mean, variance) = self.history_stats();
        (VARIANCE_SLOPE * variance + VARIANCE_OFFSET) * mean
    }

    /// Current tempo estimate
    pub fn estimated_bpm(&self) -> f32 {
        self.estimated_bpm
    }

    /// Current smoothed intensity
    pub fn intensity(&self) -> f32 {
        self.smoothed_intensity
    }

    /// Whether the last processed frame was a beat
    pub fn last_was_beat(&self) -> bool {
        self.last_was_beat
    }

    /// Accepted inter-beat intervals, oldest first
    pub fn intervals(&self) -> impl Iterator<Item = u64> + '_ {
        self.intervals.iter().copied()
    }

    /// Clear all state: history, beat timing, intervals, tempo, normaliser
    pub fn reset(&mut self) {
        self.energy_history.iter_mut().for_each(|e| *e = 0.0);
        self.history_index = 0;
        self.last_beat_ms = None;
        self.intervals.clear();
        self.estimated_bpm = DEFAULT_BPM;
        self.max_amplitude = 0.0;
        self.smoothed_intensity = 0.0;
        self.last_was_beat = false;
    }

    /// Bin range covering the bass band, never empty
    fn bass_band(&self, bins: usize, sample_rate_hz: f32) -> Range<usize> {
        #[allow(clippy::cast_precision_loss)]
        let fft_size = (bins * 2) as f32;
        let bin_width = sample_rate_hz / fft_size;
        if !(bin_width.is_finite() && bin_width > 0.0) {
            return 0..1;
        }

        let last = bins - 1;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let to_bin = |hz: f32| ((hz / bin_width) as usize).min(last);

        let low = to_bin(self.settings.bass_low_hz);
        let high = to_bin(self.settings.bass_high_hz).max(low);
        low..high + 1
    }

    fn history_stats(&self) -> (f32, f32) {
        #[allow(clippy::cast_precision_loss)]
        let n = self.energy_history.len() as f32;
        let mean = self.energy_history.iter().sum::<f32>() / n;
        let variance = self
            .energy_history
            .iter()
            .map(|e| (e - mean) * (e - mean))
            .sum::<f32>()
            / n;
        (mean, variance)
    }

    fn record_beat(&mut self, timestamp_ms: u64) {
        if let Some(last) = self.last_beat_ms {
            let interval = timestamp_ms.saturating_sub(last);
            if (self.settings.min_interval_ms..=self.settings.max_interval_ms).contains(&interval) {
                if self.intervals.len() >= self.settings.max_intervals {
                    self.intervals.pop_front();
                }
                self.intervals.push_back(interval);
                #[allow(clippy::cast_precision_loss)]
                let median = self.median_interval_ms() as f32;
                self.estimated_bpm = 60_000.0 / median;
            }
        }
        self.last_beat_ms = Some(timestamp_ms);
    }

    /// Upper median of the accepted intervals
    fn median_interval_ms(&self) -> u64 {
        if self.intervals.is_empty() {
            return SENTINEL_INTERVAL_MS;
        }
        let mut sorted: Vec<u64> = self.intervals.iter().copied().collect();
        sorted.sort_unstable();
        sorted[sorted.len() / 2].max(1)
    }
}
