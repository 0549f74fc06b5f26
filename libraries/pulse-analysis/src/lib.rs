//! Pulse Analysis
//!
//! Real-time signal analysis for visualizer effects.
//!
//! This crate provides:
//! - Bass-band beat detection with a variance-adaptive energy threshold
//! - Tempo (BPM) estimation from the median inter-beat interval
//! - A smoothed, self-normalising bass intensity in `[0, 1]`
//!
//! The detector is plain sequential state: it is fed one frame at a time
//! from a single delivery lane and needs no locking.
//!
//! # Example
//!
//! ```rust
//! use pulse_analysis::BeatDetector;
//! use pulse_core::FftFrame;
//!
//! let mut detector = BeatDetector::new();
//!
//! // 512 bins of silence at 44.1kHz
//! let frame = FftFrame::new(vec![0; 1024], 44_100);
//! let intensity = detector.process_frame(&frame);
//!
//! assert_eq!(intensity, 0.0);
//! assert_eq!(detector.estimated_bpm(), 120.0);
//! ```

#![forbid(unsafe_code)]

mod beat;

pub use beat::{BeatDetector, DetectorSettings, DEFAULT_BPM};
