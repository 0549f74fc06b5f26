//! Beat detector tests against synthesised spectra
//!
//! Frames are built the way a platform visualizer delivers them: a real
//! signal is transformed with an FFT and each bin is quantised to a signed
//! byte pair.

use proptest::prelude::*;
use pulse_analysis::{BeatDetector, DEFAULT_BPM};
use pulse_core::FftFrame;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

const FFT_SIZE: usize = 1024;
const SAMPLE_RATE: u32 = 44_100;

// ===== Helpers =====

/// Sine at exactly bin `bin`, quantised so amplitude 1.0 maps to magnitude 100
fn tone_frame(bin: usize, amplitude: f32) -> FftFrame {
    let mut buffer: Vec<Complex<f32>> = (0..FFT_SIZE)
        .map(|i| {
            let phase = 2.0 * PI * bin as f32 * i as f32 / FFT_SIZE as f32;
            Complex::new(amplitude * phase.sin(), 0.0)
        })
        .collect();

    let mut planner = FftPlanner::<f32>::new();
    planner.plan_fft_forward(FFT_SIZE).process(&mut buffer);

    let scale = 2.0 / FFT_SIZE as f32 * 100.0;
    let quantise = |x: f32| (x * scale).round().clamp(-128.0, 127.0) as i8 as u8;

    let data = buffer[..FFT_SIZE / 2]
        .iter()
        .flat_map(|c| [quantise(c.re), quantise(c.im)])
        .collect();

    FftFrame::new(data, SAMPLE_RATE)
}

/// Bin 2 is ~86 Hz at 44.1kHz / 1024
fn kick(amplitude: f32) -> FftFrame {
    tone_frame(2, amplitude)
}

/// Bin 46 is ~1.98 kHz, far outside the bass band
fn hi_hat(amplitude: f32) -> FftFrame {
    tone_frame(46, amplitude)
}

// ===== Scenario Tests =====

#[test]
fn synthesised_kick_lands_in_bass_bin() {
    let magnitudes = kick(0.5).magnitudes();
    assert_eq!(magnitudes.len(), FFT_SIZE / 2);
    assert!((magnitudes[2] - 50.0).abs() <= 1.0);
    assert_eq!(magnitudes[1], 0.0);
    assert_eq!(magnitudes[3], 0.0);
}

#[test]
fn treble_never_registers_as_bass() {
    let mut detector = BeatDetector::new();
    for _ in 0..50 {
        let intensity = detector.process_frame(&hi_hat(1.0));
        assert!(!detector.last_was_beat());
        assert_eq!(intensity, 0.0);
    }
    assert_eq!(detector.estimated_bpm(), DEFAULT_BPM);
}

#[test]
fn loud_kick_over_steady_bed_is_a_beat() {
    let mut detector = BeatDetector::new();

    // Fill the whole history with an identical bed
    for i in 0..40 {
        detector.detect_beat_at(&kick(0.5).magnitudes(), SAMPLE_RATE as f32, i * 20);
    }
    assert!(!detector.last_was_beat(), "steady bed must settle below threshold");

    detector.detect_beat_at(&kick(1.0).magnitudes(), SAMPLE_RATE as f32, 800);
    assert!(detector.last_was_beat());
    assert!(detector.intensity() > 0.0);
}

#[test]
fn kick_pattern_estimates_tempo() {
    let mut detector = BeatDetector::new();

    // Quiet kicks keep the energy variance small, so the silent frames
    // between them stay under a positive threshold
    let period_ms = 469;
    for beat in 0..12u64 {
        let t = beat * period_ms;
        detector.detect_beat_at(&kick(0.03).magnitudes(), SAMPLE_RATE as f32, t);
        assert!(detector.last_was_beat(), "kick at {t}ms");
        for k in 1..8u64 {
            detector.detect_beat_at(&hi_hat(0.3).magnitudes(), SAMPLE_RATE as f32, t + k * 40);
            assert!(!detector.last_was_beat());
        }
    }

    let bpm = detector.estimated_bpm();
    assert!((bpm - 60_000.0 / period_ms as f32).abs() < 0.01, "got {bpm}");
}

#[test]
fn stop_then_play_starts_clean() {
    let mut detector = BeatDetector::new();
    for i in 0..10 {
        detector.process_frame(&kick(1.0));
        detector.detect_beat_at(&kick(1.0).magnitudes(), SAMPLE_RATE as f32, i * 300);
    }
    assert!(detector.intensity() > 0.0);

    detector.reset();
    assert_eq!(detector.intensity(), 0.0);
    assert_eq!(detector.estimated_bpm(), DEFAULT_BPM);
    assert_eq!(detector.intervals().count(), 0);
}

// ===== Property Tests =====

fn arbitrary_frame() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(0.0f32..182.0, 1..256)
}

proptest! {
    /// Property: intensity is always finite and within [0, 1]
    #[test]
    fn intensity_stays_in_unit_range(
        frames in prop::collection::vec(arbitrary_frame(), 1..60),
        sample_rate in prop_oneof![Just(0.0f32), Just(-1.0f32), 8_000.0f32..96_000.0],
    ) {
        let mut detector = BeatDetector::new();
        for (i, frame) in frames.iter().enumerate() {
            let intensity = detector.detect_beat_at(frame, sample_rate, i as u64 * 23);
            prop_assert!(intensity.is_finite());
            prop_assert!((0.0..=1.0).contains(&intensity), "intensity {}", intensity);
        }
    }

    /// Property: tempo is always between 30 and 300 BPM
    #[test]
    fn tempo_stays_in_bounds(
        frames in prop::collection::vec(arbitrary_frame(), 1..80),
        gaps in prop::collection::vec(1u64..3000, 80),
    ) {
        let mut detector = BeatDetector::new();
        let mut t = 0u64;
        for (frame, gap) in frames.iter().zip(gaps.iter()) {
            t += gap;
            detector.detect_beat_at(frame, 44_100.0, t);
            let bpm = detector.estimated_bpm();
            prop_assert!((30.0..=300.0).contains(&bpm), "bpm {}", bpm);
            prop_assert!(detector.intervals().all(|i| (200..=2000).contains(&i)));
        }
    }

    /// Property: resetting twice is the same as resetting once
    #[test]
    fn reset_is_idempotent(frames in prop::collection::vec(arbitrary_frame(), 0..30)) {
        let mut detector = BeatDetector::new();
        for (i, frame) in frames.iter().enumerate() {
            detector.detect_beat_at(frame, 44_100.0, i as u64 * 250);
        }
        detector.reset();
        let once = detector.clone();
        detector.reset();
        prop_assert_eq!(detector, once);
    }
}
