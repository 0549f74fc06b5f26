//! Analysis lane
//!
//! A single task owns the beat detector and the active frequency capture.
//! The capture's callback only pushes frames into a bounded channel
//! (dropping them when it is full); detection and publication happen here,
//! one frame at a time, so the detector needs no locking.

use crate::store::PlaybackStateStore;
use pulse_analysis::{BeatDetector, DetectorSettings};
use pulse_core::{FftFrame, Visualizer, VisualizerFactory};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Control messages for the analysis lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AnalysisCommand {
    /// Tear down any capture and start one on this audio session
    Start { audio_session_id: i32, enabled: bool },
    /// Resume frame delivery with a clean detector
    Enable,
    /// Pause frame delivery, reset the detector and zero the outputs
    Disable,
    /// Release the capture and reset the detector
    Stop,
}

/// Sender side of the analysis lane
#[derive(Clone)]
pub(crate) struct AnalysisHandle {
    tx: mpsc::UnboundedSender<AnalysisCommand>,
}

impl AnalysisHandle {
    pub fn start(&self, audio_session_id: i32, enabled: bool) {
        self.send(AnalysisCommand::Start {
            audio_session_id,
            enabled,
        });
    }

    pub fn enable(&self) {
        self.send(AnalysisCommand::Enable);
    }

    pub fn disable(&self) {
        self.send(AnalysisCommand::Disable);
    }

    pub fn stop(&self) {
        self.send(AnalysisCommand::Stop);
    }

    fn send(&self, command: AnalysisCommand) {
        if self.tx.send(command).is_err() {
            debug!("Analysis lane closed; {:?} dropped", command);
        }
    }
}

/// Spawn the analysis lane
pub(crate) fn spawn_analysis(
    store: Arc<PlaybackStateStore>,
    factory: Arc<dyn VisualizerFactory>,
    settings: DetectorSettings,
    frame_buffer: usize,
    cancel: CancellationToken,
) -> (AnalysisHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = AnalysisWorker {
        store,
        factory,
        detector: BeatDetector::with_settings(settings),
        visualizer: None,
        enabled: false,
        frame_buffer: frame_buffer.max(1),
    };
    let task = tokio::spawn(worker.run(rx, cancel));
    (AnalysisHandle { tx }, task)
}

struct AnalysisWorker {
    store: Arc<PlaybackStateStore>,
    factory: Arc<dyn VisualizerFactory>,
    detector: BeatDetector,
    visualizer: Option<Box<dyn Visualizer>>,
    enabled: bool,
    frame_buffer: usize,
}

impl AnalysisWorker {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<AnalysisCommand>,
        cancel: CancellationToken,
    ) {
        let mut frames: Option<mpsc::Receiver<FftFrame>> = None;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle(command, &mut frames),
                    None => break,
                },
                frame = next_frame(&mut frames) => match frame {
                    Some(frame) => self.on_frame(&frame),
                    // Capture dropped its sender
                    None => frames = None,
                },
            }
        }

        self.teardown(&mut frames);
        debug!("Analysis lane stopped");
    }

    fn handle(&mut self, command: AnalysisCommand, frames: &mut Option<mpsc::Receiver<FftFrame>>) {
        match command {
            AnalysisCommand::Start {
                audio_session_id,
                enabled,
            } => self.start(audio_session_id, enabled, frames),
            AnalysisCommand::Enable => self.enable(frames),
            AnalysisCommand::Disable => self.disable(frames),
            AnalysisCommand::Stop => {
                self.teardown(frames);
                self.store.update(|state| state.clear_visualizer());
            }
        }
    }

    fn start(
        &mut self,
        audio_session_id: i32,
        enabled: bool,
        frames: &mut Option<mpsc::Receiver<FftFrame>>,
    ) {
        self.teardown(frames);

        let (tx, rx) = mpsc::channel(self.frame_buffer);
        let listener = Arc::new(move |frame: FftFrame| {
            if tx.try_send(frame).is_err() {
                debug!("Analysis frame dropped");
            }
        });

        let mut visualizer = match self.factory.create(audio_session_id, listener) {
            Ok(visualizer) => visualizer,
            Err(e) => {
                warn!(
                    "Analysis setup failed for audio session {}: {}",
                    audio_session_id, e
                );
                return;
            }
        };

        if enabled {
            if let Err(e) = visualizer.set_enabled(true) {
                warn!("Failed to enable analysis capture: {}", e);
                visualizer.release();
                return;
            }
        }

        self.visualizer = Some(visualizer);
        self.enabled = enabled;
        *frames = Some(rx);
        info!(
            "Analysis started on audio session {} ({})",
            audio_session_id,
            if enabled { "enabled" } else { "idle" }
        );
    }

    fn enable(&mut self, frames: &mut Option<mpsc::Receiver<FftFrame>>) {
        let Some(visualizer) = self.visualizer.as_mut() else {
            return;
        };
        if self.enabled {
            return;
        }

        self.detector.reset();
        match visualizer.set_enabled(true) {
            Ok(()) => {
                self.enabled = true;
                debug!("Analysis enabled");
            }
            Err(e) => {
                warn!("Failed to re-enable analysis: {}", e);
                self.teardown(frames);
            }
        }
    }

    fn disable(&mut self, frames: &mut Option<mpsc::Receiver<FftFrame>>) {
        if let Some(visualizer) = self.visualizer.as_mut() {
            if self.enabled {
                if let Err(e) = visualizer.set_enabled(false) {
                    warn!("Failed to disable analysis capture: {}", e);
                }
                debug!("Analysis disabled");
            }
        }
        self.enabled = false;
        self.detector.reset();

        // Frames captured before the pause are stale
        if let Some(rx) = frames.as_mut() {
            while rx.try_recv().is_ok() {}
        }
        self.store.update(|state| state.clear_visualizer());
    }

    fn teardown(&mut self, frames: &mut Option<mpsc::Receiver<FftFrame>>) {
        if let Some(mut visualizer) = self.visualizer.take() {
            visualizer.release();
            info!("Analysis stopped");
        }
        *frames = None;
        self.enabled = false;
        self.detector.reset();
    }

    fn on_frame(&mut self, frame: &FftFrame) {
        if !self.enabled {
            return;
        }
        let intensity = self.detector.process_frame(frame);
        let bpm = self.detector.estimated_bpm();
        self.store.update(|state| {
            state.bass_intensity = intensity;
            state.estimated_bpm = bpm;
        });
    }
}

async fn next_frame(frames: &mut Option<mpsc::Receiver<FftFrame>>) -> Option<FftFrame> {
    match frames {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PlaybackState;
    use crate::test_utils::FakeVisualizerFactory;
    use pulse_analysis::DEFAULT_BPM;
    use std::time::Duration;

    fn bass_frame() -> FftFrame {
        // 512 bins at 44.1kHz; put energy in bins 1..=3
        let mut data = vec![0u8; 1024];
        for bin in 1..=3 {
            data[bin * 2] = 100;
        }
        FftFrame::new(data, 44_100)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn spawn(
        factory: &FakeVisualizerFactory,
    ) -> (Arc<PlaybackStateStore>, AnalysisHandle, CancellationToken, JoinHandle<()>) {
        let store = Arc::new(PlaybackStateStore::new(PlaybackState::default()));
        let cancel = CancellationToken::new();
        let (handle, task) = spawn_analysis(
            Arc::clone(&store),
            Arc::new(factory.clone()),
            DetectorSettings::default(),
            4,
            cancel.clone(),
        );
        (store, handle, cancel, task)
    }

    #[tokio::test]
    async fn frames_publish_intensity() {
        let factory = FakeVisualizerFactory::new();
        let (store, analysis, cancel, task) = spawn(&factory);

        analysis.start(11, true);
        settle().await;
        assert_eq!(factory.last_session_id(), Some(11));
        assert!(factory.is_enabled());

        assert!(factory.push_frame(bass_frame()));
        settle().await;
        assert!(store.snapshot().bass_intensity > 0.0);

        cancel.cancel();
        task.await.unwrap();
        assert!(factory.is_released());
    }

    #[tokio::test]
    async fn disable_zeroes_outputs_and_pauses_capture() {
        let factory = FakeVisualizerFactory::new();
        let (store, analysis, cancel, task) = spawn(&factory);

        analysis.start(11, true);
        settle().await;
        factory.push_frame(bass_frame());
        settle().await;

        analysis.disable();
        settle().await;
        assert!(!factory.is_enabled());
        assert!(!factory.is_released());
        assert_eq!(store.snapshot().bass_intensity, 0.0);
        assert_eq!(store.snapshot().estimated_bpm, DEFAULT_BPM);

        // Re-enabled, not re-created
        analysis.enable();
        settle().await;
        assert!(factory.is_enabled());
        assert_eq!(factory.created_count(), 1);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn setup_failure_leaves_lane_idle() {
        let factory = FakeVisualizerFactory::new();
        factory.fail_create(true);
        let (store, analysis, cancel, task) = spawn(&factory);

        analysis.start(11, true);
        analysis.enable();
        settle().await;

        assert_eq!(factory.created_count(), 0);
        assert_eq!(store.snapshot().bass_intensity, 0.0);
        assert!(!task.is_finished());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn restart_releases_previous_capture() {
        let factory = FakeVisualizerFactory::new();
        let (_store, analysis, cancel, task) = spawn(&factory);

        analysis.start(1, true);
        settle().await;
        analysis.start(2, false);
        settle().await;

        assert_eq!(factory.created_count(), 2);
        assert_eq!(factory.last_session_id(), Some(2));
        assert!(!factory.is_enabled());

        analysis.stop();
        settle().await;
        assert!(factory.is_released());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
