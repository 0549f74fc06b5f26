//! In-memory frequency capture

use pulse_core::{FftFrame, FrameListener, PulseError, Result, Visualizer, VisualizerFactory};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct Capture {
    audio_session_id: i32,
    listener: Option<FrameListener>,
    enabled: bool,
    released: bool,
}

#[derive(Default)]
struct Inner {
    captures: Vec<Arc<Mutex<Capture>>>,
    fail_create: bool,
}

/// Fake [`VisualizerFactory`]
///
/// Frames pushed through the factory reach the newest capture, and only
/// while it is enabled, as a platform capture would deliver them.
#[derive(Default, Clone)]
pub struct FakeVisualizerFactory {
    inner: Arc<Mutex<Inner>>,
}

impl FakeVisualizerFactory {
    /// Create a factory with no captures
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create` fail (or succeed again)
    pub fn fail_create(&self, fail: bool) {
        lock(&self.inner).fail_create = fail;
    }

    /// Deliver `frame` to the newest capture; returns whether it was delivered
    pub fn push_frame(&self, frame: FftFrame) -> bool {
        let listener = {
            let inner = lock(&self.inner);
            let Some(capture) = inner.captures.last() else {
                return false;
            };
            let capture = lock(capture);
            if !capture.enabled || capture.released {
                return false;
            }
            capture.listener.clone()
        };
        match listener {
            Some(listener) => {
                listener(frame);
                true
            }
            None => false,
        }
    }

    /// Number of captures created so far
    pub fn created_count(&self) -> usize {
        lock(&self.inner).captures.len()
    }

    /// Audio session of the newest capture
    pub fn last_session_id(&self) -> Option<i32> {
        self.with_last(|capture| capture.audio_session_id)
    }

    /// Whether the newest capture is enabled
    pub fn is_enabled(&self) -> bool {
        self.with_last(|capture| capture.enabled).unwrap_or(false)
    }

    /// Whether the newest capture was released
    pub fn is_released(&self) -> bool {
        self.with_last(|capture| capture.released).unwrap_or(false)
    }

    fn with_last<R>(&self, f: impl FnOnce(&Capture) -> R) -> Option<R> {
        let inner = lock(&self.inner);
        inner.captures.last().map(|capture| f(&lock(capture)))
    }
}

impl VisualizerFactory for FakeVisualizerFactory {
    fn create(&self, audio_session_id: i32, listener: FrameListener) -> Result<Box<dyn Visualizer>> {
        let mut inner = lock(&self.inner);
        if inner.fail_create {
            return Err(PulseError::analysis(format!(
                "Cannot capture audio session {audio_session_id}"
            )));
        }

        let capture = Arc::new(Mutex::new(Capture {
            audio_session_id,
            listener: Some(listener),
            ..Capture::default()
        }));
        inner.captures.push(Arc::clone(&capture));
        Ok(Box::new(FakeVisualizer { capture }))
    }
}

/// Capture handed out by [`FakeVisualizerFactory`]
struct FakeVisualizer {
    capture: Arc<Mutex<Capture>>,
}

impl Visualizer for FakeVisualizer {
    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        let mut capture = lock(&self.capture);
        if capture.released {
            return Err(PulseError::analysis("Capture already released"));
        }
        capture.enabled = enabled;
        Ok(())
    }

    fn release(&mut self) {
        let mut capture = lock(&self.capture);
        capture.enabled = false;
        capture.released = true;
        capture.listener = None;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
