//! Scriptable session provider

use pulse_core::{PlayerHandle, SessionEvent, SessionProvider};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

/// Fake [`SessionProvider`] driven by the test
///
/// Events sent before `connect` are queued and delivered once a
/// controller connects.
pub struct FakeSession {
    tx: Mutex<Option<mpsc::UnboundedSender<SessionEvent>>>,
    pending: Mutex<Option<mpsc::UnboundedReceiver<SessionEvent>>>,
}

impl Default for FakeSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSession {
    /// Create a provider with nothing connected yet
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            pending: Mutex::new(Some(rx)),
        }
    }

    /// Signal a connection attempt
    pub fn connecting(&self) {
        self.send(SessionEvent::Connecting);
    }

    /// Signal `Connecting` then make `handle` available
    pub fn connect_player(&self, handle: Arc<dyn PlayerHandle>) {
        self.send(SessionEvent::Connecting);
        self.send(SessionEvent::Available(handle));
    }

    /// Replace the handle without an intermediate disconnect
    pub fn replace_player(&self, handle: Arc<dyn PlayerHandle>) {
        self.send(SessionEvent::Available(handle));
    }

    /// Signal that the handle went away
    pub fn disconnect(&self) {
        self.send(SessionEvent::Unavailable);
    }

    /// End the event stream
    pub fn shutdown(&self) {
        lock(&self.tx).take();
    }

    fn send(&self, event: SessionEvent) {
        if let Some(tx) = lock(&self.tx).as_ref() {
            if tx.send(event).is_err() {
                debug!("Fake session event dropped; no controller connected");
            }
        }
    }
}

impl SessionProvider for FakeSession {
    fn connect(&self) -> mpsc::UnboundedReceiver<SessionEvent> {
        lock(&self.pending).take().unwrap_or_else(|| {
            // Second connect: start a fresh stream
            let (tx, rx) = mpsc::unbounded_channel();
            *lock(&self.tx) = Some(tx);
            rx
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
