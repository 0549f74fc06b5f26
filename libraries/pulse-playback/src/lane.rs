//! Command lane
//!
//! The player handle is not safe for concurrent use, so exactly one task
//! ever touches it. Everything else submits closures to that task and
//! awaits the reply.

use crate::error::{PlaybackError, Result};
use pulse_core::{ListenerId, PlayerEvent, PlayerHandle};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// A player event tagged with the attachment it came from
#[derive(Debug, Clone)]
pub(crate) struct TaggedEvent {
    pub generation: u64,
    pub event: PlayerEvent,
}

/// The lane's view of the current handle
///
/// Only ever accessed from inside lane jobs.
pub(crate) struct HandleSlot {
    handle: Option<Arc<dyn PlayerHandle>>,
    listener: Option<ListenerId>,
    generation: u64,
    events: mpsc::UnboundedSender<TaggedEvent>,
}

impl HandleSlot {
    pub fn new(events: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self {
            handle: None,
            listener: None,
            generation: 0,
            events,
        }
    }

    /// The attached handle, if any
    pub fn handle(&self) -> Option<Arc<dyn PlayerHandle>> {
        self.handle.clone()
    }

    /// Attachment counter; bumps on every attach and detach
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `event` came from the current attachment
    pub fn is_current(&self, event: &TaggedEvent) -> bool {
        self.handle.is_some() && event.generation == self.generation
    }

    /// Attach `handle`, detaching any previous one first
    pub fn attach(&mut self, handle: Arc<dyn PlayerHandle>) {
        self.detach();
        self.generation += 1;

        let generation = self.generation;
        let events = self.events.clone();
        let id = handle.add_listener(Arc::new(move |event: PlayerEvent| {
            // Receiver gone means the controller is shutting down
            let _ = events.send(TaggedEvent { generation, event });
        }));

        self.handle = Some(handle);
        self.listener = Some(id);
    }

    /// Detach the current handle and return it
    pub fn detach(&mut self) -> Option<Arc<dyn PlayerHandle>> {
        let handle = self.handle.take()?;
        if let Some(id) = self.listener.take() {
            handle.remove_listener(id);
        }
        self.generation += 1;
        Some(handle)
    }
}

type Job = Box<dyn FnOnce(&mut HandleSlot) + Send>;

/// Sender side of the command lane
#[derive(Clone)]
pub(crate) struct CommandLane {
    tx: mpsc::UnboundedSender<Job>,
}

impl CommandLane {
    /// Spawn the lane task
    pub fn spawn(slot: HandleSlot, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_lane(slot, rx, cancel));
        (Self { tx }, task)
    }

    /// Run `job` on the lane and wait for its result
    pub async fn run<F, R>(&self, job: F) -> Result<R>
    where
        F: FnOnce(&mut HandleSlot) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Box::new(move |slot: &mut HandleSlot| {
                let _ = reply_tx.send(job(slot));
            }))
            .map_err(|_| PlaybackError::LaneClosed)?;

        reply_rx.await.map_err(|_| PlaybackError::LaneClosed)
    }
}

async fn run_lane(
    mut slot: HandleSlot,
    mut jobs: mpsc::UnboundedReceiver<Job>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job(&mut slot),
                None => break,
            },
        }
    }

    if slot.detach().is_some() {
        debug!("Command lane stopped with a handle attached; listener detached");
    }
    debug!("Command lane stopped");
}
