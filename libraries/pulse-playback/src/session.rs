//! Session connection lifecycle
//!
//! Folds the provider's raw availability events through an explicit
//! transition table and forwards the resulting handle transitions to the
//! controller's driver.
//!
//! ```text
//! Disconnected --Connecting--> Connecting --Available--> Connected
//!      ^                           |                        |
//!      +-------Unavailable---------+------Unavailable-------+
//!
//! Connected --Connecting--> Connecting  (old handle stays attached)
//! Connected --Available---> Connected   (handle replaced)
//! ```

use pulse_core::{PlayerHandle, SessionEvent, SessionProvider};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Connection state as observers see it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No handle and no attempt in progress
    #[default]
    Disconnected,
    /// A connection attempt (or session replacement) is in progress
    Connecting,
    /// A handle is available
    Connected,
}

/// What the controller must do in response to a session event
#[derive(Clone)]
pub enum Transition {
    /// Attach this handle, detaching any previous one (fresh Connected entry)
    Connected(Arc<dyn PlayerHandle>),
    /// Detach and reset
    Disconnected,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected(_) => write!(f, "Connected(<handle>)"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// The transition table
///
/// Returns the next observable state and the transition to act on, if any.
pub fn next_state(
    current: ConnectionState,
    event: SessionEvent,
) -> (ConnectionState, Option<Transition>) {
    match (current, event) {
        (_, SessionEvent::Connecting) => (ConnectionState::Connecting, None),
        (_, SessionEvent::Available(handle)) => (
            ConnectionState::Connected,
            Some(Transition::Connected(handle)),
        ),
        (ConnectionState::Disconnected, SessionEvent::Unavailable) => {
            (ConnectionState::Disconnected, None)
        }
        (ConnectionState::Connecting | ConnectionState::Connected, SessionEvent::Unavailable) => {
            (ConnectionState::Disconnected, Some(Transition::Disconnected))
        }
    }
}

/// Tracks connection state and publishes it to observers
#[derive(Debug)]
pub struct SessionConnector {
    state: watch::Sender<ConnectionState>,
}

impl Default for SessionConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConnector {
    /// Create a disconnected connector
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self { state }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Follow connection state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Apply one provider event and return the transition to act on
    pub fn apply(&self, event: SessionEvent) -> Option<Transition> {
        let current = self.state();
        let (next, transition) = next_state(current, event);
        if next != current {
            debug!("Session {:?} -> {:?}", current, next);
        }
        self.state.send_replace(next);
        transition
    }

    /// Connect to `provider` and forward transitions until cancelled
    ///
    /// The provider's stream ending counts as the handle going away.
    pub fn spawn(
        self: &Arc<Self>,
        provider: &dyn SessionProvider,
        transitions: mpsc::UnboundedSender<Transition>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let mut events = provider.connect();
        let connector = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    () = cancel.cancelled() => break,
                    event = events.recv() => event,
                };

                let Some(event) = event else {
                    info!("Session provider closed its stream");
                    if let Some(transition) = connector.apply(SessionEvent::Unavailable) {
                        let _ = transitions.send(transition);
                    }
                    break;
                };

                if let Some(transition) = connector.apply(event) {
                    if transitions.send(transition).is_err() {
                        break;
                    }
                }
            }
            debug!("Session observer stopped");
        })
    }
}
