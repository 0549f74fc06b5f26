//! Background driver
//!
//! Reacts to session transitions, player callbacks and play/pause edges.
//! All handle access goes through the command lane.

use crate::controller::Engine;
use crate::lane::TaggedEvent;
use crate::session::Transition;
use pulse_core::{PlayerEvent, PlayerHandle};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub(crate) async fn run(
    engine: Arc<Engine>,
    mut transitions: mpsc::UnboundedReceiver<Transition>,
    mut events: mpsc::UnboundedReceiver<TaggedEvent>,
    cancel: CancellationToken,
) {
    let mut state_rx = engine.store.subscribe();
    let mut was_playing = state_rx.borrow_and_update().is_playing;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(transition) = transitions.recv() => on_transition(&engine, transition).await,
            Some(event) = events.recv() => {
                // Coalesce a burst of callbacks into one reconciliation
                let mut batch = vec![event];
                while let Ok(event) = events.try_recv() {
                    batch.push(event);
                }
                on_player_events(&engine, batch).await;
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let playing = state_rx.borrow_and_update().is_playing;
                if playing != was_playing {
                    was_playing = playing;
                    if playing {
                        engine.analysis.enable();
                    } else {
                        engine.analysis.disable();
                    }
                }
            }
        }
    }

    debug!("Playback driver stopped");
}

async fn on_transition(engine: &Arc<Engine>, transition: Transition) {
    match transition {
        Transition::Connected(handle) => connect(engine, handle).await,
        Transition::Disconnected => disconnect(engine).await,
    }
}

async fn connect(engine: &Arc<Engine>, handle: Arc<dyn PlayerHandle>) {
    let job_engine = Arc::clone(engine);
    let attached = engine
        .lane
        .run(move |slot| {
            slot.attach(Arc::clone(&handle));

            let intent = job_engine.intent();
            let restored = handle
                .set_repeat_mode(intent.repeat)
                .and_then(|()| handle.set_shuffle_enabled(intent.shuffle.is_enabled()));
            if let Err(e) = restored {
                warn!("Failed to restore playback modes on new handle: {}", e);
            }

            job_engine.reconcile(handle.as_ref());

            match handle.audio_session_id() {
                Ok(0) => None,
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Failed to read audio session id: {}", e);
                    None
                }
            }
        })
        .await;

    let audio_session = match attached {
        Ok(audio_session) => audio_session,
        Err(e) => {
            debug!("Connect dropped: {}", e);
            return;
        }
    };

    info!("Player handle attached");
    engine.tracker.start();

    match audio_session {
        Some(id) => engine.analysis.start(id, engine.store.snapshot().is_playing),
        None => {
            engine.analysis.stop();
            info!("Audio session not assigned yet; analysis idle until next connect");
        }
    }
}

async fn disconnect(engine: &Arc<Engine>) {
    let detached = engine.lane.run(|slot| slot.detach().is_some()).await;
    if matches!(detached, Ok(true)) {
        info!("Player handle detached");
    }

    engine.tracker.stop();
    engine.analysis.stop();
    engine.store.reset();
}

async fn on_player_events(engine: &Arc<Engine>, batch: Vec<TaggedEvent>) {
    let job_engine = Arc::clone(engine);
    let handled = engine
        .lane
        .run(move |slot| {
            let Some(handle) = slot.handle() else {
                return;
            };

            let mut relevant = false;
            for tagged in batch.iter().filter(|tagged| slot.is_current(tagged)) {
                relevant = true;
                if let PlayerEvent::PlayerError(message) = &tagged.event {
                    error!("Player error: {}", message);
                    job_engine.store.set_error(message.clone());
                }
            }

            if relevant {
                job_engine.reconcile(handle.as_ref());
            }
        })
        .await;

    if let Err(e) = handled {
        debug!("Player events dropped: {}", e);
    }
}
