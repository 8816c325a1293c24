//! Runtime for executing the console
//!
//! One runtime task owns the conversation: it applies state transitions,
//! executes their effects and publishes a read-only view plus a stream of
//! change events for the presentation layer.

mod executor;
mod session;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{ConversationRuntime, RuntimeChannels};
pub use traits::*;

use executor::Inbound;

use crate::db::{Insight, Message};
use crate::state_machine::{ConvContext, Event, ImageData, Phase, TransitionError};
use crate::vectors::{self, ExpertVector};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Read-only projection of the console for rendering
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsoleView {
    pub phase: Phase,
    pub messages: Vec<Message>,
    pub insights: Vec<Insight>,
    pub vectors: Vec<ExpertVector>,
}

/// Change events streamed to subscribers
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    Phase { phase: Phase },
    Message { message: Message },
    Insight { insight: Insight },
    Vectors { vectors: Vec<ExpertVector> },
    /// Memory wiped; `messages` is the fresh default session
    Purged { messages: Vec<Message> },
    Error { message: String },
}

/// Errors returned to callers of [`ConsoleHandle`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Console is busy ({0:?}), wait for the current response to manifest")]
    Busy(Phase),
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Console runtime is not running")]
    Stopped,
}

/// Handle to interact with the running console
#[derive(Clone)]
pub struct ConsoleHandle {
    event_tx: mpsc::Sender<Inbound>,
    broadcast_tx: broadcast::Sender<ConsoleEvent>,
    view_rx: watch::Receiver<ConsoleView>,
    shutdown: CancellationToken,
}

impl ConsoleHandle {
    /// Send a message, optionally pinning an expert vector.
    ///
    /// Returns the request id once the runtime has started the pipeline.
    /// Rejected when the composition surface is disabled, including when
    /// another send wins the race to the runtime.
    pub async fn send_message(
        &self,
        text: String,
        vector: Option<String>,
        images: Vec<ImageData>,
    ) -> Result<String, ConsoleError> {
        if text.trim().is_empty() {
            return Err(ConsoleError::EmptyMessage);
        }
        let phase = self.view_rx.borrow().phase;
        if !phase.accepts_input() {
            return Err(ConsoleError::Busy(phase));
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        self.send(Event::UserMessage {
            text,
            vector: vector.filter(|v| !v.trim().is_empty()),
            images,
            request_id: request_id.clone(),
        })
        .await
        .map(|()| request_id)
    }

    pub async fn focus(&self) -> Result<(), ConsoleError> {
        self.send(Event::Focus).await
    }

    pub async fn blur(&self) -> Result<(), ConsoleError> {
        self.send(Event::Blur).await
    }

    pub async fn purge(&self) -> Result<(), ConsoleError> {
        self.send(Event::Purge).await
    }

    /// Current projection
    pub fn view(&self) -> ConsoleView {
        self.view_rx.borrow().clone()
    }

    /// Wait until the projection satisfies `predicate`
    #[allow(dead_code)] // Used by runtime tests
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ConsoleView) -> bool,
    ) -> Result<ConsoleView, ConsoleError> {
        let mut rx = self.view_rx.clone();
        let view = rx
            .wait_for(predicate)
            .await
            .map_err(|_| ConsoleError::Stopped)?;
        Ok(view.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConsoleEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Stop the runtime task
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Queue `event` and wait for the runtime to accept or reject it
    async fn send(&self, event: Event) -> Result<(), ConsoleError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.event_tx
            .send(Inbound {
                event,
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| ConsoleError::Stopped)?;

        match ack_rx.await.map_err(|_| ConsoleError::Stopped)? {
            Ok(()) => Ok(()),
            Err(TransitionError::EmptyMessage) => Err(ConsoleError::EmptyMessage),
            Err(_) => Err(ConsoleError::Busy(self.view_rx.borrow().phase)),
        }
    }
}

/// Restore memory from `store` and start the console runtime in the background
pub async fn start_console<S, L>(
    context: ConvContext,
    store: S,
    llm_client: L,
    system_prompt: String,
) -> ConsoleHandle
where
    S: MemoryStore + 'static,
    L: LlmClient + 'static,
{
    let session = session::Session::restore(&store, session::now_ms()).await;

    let (event_tx, event_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let (view_tx, view_rx) = watch::channel(ConsoleView {
        phase: Phase::Idle,
        messages: session.messages.clone(),
        insights: session.insights.clone(),
        vectors: vectors::initial_vectors(),
    });
    let shutdown = CancellationToken::new();

    let runtime = ConversationRuntime::new(
        context,
        session,
        store,
        llm_client,
        system_prompt,
        RuntimeChannels {
            event_rx,
            event_tx: event_tx.clone(),
            broadcast_tx: broadcast_tx.clone(),
            view_tx,
            shutdown: shutdown.clone(),
        },
    );

    tokio::spawn(async move {
        runtime.run().await;
    });

    ConsoleHandle {
        event_tx,
        broadcast_tx,
        view_rx,
        shutdown,
    }
}
