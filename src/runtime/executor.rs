//! Console runtime executor

use super::session::{now_ms, MessageClock, Session, EMPTY_REPLY_NOTICE};
use super::traits::{LlmClient, MemoryStore};
use super::{ConsoleEvent, ConsoleView};

use crate::db::{Insight, Message, Role};
use crate::llm::{ContentBlock, LlmMessage, LlmRequest, MessageRole};
use crate::state_machine::{
    transition, ConvContext, ConvState, Effect, Event, ImageData, TransitionError,
};
use crate::vectors::{self, ExpertVector};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

/// Answers whether a queued intent was accepted by the state machine
pub type Ack = oneshot::Sender<Result<(), TransitionError>>;

/// An event queued for the runtime.
///
/// Intents from the handle carry an `ack`; timer and model events do not.
pub struct Inbound {
    pub event: Event,
    pub ack: Option<Ack>,
}

impl From<Event> for Inbound {
    fn from(event: Event) -> Self {
        Self { event, ack: None }
    }
}

/// Channels connecting a runtime to its handle
pub struct RuntimeChannels {
    pub event_rx: mpsc::Receiver<Inbound>,
    pub event_tx: mpsc::Sender<Inbound>,
    pub broadcast_tx: broadcast::Sender<ConsoleEvent>,
    pub view_tx: watch::Sender<ConsoleView>,
    pub shutdown: CancellationToken,
}

/// Generic console runtime that can work with any store and LLM implementation
pub struct ConversationRuntime<S, L>
where
    S: MemoryStore + 'static,
    L: LlmClient + 'static,
{
    context: ConvContext,
    state: ConvState,
    store: S,
    llm_client: Arc<L>,
    system_prompt: String,
    messages: Vec<Message>,
    insights: Vec<Insight>,
    vectors: Vec<ExpertVector>,
    clock: MessageClock,
    event_rx: mpsc::Receiver<Inbound>,
    event_tx: mpsc::Sender<Inbound>,
    broadcast_tx: broadcast::Sender<ConsoleEvent>,
    view_tx: watch::Sender<ConsoleView>,
    /// Cancels every pacing timer started since the last `CancelTimers`
    timer_cancel: CancellationToken,
    shutdown: CancellationToken,
}

impl<S, L> ConversationRuntime<S, L>
where
    S: MemoryStore + 'static,
    L: LlmClient + 'static,
{
    pub fn new(
        context: ConvContext,
        session: Session,
        store: S,
        llm_client: L,
        system_prompt: String,
        channels: RuntimeChannels,
    ) -> Self {
        let clock = MessageClock::seeded(&session.messages);
        Self {
            context,
            state: ConvState::Idle,
            store,
            llm_client: Arc::new(llm_client),
            system_prompt,
            messages: session.messages,
            insights: session.insights,
            vectors: vectors::initial_vectors(),
            clock,
            event_rx: channels.event_rx,
            event_tx: channels.event_tx,
            broadcast_tx: channels.broadcast_tx,
            view_tx: channels.view_tx,
            timer_cancel: CancellationToken::new(),
            shutdown: channels.shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            messages = self.messages.len(),
            insights = self.insights.len(),
            model = %self.llm_client.model_id(),
            "Starting console runtime"
        );
        self.publish_view();

        // Process events in a loop - no recursion
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                Some(inbound) = self.event_rx.recv() => self.process_event(inbound).await,
                else => break,
            }
        }

        self.timer_cancel.cancel();
        tracing::info!("Console runtime stopped");
    }

    async fn process_event(&mut self, inbound: Inbound) {
        // Effects may chain further events (a buffered reply being replayed)
        let mut events_to_process = vec![inbound.event];
        // Only the queued event itself is acknowledged, never chained ones
        let mut ack = inbound.ack;

        while let Some(current_event) = events_to_process.pop() {
            let result = match transition(&self.state, &self.context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    self.reject(&e);
                    if let Some(tx) = ack.take() {
                        let _ = tx.send(Err(e));
                    }
                    continue;
                }
            };

            let old_phase = self.state.phase();
            self.state = result.new_state;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push(generated_event);
                }
            }

            let phase = self.state.phase();
            if phase != old_phase {
                tracing::debug!(from = ?old_phase, to = ?phase, "Phase change");
                let _ = self.broadcast_tx.send(ConsoleEvent::Phase { phase });
            }
            self.publish_view();

            if let Some(tx) = ack.take() {
                let _ = tx.send(Ok(()));
            }
        }
    }

    fn reject(&self, error: &TransitionError) {
        match error {
            TransitionError::Stale(request_id) => {
                tracing::debug!(request_id = %request_id, "Ignoring event for abandoned request");
            }
            TransitionError::InvalidTransition(_) => {
                tracing::debug!(error = %error, "Ignoring out-of-phase event");
            }
            TransitionError::Busy | TransitionError::EmptyMessage => {
                // Rejected intents are user-facing (e.g. "console is busy")
                tracing::debug!(error = %error, phase = ?self.state.phase(), "Intent rejected");
                let _ = self.broadcast_tx.send(ConsoleEvent::Error {
                    message: error.to_string(),
                });
            }
        }
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::AppendMessage {
                role,
                content,
                layers,
            } => {
                let timestamp = now_ms();
                let message = Message {
                    id: self.clock.next_id(timestamp),
                    role,
                    content,
                    layers,
                    timestamp,
                };
                self.append_message(message).await;
                None
            }

            Effect::AppendManifestation { response, insight } => {
                let timestamp = now_ms();
                let message = Message::assistant(
                    self.clock.next_id(timestamp),
                    response.raw,
                    response.layers,
                    timestamp,
                );
                let source_id = message.id.clone();
                self.append_message(message).await;

                if let Some(text) = insight {
                    let insight = Insight {
                        id: format!("kli-{source_id}"),
                        timestamp,
                        insight: text,
                        source_id,
                    };
                    self.insights.push(insight.clone());
                    let _ = self.broadcast_tx.send(ConsoleEvent::Insight { insight });
                    self.persist().await;
                }
                None
            }

            Effect::RequestModel {
                request_id,
                text,
                images,
            } => {
                let request = self.build_request(text, &images);
                let llm_client = self.llm_client.clone();
                let event_tx = self.event_tx.clone();

                // The model call runs concurrently with the pacing timers
                tokio::spawn(async move {
                    tracing::info!(request_id = %request_id, "Requesting manifestation (background)");
                    let event = match llm_client.complete(&request).await {
                        Ok(response) => {
                            let mut text = response.text();
                            if text.is_empty() {
                                text = EMPTY_REPLY_NOTICE.to_string();
                            }
                            Event::ModelReply { request_id, text }
                        }
                        Err(e) => Event::ModelError {
                            request_id,
                            message: e.message,
                        },
                    };
                    let _ = event_tx.send(event.into()).await;
                });
                None
            }

            Effect::StartTimer {
                timer,
                request_id,
                delay,
            } => {
                let cancel = self.timer_cancel.clone();
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        () = cancel.cancelled() => {}
                        () = tokio::time::sleep(delay) => {
                            let _ = event_tx.send(timer.elapsed(request_id).into()).await;
                        }
                    }
                });
                None
            }

            Effect::CancelTimers => {
                self.timer_cancel.cancel();
                self.timer_cancel = CancellationToken::new();
                None
            }

            Effect::HighlightVectors { vector } => {
                vectors::highlight(&mut self.vectors, vector.as_deref(), &mut rand::thread_rng());
                self.broadcast_vectors();
                None
            }

            Effect::ResetVectors => {
                if self.vectors.iter().any(|v| v.active) {
                    vectors::reset(&mut self.vectors);
                    self.broadcast_vectors();
                }
                None
            }

            Effect::ClearMemory => {
                self.store.clear().await;
                let session = Session::fresh(now_ms());
                self.messages = session.messages;
                self.insights = session.insights;
                tracing::info!("Memory purged");
                let _ = self.broadcast_tx.send(ConsoleEvent::Purged {
                    messages: self.messages.clone(),
                });
                None
            }

            Effect::ReplayReply { request_id, text } => {
                Some(Event::ModelReply { request_id, text })
            }
        }
    }

    async fn append_message(&mut self, message: Message) {
        self.messages.push(message.clone());
        let _ = self.broadcast_tx.send(ConsoleEvent::Message { message });
        self.persist().await;
    }

    async fn persist(&self) {
        self.store.save(&self.messages, &self.insights).await;
    }

    fn broadcast_vectors(&self) {
        let _ = self.broadcast_tx.send(ConsoleEvent::Vectors {
            vectors: self.vectors.clone(),
        });
    }

    fn publish_view(&self) {
        self.view_tx.send_replace(ConsoleView {
            phase: self.state.phase(),
            messages: self.messages.clone(),
            insights: self.insights.clone(),
            vectors: self.vectors.clone(),
        });
    }

    /// Build the model request for the current turn.
    ///
    /// History is every non-system message; the triggering user message (the
    /// last one) is resent with its outbound text and attachments.
    fn build_request(&self, text: String, images: &[ImageData]) -> LlmRequest {
        let mut messages: Vec<LlmMessage> = self
            .messages
            .iter()
            .filter_map(|m| match m.role {
                Role::System => None,
                Role::User => Some(LlmMessage::user(&m.content)),
                Role::Assistant => Some(LlmMessage::assistant(&m.content)),
            })
            .collect();

        if matches!(self.messages.last(), Some(m) if m.role == Role::User) {
            messages.pop();
        }

        let mut content = vec![ContentBlock::text(text)];
        content.extend(images.iter().map(|image| ContentBlock::Image {
            source: image.to_image_source(),
        }));
        messages.push(LlmMessage {
            role: MessageRole::User,
            content,
        });

        LlmRequest {
            system: Some(self.system_prompt.clone()),
            messages,
            max_tokens: None,
        }
    }
}
