//! Pure state transition function

use super::effect::PacingTimer;
use super::{ConvContext, ConvState, Effect, Event};
use crate::insight;
use crate::parser;
use crate::system_prompt::apply_vector_override;
use thiserror::Error;

/// Prefix of the system message appended when a model call fails
pub const CRITICAL_ERROR_PREFIX: &str = "CRITICAL ERROR: ";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ConvState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ConvState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Console is busy, cannot accept message until the current response manifests")]
    Busy,
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Event belongs to request {0} which is no longer active")]
    Stale(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. Randomness
/// (vector highlighting), clocks and I/O all live in the executor.
pub fn transition(
    state: &ConvState,
    context: &ConvContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Composition surface attention
        // ============================================================
        (ConvState::Idle, Event::Focus) => Ok(TransitionResult::new(ConvState::Input)),
        (ConvState::Input, Event::Blur) => Ok(TransitionResult::new(ConvState::Idle)),

        // Focus/blur while something else owns the phase: no change
        (_, Event::Focus | Event::Blur) => Ok(TransitionResult::new(state.clone())),

        // ============================================================
        // Send
        // ============================================================
        (
            ConvState::Idle | ConvState::Input | ConvState::Manifested { .. },
            Event::UserMessage {
                text,
                vector,
                images,
                request_id,
            },
        ) => {
            if text.trim().is_empty() {
                return Err(TransitionError::EmptyMessage);
            }

            let outbound = match vector.as_deref() {
                Some(name) => apply_vector_override(&text, name),
                None => text.clone(),
            };

            let mut result = TransitionResult::new(ConvState::Scanning {
                request_id: request_id.clone(),
                vector,
                early_reply: None,
            })
            .with_effect(Effect::CancelTimers);

            // Sending out of Manifested skips the settle dwell and its reset
            if matches!(state, ConvState::Manifested { .. }) {
                result = result.with_effect(Effect::ResetVectors);
            }

            Ok(result.with_effects([
                Effect::append_user_message(text),
                Effect::RequestModel {
                    request_id: request_id.clone(),
                    text: outbound,
                    images,
                },
                Effect::start_timer(PacingTimer::Scan, &request_id, context.scan_dwell),
            ]))
        }

        (
            ConvState::Scanning { .. } | ConvState::Weaving { .. } | ConvState::Collapsing { .. },
            Event::UserMessage { .. },
        ) => Err(TransitionError::Busy),

        // ============================================================
        // Purge (accepted in every phase)
        // ============================================================
        (_, Event::Purge) => Ok(TransitionResult::new(ConvState::Idle).with_effects([
            Effect::CancelTimers,
            Effect::ClearMemory,
            Effect::ResetVectors,
        ])),

        // ============================================================
        // Scanning
        // ============================================================
        (
            ConvState::Scanning {
                request_id,
                vector,
                early_reply: None,
            },
            Event::ModelReply {
                request_id: reply_id,
                text,
            },
        ) if *request_id == reply_id => Ok(TransitionResult::new(ConvState::Scanning {
            request_id: reply_id,
            vector: vector.clone(),
            early_reply: Some(text),
        })),

        (
            ConvState::Scanning {
                request_id,
                vector,
                early_reply,
            },
            Event::ScanElapsed {
                request_id: timer_id,
            },
        ) if *request_id == timer_id => {
            let result = TransitionResult::new(ConvState::Weaving {
                request_id: timer_id.clone(),
            })
            .with_effect(Effect::HighlightVectors {
                vector: vector.clone(),
            });

            Ok(match early_reply {
                Some(text) => result.with_effect(Effect::ReplayReply {
                    request_id: timer_id,
                    text: text.clone(),
                }),
                None => result,
            })
        }

        // ============================================================
        // Weaving -> Collapsing
        // ============================================================
        (
            ConvState::Weaving { request_id },
            Event::ModelReply {
                request_id: reply_id,
                text,
            },
        ) if *request_id == reply_id => Ok(TransitionResult::new(ConvState::Collapsing {
            request_id: reply_id.clone(),
            reply: text,
        })
        .with_effect(Effect::start_timer(
            PacingTimer::Collapse,
            &reply_id,
            context.collapse_dwell,
        ))),

        // ============================================================
        // Model failure (before a reply was accepted)
        // ============================================================
        (
            ConvState::Scanning {
                request_id,
                early_reply: None,
                ..
            }
            | ConvState::Weaving { request_id },
            Event::ModelError {
                request_id: error_id,
                message,
            },
        ) if *request_id == error_id => Ok(TransitionResult::new(ConvState::Idle).with_effects([
            Effect::CancelTimers,
            Effect::ResetVectors,
            Effect::append_system_message(format!("{CRITICAL_ERROR_PREFIX}{message}")),
        ])),

        // ============================================================
        // Collapsing -> Manifested
        // ============================================================
        (
            ConvState::Collapsing { request_id, reply },
            Event::CollapseElapsed {
                request_id: timer_id,
            },
        ) if *request_id == timer_id => {
            let response = parser::parse(reply);
            let insight = insight::distill(&response);
            Ok(TransitionResult::new(ConvState::Manifested {
                request_id: timer_id.clone(),
            })
            .with_effects([
                Effect::AppendManifestation { response, insight },
                Effect::start_timer(PacingTimer::Settle, &timer_id, context.settle_dwell),
            ]))
        }

        // ============================================================
        // Manifested -> Idle
        // ============================================================
        (
            ConvState::Manifested { request_id },
            Event::SettleElapsed {
                request_id: timer_id,
            },
        ) if *request_id == timer_id => {
            Ok(TransitionResult::new(ConvState::Idle).with_effect(Effect::ResetVectors))
        }

        // ============================================================
        // Pipeline events that do not belong to the current state
        // ============================================================
        (
            _,
            Event::ScanElapsed { request_id }
            | Event::CollapseElapsed { request_id }
            | Event::SettleElapsed { request_id }
            | Event::ModelReply { request_id, .. }
            | Event::ModelError { request_id, .. },
        ) if state.request_id() != Some(request_id.as_str()) => {
            Err(TransitionError::Stale(request_id))
        }

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {event:?}"
        ))),
    }
}
