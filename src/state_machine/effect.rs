//! Effects produced by state transitions

use super::event::ImageData;
use crate::db::{Layer, Role};
use crate::parser::ParsedResponse;
use std::time::Duration;

/// Pacing timers of the request pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingTimer {
    Scan,
    Collapse,
    Settle,
}

impl PacingTimer {
    /// Event delivered when this timer fires
    pub fn elapsed(self, request_id: String) -> super::Event {
        use super::Event;
        match self {
            PacingTimer::Scan => Event::ScanElapsed { request_id },
            PacingTimer::Collapse => Event::CollapseElapsed { request_id },
            PacingTimer::Settle => Event::SettleElapsed { request_id },
        }
    }
}

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Append a message; the executor assigns id and timestamp, then saves
    AppendMessage {
        role: Role,
        content: String,
        layers: Option<Vec<Layer>>,
    },

    /// Append the assistant message for a parsed reply and, when present, the
    /// insight distilled from it
    AppendManifestation {
        response: ParsedResponse,
        insight: Option<String>,
    },

    /// Call the model (spawns as background task)
    RequestModel {
        request_id: String,
        text: String,
        images: Vec<ImageData>,
    },

    /// Start a pacing timer for a request
    StartTimer {
        timer: PacingTimer,
        request_id: String,
        delay: Duration,
    },

    /// Cancel every outstanding pacing timer
    CancelTimers,

    /// Light up vectors for weaving
    HighlightVectors { vector: Option<String> },

    /// Switch every vector off
    ResetVectors,

    /// Wipe durable memory and reset the session to its default
    ClearMemory,

    /// Feed a buffered model reply back into the machine
    ReplayReply { request_id: String, text: String },
}

impl Effect {
    pub fn append_user_message(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::User,
            content: text.into(),
            layers: None,
        }
    }

    pub fn append_system_message(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role: Role::System,
            content: text.into(),
            layers: None,
        }
    }

    pub fn start_timer(timer: PacingTimer, request_id: &str, delay: Duration) -> Self {
        Effect::StartTimer {
            timer,
            request_id: request_id.to_string(),
            delay,
        }
    }
}
