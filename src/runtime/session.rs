//! Session bootstrap: default memory, restoration and message ids

use super::traits::MemoryStore;
use crate::db::{Insight, Layer, LayerKind, Message, Role};
use chrono::Utc;

/// Id of the greeting message of a fresh session
pub const INIT_MESSAGE_ID: &str = "init-1";

const INIT_TEXT: &str = "SYSTEM INITIALIZED. VRA CORE ONLINE. WAITING FOR INPUT VECTOR.";
const INIT_DIRECT: &str = "System Ready. Awaiting perturbation vector.";
const INIT_STRUCTURAL: &str = "Kernel: SACS-PS v14.0\nArchitecture: Aethelred v3.1\nMode: Idle";

/// Meta-message appended when memory is restored at startup
pub const RESTORED_TEXT: &str = "MEMORY RESTORED FROM LOCAL STORAGE.";

/// Stand-in for a model reply with no text
pub const EMPTY_REPLY_NOTICE: &str =
    "ERRORE: Collasso del campo fallito. Nessuna risultante generata.";

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// In-memory conversation owned by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub messages: Vec<Message>,
    pub insights: Vec<Insight>,
}

impl Session {
    /// A fresh session holding only the greeting
    pub fn fresh(timestamp: i64) -> Self {
        Self {
            messages: vec![Message {
                id: INIT_MESSAGE_ID.to_string(),
                role: Role::System,
                content: INIT_TEXT.to_string(),
                layers: Some(vec![
                    Layer::new(LayerKind::Direct, INIT_DIRECT),
                    Layer::new(LayerKind::Structural, INIT_STRUCTURAL),
                ]),
                timestamp,
            }],
            insights: Vec::new(),
        }
    }

    /// Rebuild the session from durable memory.
    ///
    /// Restored history gets a trailing meta-message; it reaches the store with
    /// the next save. Stored insights survive even when no messages did.
    pub async fn restore<S: MemoryStore + ?Sized>(store: &S, timestamp: i64) -> Self {
        let Some(snapshot) = store.load().await else {
            return Self::fresh(timestamp);
        };

        if snapshot.messages.is_empty() {
            return Self {
                insights: snapshot.insights,
                ..Self::fresh(timestamp)
            };
        }

        tracing::info!(
            messages = snapshot.messages.len(),
            insights = snapshot.insights.len(),
            "Memory restored"
        );

        let mut messages = snapshot.messages;
        messages.push(Message::system(
            format!("restore-{timestamp}"),
            RESTORED_TEXT,
            timestamp,
        ));
        Self {
            messages,
            insights: snapshot.insights,
        }
    }
}

/// Monotonic source of message ids.
///
/// Ids are decimal milliseconds, bumped past the previous id when two messages
/// land in the same millisecond, so numeric order is creation order.
#[derive(Debug, Clone, Default)]
pub struct MessageClock {
    last: i64,
}

impl MessageClock {
    /// Seed from the largest numeric id in `messages`
    pub fn seeded(messages: &[Message]) -> Self {
        let last = messages
            .iter()
            .filter_map(|m| m.id.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Self { last }
    }

    /// Next id at wall-clock time `now`. Pins at `i64::MAX` rather than wrap.
    pub fn next_id(&mut self, now: i64) -> String {
        self.last = now.max(self.last.saturating_add(1));
        self.last.to_string()
    }
}
