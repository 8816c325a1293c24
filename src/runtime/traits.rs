//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{Database, DbError, Insight, Message, Snapshot};
use crate::llm::{LlmError, LlmRequest, LlmResponse, ModelRegistry};
use async_trait::async_trait;
use std::sync::Arc;

/// Durable memory for the console.
///
/// None of these operations fail from the caller's point of view: write
/// failures are logged and leave the previous durable state in place, and
/// corrupt data is wiped and reported as absent.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Overwrite the stored messages and insights
    async fn save(&self, messages: &[Message], insights: &[Insight]);

    /// Read back the stored memory, `None` when there is none
    async fn load(&self) -> Option<Snapshot>;

    /// Remove everything; idempotent
    async fn clear(&self);
}

/// Client for making LLM requests
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete an LLM request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: MemoryStore + ?Sized> MemoryStore for Arc<T> {
    async fn save(&self, messages: &[Message], insights: &[Insight]) {
        (**self).save(messages, insights).await;
    }

    async fn load(&self) -> Option<Snapshot> {
        (**self).load().await
    }

    async fn clear(&self) {
        (**self).clear().await;
    }
}

#[async_trait]
impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        (**self).complete(request).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as the console memory
#[derive(Clone)]
pub struct DatabaseStore {
    db: Database,
}

impl DatabaseStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MemoryStore for DatabaseStore {
    async fn save(&self, messages: &[Message], insights: &[Insight]) {
        if let Err(e) = self.db.save_snapshot(messages, insights) {
            tracing::warn!(error = %e, "Memory write failed, keeping previous snapshot");
        }
    }

    async fn load(&self) -> Option<Snapshot> {
        match self.db.load_snapshot() {
            Ok(snapshot) => snapshot,
            Err(DbError::Corrupt { key, source }) => {
                tracing::warn!(key, error = %source, "Memory corruption detected, resetting");
                self.clear().await;
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Memory read failed, starting fresh");
                None
            }
        }
    }

    async fn clear(&self) {
        if let Err(e) = self.db.clear() {
            tracing::warn!(error = %e, "Memory clear failed");
        }
    }
}

/// Adapter to use `ModelRegistry` as `LlmClient`
pub struct RegistryLlmClient {
    registry: Arc<ModelRegistry>,
    model_id: String,
}

impl RegistryLlmClient {
    pub fn new(registry: Arc<ModelRegistry>, model_id: String) -> Self {
        Self { registry, model_id }
    }
}

#[async_trait]
impl LlmClient for RegistryLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let llm = self
            .registry
            .get(&self.model_id)
            .ok_or_else(|| {
                LlmError::auth(format!(
                    "Model {} unavailable. Set GEMINI_API_KEY or LLM_GATEWAY.",
                    self.model_id
                ))
            })?;
        llm.complete(request).await
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
