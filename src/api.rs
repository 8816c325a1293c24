//! HTTP API for the VRA console
//!
//! The presentation boundary: intents come in as POSTs, the read-only view
//! goes out as JSON snapshots and an SSE change stream.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::llm::{LlmService, ModelRegistry};
use crate::oracle::DocLibrary;
use crate::runtime::ConsoleHandle;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub console: ConsoleHandle,
    pub docs: Arc<DocLibrary>,
    /// Fast model answering documentation questions, if any is configured
    pub oracle: Option<Arc<dyn LlmService>>,
}

impl AppState {
    pub fn new(console: ConsoleHandle, docs: DocLibrary, registry: &ModelRegistry) -> Self {
        Self {
            console,
            docs: Arc::new(docs),
            oracle: registry.oracle_model(),
        }
    }
}
