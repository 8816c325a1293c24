//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use super::{start_console, ConsoleHandle, ConsoleView};
use crate::db::{Insight, Message, Snapshot};
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, Usage};
use crate::state_machine::ConvContext;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// System instruction handed to test consoles
pub const TEST_SYSTEM_PROMPT: &str = "test kernel";

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
#[allow(dead_code)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a successful response carrying `text`
    pub fn queue_text(&self, text: &str) {
        self.queue_response(text_response(text));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self) -> Result<LlmResponse, LlmError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next_response()
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Successful single-block response
pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        content: vec![ContentBlock::text(text)],
        end_turn: true,
        usage: Usage::default(),
    }
}

// ============================================================================
// Delayed Mock LLM Client (replies after the scan dwell)
// ============================================================================

/// Mock LLM client with configurable delay
pub struct DelayedMockLlmClient {
    inner: MockLlmClient,
    delay: Duration,
}

#[allow(dead_code)]
impl DelayedMockLlmClient {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockLlmClient::new(model_id),
            delay,
        }
    }

    pub fn queue_text(&self, text: &str) {
        self.inner.queue_text(text);
    }

    pub fn queue_error(&self, error: LlmError) {
        self.inner.queue_error(error);
    }
}

#[async_trait]
impl LlmClient for DelayedMockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        tokio::time::sleep(self.delay).await;
        self.inner.next_response()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Memory store backed by a mutex, counting writes
#[derive(Default)]
pub struct InMemoryStore {
    snapshot: Mutex<Option<Snapshot>>,
    saves: AtomicUsize,
}

#[allow(dead_code)]
impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently stored memory
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot.lock().unwrap().clone()
    }

    /// Number of saves since creation
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn save(&self, messages: &[Message], insights: &[Insight]) {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.snapshot.lock().unwrap() = Some(Snapshot {
            messages: messages.to_vec(),
            insights: insights.to_vec(),
        });
    }

    async fn load(&self) -> Option<Snapshot> {
        self.snapshot()
    }

    async fn clear(&self) {
        *self.snapshot.lock().unwrap() = None;
    }
}

/// Store whose writes never land, like a full or read-only disk
#[derive(Default)]
pub struct FailingStore {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl MemoryStore for FailingStore {
    async fn save(&self, _messages: &[Message], _insights: &[Insight]) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        tracing::warn!("Memory write failed (simulated)");
    }

    async fn load(&self) -> Option<Snapshot> {
        None
    }

    async fn clear(&self) {}
}

// ============================================================================
// Test Console Builder
// ============================================================================

/// Helper for building test consoles with minimal boilerplate
pub struct TestConsole<L: LlmClient + 'static> {
    pub handle: ConsoleHandle,
    pub store: Arc<InMemoryStore>,
    pub llm: Arc<L>,
}

impl TestConsole<MockLlmClient> {
    /// Start from an instant mock and an empty store
    pub fn builder() -> TestConsoleBuilder<MockLlmClient> {
        TestConsoleBuilder {
            llm: MockLlmClient::new("test-model"),
            store: Arc::new(InMemoryStore::new()),
            context: ConvContext::default(),
        }
    }
}

pub struct TestConsoleBuilder<L> {
    llm: L,
    store: Arc<InMemoryStore>,
    context: ConvContext,
}

impl<L: LlmClient + 'static> TestConsoleBuilder<L> {
    pub fn llm<M: LlmClient + 'static>(self, llm: M) -> TestConsoleBuilder<M> {
        TestConsoleBuilder {
            llm,
            store: self.store,
            context: self.context,
        }
    }

    pub fn store(mut self, store: Arc<InMemoryStore>) -> Self {
        self.store = store;
        self
    }

    pub async fn build(self) -> TestConsole<L> {
        let llm = Arc::new(self.llm);
        let handle = start_console(
            self.context,
            self.store.clone(),
            llm.clone(),
            TEST_SYSTEM_PROMPT.to_string(),
        )
        .await;

        TestConsole {
            handle,
            store: self.store,
            llm,
        }
    }
}

impl<L: LlmClient + 'static> TestConsole<L> {
    /// Wait for the view to satisfy `predicate`, failing after a minute of
    /// (virtual) time
    pub async fn wait_for(&self, predicate: impl FnMut(&ConsoleView) -> bool) -> ConsoleView {
        tokio::time::timeout(Duration::from_secs(60), self.handle.wait_for(predicate))
            .await
            .expect("timed out waiting for console view")
            .expect("console runtime stopped")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{LayerKind, Role};
    use crate::llm::MessageRole;
    use crate::runtime::session::{EMPTY_REPLY_NOTICE, INIT_MESSAGE_ID, RESTORED_TEXT};
    use crate::runtime::{ConsoleError, ConsoleEvent};
    use crate::state_machine::transition::CRITICAL_ERROR_PREFIX;
    use crate::state_machine::{ImageData, Phase};
    use tokio::sync::broadcast;

    fn drain_phases(rx: &mut broadcast::Receiver<ConsoleEvent>) -> Vec<Phase> {
        let mut phases = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ConsoleEvent::Phase { phase } = event {
                phases.push(phase);
            }
        }
        phases
    }

    fn settled(count: usize) -> impl FnMut(&ConsoleView) -> bool {
        move |v| v.phase == Phase::Idle && v.messages.len() == count
    }

    #[tokio::test(start_paused = true)]
    async fn test_hello_walks_every_phase() {
        let console = TestConsole::builder().build().await;
        console.llm.queue_text("<R><L1>Hi</L1></R>");
        let mut rx = console.handle.subscribe();

        console
            .handle
            .send_message("hello".to_string(), None, vec![])
            .await
            .unwrap();
        let view = console.wait_for(settled(3)).await;

        assert_eq!(
            drain_phases(&mut rx),
            vec![
                Phase::Scanning,
                Phase::Weaving,
                Phase::Collapsing,
                Phase::Manifested,
                Phase::Idle
            ]
        );

        let user = &view.messages[1];
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "hello");

        let reply = &view.messages[2];
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "<R><L1>Hi</L1></R>");
        let layers = reply.layers.as_ref().unwrap();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].kind, LayerKind::Direct);
        assert_eq!(layers[0].content, "Hi");

        assert!(view.insights.is_empty());
        assert!(view.vectors.iter().all(|v| !v.active));
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_console_rejects_second_message() {
        let llm = DelayedMockLlmClient::new("test-model", Duration::from_secs(5));
        llm.queue_text("<R><L1>one</L1></R>");
        let console = TestConsole::builder().llm(llm).build().await;

        console
            .handle
            .send_message("first".to_string(), None, vec![])
            .await
            .unwrap();
        console.wait_for(|v| v.phase == Phase::Scanning).await;

        let err = console
            .handle
            .send_message("second".to_string(), None, vec![])
            .await
            .unwrap_err();
        assert_eq!(err, ConsoleError::Busy(Phase::Scanning));

        let view = console.wait_for(settled(3)).await;
        assert_eq!(console.llm.inner.recorded_requests().len(), 1);
        assert!(view.messages.iter().all(|m| m.content != "second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_runtime_rejects_message_racing_the_first() {
        let console = TestConsole::builder().build().await;
        console.llm.queue_text("<R><L1>one</L1></R>");
        let mut rx = console.handle.subscribe();

        // Both pass the handle's check before the runtime sees either
        let (first, second) = tokio::join!(
            console
                .handle
                .send_message("first".to_string(), None, vec![]),
            console
                .handle
                .send_message("second".to_string(), None, vec![]),
        );
        assert!(first.is_ok());
        assert!(matches!(second, Err(ConsoleError::Busy(_))));

        let view = console.wait_for(settled(3)).await;
        assert_eq!(view.messages[1].content, "first");
        assert_eq!(console.llm.recorded_requests().len(), 1);

        let mut rejected = false;
        while let Ok(event) = rx.try_recv() {
            rejected |= matches!(event, ConsoleEvent::Error { .. });
        }
        assert!(rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_message_is_visible_on_return() {
        let console = TestConsole::builder().build().await;
        console.llm.queue_text("<R><L1>one</L1></R>");

        let request_id = console
            .handle
            .send_message("hello".to_string(), None, vec![])
            .await
            .unwrap();
        assert!(!request_id.is_empty());

        let view = console.handle.view();
        assert_eq!(view.phase, Phase::Scanning);
        assert_eq!(view.messages.last().unwrap().content, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_rejected() {
        let console = TestConsole::builder().build().await;
        let err = console
            .handle
            .send_message("  \n ".to_string(), None, vec![])
            .await
            .unwrap_err();
        assert_eq!(err, ConsoleError::EmptyMessage);
        assert_eq!(console.handle.view().messages.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_failure_appends_critical_error() {
        let console = TestConsole::builder().build().await;
        console
            .llm
            .queue_error(LlmError::network("connection reset"));

        console
            .handle
            .send_message("hello".to_string(), None, vec![])
            .await
            .unwrap();
        let view = console.wait_for(settled(3)).await;

        let last = &view.messages[2];
        assert_eq!(last.role, Role::System);
        assert_eq!(last.content, format!("{CRITICAL_ERROR_PREFIX}connection reset"));
        assert!(view.insights.is_empty());

        // The console accepts input again
        console.llm.queue_text("<R><L1>back</L1></R>");
        console
            .handle
            .send_message("retry".to_string(), None, vec![])
            .await
            .unwrap();
        console.wait_for(settled(5)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_failure_while_weaving() {
        let llm = DelayedMockLlmClient::new("test-model", Duration::from_secs(5));
        llm.queue_error(LlmError::unknown("boom"));
        let console = TestConsole::builder().llm(llm).build().await;

        console
            .handle
            .send_message("hello".to_string(), None, vec![])
            .await
            .unwrap();
        console.wait_for(|v| v.phase == Phase::Weaving).await;

        let view = console.wait_for(settled(3)).await;
        assert_eq!(view.messages[2].content, format!("{CRITICAL_ERROR_PREFIX}boom"));
        assert!(view.vectors.iter().all(|v| !v.active));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inferential_layer_yields_insight() {
        let console = TestConsole::builder().build().await;
        console.llm.queue_text(
            "<R><L1>A</L1><L2>B</L2><L3>KLI: Coupling beats cohesion here</L3></R>",
        );

        console
            .handle
            .send_message("why?".to_string(), None, vec![])
            .await
            .unwrap();
        let view = console.wait_for(settled(3)).await;

        let reply = &view.messages[2];
        assert_eq!(view.insights.len(), 1);
        let insight = &view.insights[0];
        assert_eq!(insight.insight, "Coupling beats cohesion here");
        assert_eq!(insight.source_id, reply.id);
        assert_eq!(insight.id, format!("kli-{}", reply.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_during_weaving_still_collapses() {
        let llm = DelayedMockLlmClient::new("test-model", Duration::from_secs(5));
        llm.queue_text("<R><L1>late</L1></R>");
        let console = TestConsole::builder().llm(llm).build().await;

        console
            .handle
            .send_message("hello".to_string(), None, vec![])
            .await
            .unwrap();

        let weaving = console.wait_for(|v| v.phase == Phase::Weaving).await;
        assert_eq!(weaving.messages.len(), 2);

        let manifested = console.wait_for(|v| v.phase == Phase::Manifested).await;
        assert_eq!(manifested.messages[2].content, "<R><L1>late</L1></R>");
        console.wait_for(settled(3)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_append_is_persisted() {
        let console = TestConsole::builder().build().await;
        console
            .llm
            .queue_text("<R><L1>A</L1><L3>KLI: keep it</L3></R>");

        console
            .handle
            .send_message("hello".to_string(), None, vec![])
            .await
            .unwrap();
        let view = console.wait_for(settled(3)).await;

        // User message, assistant message, insight
        assert_eq!(console.store.save_count(), 3);
        let stored = console.store.snapshot().unwrap();
        assert_eq!(stored.messages, view.messages);
        assert_eq!(stored.insights, view.insights);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_wipes_memory() {
        let console = TestConsole::builder().build().await;
        console
            .llm
            .queue_text("<R><L1>A</L1><L3>KLI: keep it</L3></R>");
        console
            .handle
            .send_message("hello".to_string(), None, vec![])
            .await
            .unwrap();
        console.wait_for(settled(3)).await;
        let mut rx = console.handle.subscribe();

        console.handle.purge().await.unwrap();
        let view = console.wait_for(settled(1)).await;

        assert_eq!(view.messages[0].id, INIT_MESSAGE_ID);
        assert!(view.insights.is_empty());
        assert!(console.store.snapshot().is_none());

        let mut purged = false;
        while let Ok(event) = rx.try_recv() {
            purged |= matches!(event, ConsoleEvent::Purged { ref messages } if messages.len() == 1);
        }
        assert!(purged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_after_purge_is_ignored() {
        let llm = DelayedMockLlmClient::new("test-model", Duration::from_secs(5));
        llm.queue_text("<R><L1>orphan</L1></R>");
        let console = TestConsole::builder().llm(llm).build().await;

        console
            .handle
            .send_message("hello".to_string(), None, vec![])
            .await
            .unwrap();
        console.wait_for(|v| v.phase == Phase::Weaving).await;

        console.handle.purge().await.unwrap();
        console.wait_for(settled(1)).await;

        // Let the abandoned request and any timers run out
        tokio::time::sleep(Duration::from_secs(10)).await;

        let view = console.handle.view();
        assert_eq!(view.phase, Phase::Idle);
        assert_eq!(view.messages.len(), 1);
        assert!(view.vectors.iter().all(|v| !v.active));
        assert!(console.store.snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pinned_vector_prefixes_request() {
        let llm = DelayedMockLlmClient::new("test-model", Duration::from_secs(5));
        llm.queue_text("<R><L1>ok</L1></R>");
        let console = TestConsole::builder().llm(llm).build().await;

        let image = ImageData {
            data: "aGk=".to_string(),
            media_type: "image/png".to_string(),
        };
        console
            .handle
            .send_message(
                "hello".to_string(),
                Some("vE_Sonar".to_string()),
                vec![image],
            )
            .await
            .unwrap();

        let weaving = console.wait_for(|v| v.phase == Phase::Weaving).await;
        let active: Vec<&str> = weaving
            .vectors
            .iter()
            .filter(|v| v.active)
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(active, vec!["vE_Sonar"]);

        let view = console.wait_for(settled(3)).await;
        // Stored text stays verbatim
        assert_eq!(view.messages[1].content, "hello");

        let requests = console.llm.inner.recorded_requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.system.as_deref(), Some(TEST_SYSTEM_PROMPT));
        // The greeting is not part of the model history
        assert_eq!(request.messages.len(), 1);
        let outbound = &request.messages[0];
        assert_eq!(outbound.role, MessageRole::User);
        assert_eq!(
            outbound.content[0],
            ContentBlock::text("[OVERRIDE_VECTOR: vE_Sonar] hello")
        );
        assert!(matches!(outbound.content[1], ContentBlock::Image { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_history_carries_previous_turns() {
        let console = TestConsole::builder().build().await;
        console.llm.queue_text("<R><L1>first</L1></R>");
        console.llm.queue_text("<R><L1>second</L1></R>");

        console
            .handle
            .send_message("one".to_string(), None, vec![])
            .await
            .unwrap();
        console.wait_for(settled(3)).await;
        console
            .handle
            .send_message("two".to_string(), None, vec![])
            .await
            .unwrap();
        console.wait_for(settled(5)).await;

        let requests = console.llm.recorded_requests();
        let second = &requests[1];
        let roles: Vec<MessageRole> = second.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::User, MessageRole::Assistant, MessageRole::User]
        );
        assert_eq!(second.messages[1].content[0], ContentBlock::text("<R><L1>first</L1></R>"));
        assert_eq!(second.messages[2].content[0], ContentBlock::text("two"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_reply_becomes_notice() {
        let console = TestConsole::builder().build().await;
        console.llm.queue_response(LlmResponse {
            content: vec![],
            end_turn: true,
            usage: Usage::default(),
        });

        console
            .handle
            .send_message("hello".to_string(), None, vec![])
            .await
            .unwrap();
        let view = console.wait_for(settled(3)).await;

        let reply = &view.messages[2];
        assert_eq!(reply.content, EMPTY_REPLY_NOTICE);
        assert_eq!(
            reply.layer(LayerKind::Direct).map(|l| l.content.as_str()),
            Some(EMPTY_REPLY_NOTICE)
        );
        assert!(view.insights.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restored_memory_is_resumed() {
        let store = Arc::new(InMemoryStore::new());
        store
            .save(&[Message::user("100", "old question", 100)], &[])
            .await;

        let console = TestConsole::builder().store(store).build().await;
        let view = console.handle.view();
        assert_eq!(view.messages.len(), 2);
        assert_eq!(view.messages[0].content, "old question");
        assert_eq!(view.messages[1].content, RESTORED_TEXT);
        // Restoring does not write
        assert_eq!(console.store.save_count(), 1);

        console.llm.queue_text("<R><L1>welcome back</L1></R>");
        console
            .handle
            .send_message("new".to_string(), None, vec![])
            .await
            .unwrap();
        let view = console.wait_for(settled(4)).await;

        let stored = console.store.snapshot().unwrap();
        assert_eq!(stored.messages, view.messages);
        assert!(view.messages[2].id.parse::<i64>().unwrap() > 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_and_blur() {
        let console = TestConsole::builder().build().await;

        console.handle.focus().await.unwrap();
        console.wait_for(|v| v.phase == Phase::Input).await;
        console.handle.blur().await.unwrap();
        console.wait_for(|v| v.phase == Phase::Idle).await;

        console.handle.focus().await.unwrap();
        console.wait_for(|v| v.phase == Phase::Input).await;
        console.llm.queue_text("<R><L1>ok</L1></R>");
        console
            .handle
            .send_message("from input".to_string(), None, vec![])
            .await
            .unwrap();
        console.wait_for(settled(3)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_store_keeps_console_usable() {
        let store = Arc::new(FailingStore::default());
        let llm = Arc::new(MockLlmClient::new("test-model"));
        llm.queue_text("<R><L1>still here</L1></R>");

        let handle = start_console(
            ConvContext::default(),
            store.clone(),
            llm,
            TEST_SYSTEM_PROMPT.to_string(),
        )
        .await;
        handle
            .send_message("hello".to_string(), None, vec![])
            .await
            .unwrap();

        let view = tokio::time::timeout(Duration::from_secs(60), handle.wait_for(settled(3)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.messages[2].content, "<R><L1>still here</L1></R>");
        assert_eq!(store.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_runtime() {
        let console = TestConsole::builder().build().await;
        console.handle.shutdown();

        let result = console.handle.wait_for(|_| false).await;
        assert_eq!(result.unwrap_err(), ConsoleError::Stopped);
        assert_eq!(console.handle.focus().await, Err(ConsoleError::Stopped));
    }
}
