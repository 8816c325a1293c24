//! Server-Sent Events support

use crate::runtime::{ConsoleEvent, ConsoleView};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream
pub fn sse_stream(
    init: ConsoleView,
    broadcast_rx: tokio::sync::broadcast::Receiver<ConsoleEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // Create stream that starts with init event then broadcasts
    let init = futures::stream::once(async move { Ok(init_event(&init)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(event) => Some(Ok(console_event_to_axum(event))),
        Err(_) => None, // Skip lagged messages
    });

    let combined = init.chain(broadcasts);

    Sse::new(combined).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn init_event(view: &ConsoleView) -> Event {
    let data = json!({
        "type": "init",
        "phase": view.phase,
        "messages": view.messages,
        "insights": view.insights,
        "vectors": view.vectors
    });
    Event::default().event("init").data(data.to_string())
}

fn console_event_to_axum(event: ConsoleEvent) -> Event {
    let (event_type, data) = event_payload(event);
    Event::default().event(event_type).data(data.to_string())
}

fn event_payload(event: ConsoleEvent) -> (&'static str, serde_json::Value) {
    match event {
        ConsoleEvent::Phase { phase } => (
            "phase",
            json!({
                "type": "phase",
                "phase": phase
            }),
        ),
        ConsoleEvent::Message { message } => (
            "message",
            json!({
                "type": "message",
                "message": message
            }),
        ),
        ConsoleEvent::Insight { insight } => (
            "insight",
            json!({
                "type": "insight",
                "insight": insight
            }),
        ),
        ConsoleEvent::Vectors { vectors } => (
            "vectors",
            json!({
                "type": "vectors",
                "vectors": vectors
            }),
        ),
        ConsoleEvent::Purged { messages } => (
            "purged",
            json!({
                "type": "purged",
                "messages": messages
            }),
        ),
        ConsoleEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
    }
}
