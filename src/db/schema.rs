//! Memory schema and persisted record types

use serde::{Deserialize, Serialize};

/// SQL schema for initialization
///
/// The console keeps its whole memory in a flat key/value table, one JSON
/// document per key, so a snapshot is written and read as a unit.
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS memory (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Key holding the JSON array of messages
pub const KEY_MESSAGES: &str = "messages";
/// Key holding the JSON array of insights
pub const KEY_INSIGHTS: &str = "insights";
/// Key holding the last-active timestamp (informational only)
pub const KEY_LAST_ACTIVE: &str = "last_active";

/// Every key owned by the memory store
pub const ALL_KEYS: [&str; 3] = [KEY_MESSAGES, KEY_INSIGHTS, KEY_LAST_ACTIVE];

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    /// Serialized with the hosted model's name for its own turns
    #[serde(rename = "model")]
    Assistant,
}

/// Semantic kind of a manifested layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Direct,
    Structural,
    Inferential,
}

impl LayerKind {
    /// All kinds in manifestation order
    pub const ALL: [LayerKind; 3] = [
        LayerKind::Direct,
        LayerKind::Structural,
        LayerKind::Inferential,
    ];

    /// Stable layer id (`l1`, `l2`, `l3`)
    pub fn layer_id(self) -> &'static str {
        match self {
            LayerKind::Direct => "l1",
            LayerKind::Structural => "l2",
            LayerKind::Inferential => "l3",
        }
    }

    /// Inner tag name used on the wire (`L1`, `L2`, `L3`)
    pub fn tag(self) -> &'static str {
        match self {
            LayerKind::Direct => "L1",
            LayerKind::Structural => "L2",
            LayerKind::Inferential => "L3",
        }
    }
}

/// One structured facet of a manifested response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub content: String,
}

impl Layer {
    pub fn new(kind: LayerKind, content: impl Into<String>) -> Self {
        Self {
            id: kind.layer_id().to_string(),
            kind,
            content: content.into(),
        }
    }
}

/// One turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layers: Option<Vec<Layer>>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Message {
    pub fn user(id: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            role: Role::User,
            content: text.into(),
            layers: None,
            timestamp,
        }
    }

    pub fn system(id: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            role: Role::System,
            content: text.into(),
            layers: None,
            timestamp,
        }
    }

    pub fn assistant(
        id: impl Into<String>,
        raw: impl Into<String>,
        layers: Vec<Layer>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: raw.into(),
            layers: Some(layers),
            timestamp,
        }
    }

    /// First layer of the given kind, if any
    #[allow(dead_code)] // Read-side helper for presentation and tests
    pub fn layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.layers.as_ref()?.iter().find(|l| l.kind == kind)
    }
}

/// A distilled learning fragment (KLI)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub id: String,
    pub timestamp: i64,
    pub insight: String,
    /// Id of the assistant message this insight was derived from
    pub source_id: String,
}

/// Durable record of the whole console memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub messages: Vec<Message>,
    #[serde(rename = "kliItems")]
    pub insights: Vec<Insight>,
}
