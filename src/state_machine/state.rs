//! Console state types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Visible phase of the console, as consumed by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Input,
    Scanning,
    Weaving,
    Collapsing,
    Manifested,
}

impl Phase {
    /// Whether the composition surface accepts a new message
    pub fn accepts_input(self) -> bool {
        matches!(self, Phase::Idle | Phase::Input | Phase::Manifested)
    }
}

/// Console state
///
/// Pipeline states carry the id of the request they belong to, so timer and
/// model events from an abandoned request can be recognised and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConvState {
    /// Ready for input, nothing pending
    #[default]
    Idle,

    /// Composition surface focused
    Input,

    /// Request sent, scan dwell running
    Scanning {
        request_id: String,
        /// Vector pinned by the user for this request
        vector: Option<String>,
        /// Model reply that arrived before the scan dwell elapsed
        early_reply: Option<String>,
    },

    /// Scan dwell over, waiting on the model
    Weaving { request_id: String },

    /// Reply received, collapse dwell running
    Collapsing { request_id: String, reply: String },

    /// Response appended, settle dwell running
    Manifested { request_id: String },
}

impl ConvState {
    pub fn phase(&self) -> Phase {
        match self {
            ConvState::Idle => Phase::Idle,
            ConvState::Input => Phase::Input,
            ConvState::Scanning { .. } => Phase::Scanning,
            ConvState::Weaving { .. } => Phase::Weaving,
            ConvState::Collapsing { .. } => Phase::Collapsing,
            ConvState::Manifested { .. } => Phase::Manifested,
        }
    }

    /// Id of the request this state belongs to, if any
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ConvState::Idle | ConvState::Input => None,
            ConvState::Scanning { request_id, .. }
            | ConvState::Weaving { request_id }
            | ConvState::Collapsing { request_id, .. }
            | ConvState::Manifested { request_id } => Some(request_id),
        }
    }
}

/// Default scan dwell before weaving starts
pub const DEFAULT_SCAN_DWELL: Duration = Duration::from_millis(1200);
/// Default collapse dwell before the response is manifested
pub const DEFAULT_COLLAPSE_DWELL: Duration = Duration::from_millis(800);
/// Default dwell in `Manifested` before returning to idle
pub const DEFAULT_SETTLE_DWELL: Duration = Duration::from_millis(3000);

/// Context for the console (immutable configuration)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvContext {
    pub scan_dwell: Duration,
    pub collapse_dwell: Duration,
    pub settle_dwell: Duration,
}

impl Default for ConvContext {
    fn default() -> Self {
        Self {
            scan_dwell: DEFAULT_SCAN_DWELL,
            collapse_dwell: DEFAULT_COLLAPSE_DWELL,
            settle_dwell: DEFAULT_SETTLE_DWELL,
        }
    }
}

impl ConvContext {
    /// Read dwell overrides (`VRA_SCAN_MS`, `VRA_COLLAPSE_MS`, `VRA_SETTLE_MS`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scan_dwell: env_millis("VRA_SCAN_MS").unwrap_or(defaults.scan_dwell),
            collapse_dwell: env_millis("VRA_COLLAPSE_MS").unwrap_or(defaults.collapse_dwell),
            settle_dwell: env_millis("VRA_SETTLE_MS").unwrap_or(defaults.settle_dwell),
        }
    }
}

fn env_millis(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .map(Duration::from_millis)
}
