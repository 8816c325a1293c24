//! Model definitions
//!
//! Every model the console can talk to, in one place.

use super::gemini::{GeminiModel, GeminiService};
use super::{LlmError, LlmService};
use std::sync::Arc;

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID
    pub id: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Factory function to create the service from an optional key and gateway
    pub factory: fn(Option<&str>, Option<&str>) -> Result<Arc<dyn LlmService>, LlmError>,
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gemini-2.5-flash",
            description: "Gemini 2.5 Flash (console kernel)",
            factory: |api_key, gateway| {
                Ok(Arc::new(GeminiService::new(
                    api_key.map(str::to_string),
                    GeminiModel::Flash25,
                    gateway,
                )?))
            },
        },
        ModelDef {
            id: "gemini-2.0-flash",
            description: "Gemini 2.0 Flash (fast, documentation oracle)",
            factory: |api_key, gateway| {
                Ok(Arc::new(GeminiService::new(
                    api_key.map(str::to_string),
                    GeminiModel::Flash20,
                    gateway,
                )?))
            },
        },
    ]
}
