//! Model registry for managing available LLM providers

use super::{all_models, LlmService, LoggingService};
use std::collections::HashMap;
use std::sync::Arc;

/// Model used for the console when `DEFAULT_MODEL` is not set
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Preferred model for the documentation oracle
const ORACLE_MODEL: &str = "gemini-2.0-flash";

/// Configuration for LLM providers
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    /// Gateway URL that proxies provider APIs and handles auth
    pub gateway: Option<String>,
    /// Default model ID
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            gemini_api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")),
            gateway: non_empty("LLM_GATEWAY"),
            default_model: non_empty("DEFAULT_MODEL"),
        }
    }
}

/// Registry of available LLM models
pub struct ModelRegistry {
    services: HashMap<String, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    /// Create an empty registry for testing purposes
    #[cfg(test)]
    pub fn new_empty() -> Self {
        Self {
            services: HashMap::new(),
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn new(config: &LlmConfig) -> Self {
        let mut services: HashMap<String, Arc<dyn LlmService>> = HashMap::new();

        // Direct mode needs a key; in gateway mode the gateway authenticates
        if config.gemini_api_key.is_some() || config.gateway.is_some() {
            for model_def in all_models() {
                match (model_def.factory)(
                    config.gemini_api_key.as_deref(),
                    config.gateway.as_deref(),
                ) {
                    Ok(service) => {
                        tracing::debug!(
                            model = model_def.id,
                            description = model_def.description,
                            "Model registered"
                        );
                        services.insert(
                            model_def.id.to_string(),
                            Arc::new(LoggingService::new(service)),
                        );
                    }
                    Err(e) => {
                        tracing::warn!(model = model_def.id, error = %e, "Model unavailable");
                    }
                }
            }
        }

        let default_model = config
            .default_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            services,
            default_model,
        }
    }

    /// Get a model by ID
    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    /// Get the default model
    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    /// Get the default model ID
    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// List all available model IDs
    pub fn available_models(&self) -> Vec<String> {
        let mut models: Vec<_> = self.services.keys().cloned().collect();
        models.sort();
        models
    }

    /// Check if any models are available
    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }

    /// Model for documentation queries and ice-breakers.
    /// Prefers the fast model, falling back to the default one.
    pub fn oracle_model(&self) -> Option<Arc<dyn LlmService>> {
        self.get(ORACLE_MODEL).or_else(|| self.default())
    }
}
