//! Google Gemini provider implementation

use super::types::{ContentBlock, ImageSource, LlmRequest, LlmResponse, MessageRole, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DIRECT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiModel {
    Flash25,
    Flash20,
}

impl GeminiModel {
    pub fn api_name(self) -> &'static str {
        match self {
            GeminiModel::Flash25 => "gemini-2.5-flash",
            GeminiModel::Flash20 => "gemini-2.0-flash",
        }
    }
}

/// Gemini service implementation
pub struct GeminiService {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
    model_id: String,
}

impl GeminiService {
    /// Build a client for `model`. Without an API key the gateway is expected
    /// to authenticate on our behalf.
    pub fn new(
        api_key: Option<String>,
        model: GeminiModel,
        gateway: Option<&str>,
    ) -> Result<Self, LlmError> {
        let endpoint = match gateway {
            Some(gw) => format!(
                "{}/gemini/v1beta/models/{}:generateContent",
                gw.trim_end_matches('/'),
                model.api_name()
            ),
            None => format!("{DIRECT_BASE}/models/{}:generateContent", model.api_name()),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            endpoint,
            model_id: model.api_name().to_string(),
        })
    }
}

pub(super) fn translate_request(request: &LlmRequest) -> GeminiRequest {
    let system_instruction = request.system.as_ref().map(|text| GeminiContent {
        role: None,
        parts: vec![GeminiPart::Text { text: text.clone() }],
    });

    let contents = request
        .messages
        .iter()
        .filter_map(|msg| {
            let role = match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            };

            let parts: Vec<GeminiPart> = msg
                .content
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => GeminiPart::Text { text: text.clone() },
                    ContentBlock::Image {
                        source: ImageSource::Base64 { media_type, data },
                    } => GeminiPart::InlineData {
                        inline_data: GeminiBlob {
                            mime_type: media_type.clone(),
                            data: data.clone(),
                        },
                    },
                })
                .collect();

            (!parts.is_empty()).then(|| GeminiContent {
                role: Some(role.to_string()),
                parts,
            })
        })
        .collect();

    GeminiRequest {
        contents,
        system_instruction,
        generation_config: request.max_tokens.map(|max| GeminiGenerationConfig {
            max_output_tokens: Some(max),
        }),
    }
}

/// A response without candidates (e.g. a blocked prompt) normalizes to empty content
pub(super) fn normalize_response(resp: GeminiResponse) -> LlmResponse {
    let usage = resp.usage_metadata.unwrap_or_default();
    let usage = Usage {
        input_tokens: u64::from(usage.prompt_token_count),
        output_tokens: u64::from(usage.candidates_token_count),
    };

    let Some(candidate) = resp.candidates.into_iter().next() else {
        tracing::warn!("Gemini response carried no candidates");
        return LlmResponse {
            content: vec![],
            end_turn: false,
            usage,
        };
    };

    let content = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| match part {
            GeminiPart::Text { text } if !text.is_empty() => Some(ContentBlock::Text { text }),
            _ => None,
        })
        .collect();

    LlmResponse {
        content,
        end_turn: candidate.finish_reason.as_deref() == Some("STOP"),
        usage,
    }
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let gemini_request = translate_request(request);

        let mut builder = self.client.post(&self.endpoint).json(&gemini_request);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-goog-api-key", key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |resp| resp.error.message);
            return Err(LlmError::from_status(status, &detail));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::unknown(format!("Failed to parse response: {e}")))?;

        Ok(normalize_response(gemini_response))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub(super) enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiBlob,
    },
    /// Parts we never request (function calls, thoughts)
    Other(serde_json::Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiBlob {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    pub usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}
