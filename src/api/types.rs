//! API request and response types

use crate::oracle::{DocSection, OracleTurn};
use crate::state_machine::ImageData;
use serde::{Deserialize, Serialize};

/// Request to send a console message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
    /// Expert vector to pin for this request
    #[serde(default)]
    pub vector: Option<String>,
    #[serde(default)]
    pub images: Vec<ImageData>,
}

/// Response for an accepted message
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub request_id: String,
}

/// Response for focus, blur and purge
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Response with the documentation library
#[derive(Debug, Serialize)]
pub struct DocsResponse {
    pub docs: Vec<DocSection>,
}

/// Question for the documentation Oracle
#[derive(Debug, Deserialize)]
pub struct DocQueryRequest {
    pub query: String,
    /// Id of the page the user is reading
    #[serde(default)]
    pub active_doc: Option<String>,
    #[serde(default)]
    pub history: Vec<OracleTurn>,
}

#[derive(Debug, Serialize)]
pub struct DocQueryResponse {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct IceBreakersResponse {
    pub questions: Vec<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
