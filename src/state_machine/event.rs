//! Events that can occur in the console

use crate::llm::ImageSource;
use serde::{Deserialize, Serialize};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Presentation events
    Focus,
    Blur,
    UserMessage {
        text: String,
        /// Vector pinned for this request
        vector: Option<String>,
        images: Vec<ImageData>,
        request_id: String,
    },
    Purge,

    // Pacing timers
    ScanElapsed {
        request_id: String,
    },
    CollapseElapsed {
        request_id: String,
    },
    SettleElapsed {
        request_id: String,
    },

    // Model events
    ModelReply {
        request_id: String,
        text: String,
    },
    ModelError {
        request_id: String,
        message: String,
    },
}

/// Image data attached to a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub data: String,
    pub media_type: String,
}

impl ImageData {
    pub fn to_image_source(&self) -> ImageSource {
        ImageSource::Base64 {
            media_type: self.media_type.clone(),
            data: self.data.clone(),
        }
    }
}
