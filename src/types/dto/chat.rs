use serde::{Deserialize, Serialize};

use crate::types::context::MapContext;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub map_context: Option<MapContext>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatReply {
    pub fn ok(text: String) -> Self {
        Self {
            text,
            success: true,
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            text: String::new(),
            success: false,
            error: Some(error),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub reply: ChatReply,
    pub summary: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ContextPreview {
    pub prompt_context: String,
    pub summary: String,
}
