use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};

/// JSON body of a streaming chat request.
///
/// `rag_tag` selects a knowledge base; when present the request is grounded
/// and goes to the RAG endpoint instead of the plain chat one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub model: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rag_tag: Option<String>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            message: message.into(),
            rag_tag: None,
        }
    }

    pub fn with_rag_tag(mut self, tag: impl Into<String>) -> Self {
        self.rag_tag = Some(tag.into());
        self
    }

    pub fn is_grounded(&self) -> bool {
        self.rag_tag.is_some()
    }

    /// Reject input that must never reach the wire.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ChatError::validation("Please select a model"));
        }
        if self.message.trim().is_empty() {
            return Err(ChatError::validation("Message must not be empty"));
        }
        if matches!(&self.rag_tag, Some(tag) if tag.trim().is_empty()) {
            return Err(ChatError::validation("Knowledge base tag must not be blank"));
        }
        Ok(())
    }
}

/// Envelope wrapping every simple (non-streaming) backend response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub code: String,
    #[serde(default)]
    pub info: String,
    pub data: Option<T>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub trace_id: Option<String>,
}

/// Application codes the backend uses for success. Both generations of the
/// backend are still deployed.
pub const SUCCESS_CODES: [&str; 2] = ["2000", "20000"];

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        SUCCESS_CODES.contains(&self.code.as_str())
    }
}
