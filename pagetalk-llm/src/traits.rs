use async_trait::async_trait;
use pagetalk_common::Result;
use serde::{Deserialize, Serialize};

/// One outbound message in the completion request, already mapped to the
/// wire roles the provider understands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Seam between the chat handler and whichever completion provider is
/// configured. Failures propagate; the caller maps them to a generic
/// processing error at the request boundary.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Run one chat completion over the assembled message sequence and
    /// return the model's text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Check if the completion service is reachable.
    async fn health_check(&self) -> Result<bool>;

    /// Model identifier sent with each request.
    fn model_name(&self) -> &str;
}
