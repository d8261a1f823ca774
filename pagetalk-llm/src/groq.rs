use crate::traits::{ChatMessage, CompletionClient};
use async_trait::async_trait;
use pagetalk_common::{PagetalkError, Result};
use pagetalk_http::{HttpClient, HttpError};
use serde::{Deserialize, Serialize};

const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1/";

/// Chat-completions client for Groq's OpenAI-compatible API.
pub struct GroqClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

impl GroqClient {
    /// Create a client against the default Groq endpoint.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_endpoint(GROQ_API_BASE, api_key, model)
    }

    /// Create a client against a custom OpenAI-compatible endpoint
    /// (configuration and tests).
    pub fn with_endpoint(endpoint: &str, api_key: String, model: String) -> Result<Self> {
        let client = HttpClient::new(endpoint)
            .map_err(|e| PagetalkError::Config(format!("HttpClient init failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl CompletionClient for GroqClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        tracing::debug!(
            model = %self.model,
            message_count = messages.len(),
            "llm.complete.start"
        );

        let req = ChatCompletionRequest {
            model: &self.model,
            messages,
        };

        let resp: ChatCompletionResponse = self
            .client
            .post_json("chat/completions", Some(&self.api_key), &req)
            .await
            .map_err(http_to_completion)?;

        let text = resp
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PagetalkError::Completion("response contained no choices".into()))?;

        tracing::debug!(
            model = ?resp.model,
            text_len = text.len(),
            "llm.complete.success"
        );
        Ok(text)
    }

    async fn health_check(&self) -> Result<bool> {
        let probe = [ChatMessage::user("Respond with just 'OK'")];
        match self.complete(&probe).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Groq health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn http_to_completion(e: HttpError) -> PagetalkError {
    PagetalkError::Completion(format!("{e}"))
}
