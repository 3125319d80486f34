#[cfg(test)]
#[path = "forwarder_test.rs"]
mod tests;

use log::info;
use serde::{ Deserialize, Serialize };
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Args;
use crate::error::GatewayError;
use crate::llm::chat::{ new_client as new_chat_client, ChatClient, UpstreamError };
use crate::llm::LlmConfig;
use crate::models::chat::ChatMessage;

pub const DEFAULT_TEMPERATURE: f64 = 0.6;
pub const MESSAGES_REQUIRED: &str = "messages[] is required";

/// Inbound body of `POST /chat`.
#[derive(Debug, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<ChatMessage>>,
    /// Kept loose: anything that is not a JSON number falls back to the default.
    #[serde(default)]
    pub temperature: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: String,
}

/// Relays one chat turn to the upstream completion API.
pub struct CompletionForwarder {
    client: Arc<dyn ChatClient>,
    default_temperature: f64,
    /// `None` leaves the upstream call unbounded.
    timeout: Option<Duration>,
}

impl CompletionForwarder {
    pub fn new(client: Arc<dyn ChatClient>, default_temperature: f64, timeout: Option<Duration>) -> Self {
        Self {
            client,
            default_temperature,
            timeout,
        }
    }

    pub fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat_config = LlmConfig {
            llm_type: args.chat_llm_type
                .parse()
                .map_err(|e| format!("Invalid chat LLM type: {}", e))?,
            base_url: args.chat_base_url.clone(),
            api_key: Some(args.chat_api_key.clone()).filter(|k| !k.is_empty()),
            completion_model: args.chat_model.clone(),
        };
        let client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Type={}, Model={}, BaseURL={}",
            chat_config.llm_type,
            client.get_model(),
            client.get_base_url().as_deref().unwrap_or("adapter default")
        );

        let timeout = Some(args.chat_timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self::new(client, args.default_temperature, timeout))
    }

    pub fn resolve_temperature(&self, requested: Option<&Value>) -> f64 {
        requested
            .and_then(Value::as_f64)
            .unwrap_or(self.default_temperature)
    }

    /// Validates the request, makes one upstream call bounded by the
    /// configured timeout (if any) and returns the completion text.
    pub async fn complete(&self, request: ChatRequest) -> Result<String, GatewayError> {
        let messages = match request.messages {
            Some(messages) if !messages.is_empty() => messages,
            _ => {
                return Err(GatewayError::invalid(MESSAGES_REQUIRED));
            }
        };
        if messages.iter().any(|m| m.role.trim().is_empty()) {
            return Err(GatewayError::invalid("every message needs a role"));
        }

        let temperature = self.resolve_temperature(request.temperature.as_ref());

        let call = self.client.complete(&messages, temperature);
        let completion = match self.timeout {
            Some(timeout) =>
                tokio::time::timeout(timeout, call).await.map_err(|_|
                    UpstreamError::new(
                        format!("Upstream completion timed out after {}ms", timeout.as_millis())
                    )
                )??,
            None => call.await?,
        };

        Ok(completion.response)
    }
}
