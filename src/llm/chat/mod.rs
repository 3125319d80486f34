pub mod openai;

use async_trait::async_trait;
use serde_json::Value;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use super::LlmConfig;
use self::openai::OpenAIChatClient;
use crate::models::chat::ChatMessage;

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// A failed upstream completion call. `body` holds the provider's own JSON
/// error document when it sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamError {
    pub message: String,
    pub status: Option<u16>,
    pub body: Option<Value>,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Builds the error for a non-success HTTP answer, keeping the body as
    /// structured JSON when it parses and as raw text otherwise.
    pub fn from_response(status: u16, raw_body: &str) -> Self {
        match serde_json::from_str::<Value>(raw_body) {
            Ok(body) =>
                Self {
                    message: format!("upstream returned status {}", status),
                    status: Some(status),
                    body: Some(body),
                },
            Err(_) if raw_body.trim().is_empty() =>
                Self {
                    message: format!("upstream returned status {}", status),
                    status: Some(status),
                    body: None,
                },
            Err(_) =>
                Self {
                    message: format!("upstream returned status {}: {}", status, raw_body.trim()),
                    status: Some(status),
                    body: None,
                },
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn diagnostic(&self) -> Value {
        match &self.body {
            Some(body) => body.clone(),
            None => Value::String(self.message.clone()),
        }
    }
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for UpstreamError {}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Issues exactly one completion call and returns the first choice's text.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64
    ) -> Result<CompletionResponse, UpstreamError>;

    fn get_model(&self) -> String;
    fn get_base_url(&self) -> Option<String>;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    // Every supported provider speaks the OpenAI chat completions schema.
    let client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
