#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client as HttpClient, header::{HeaderMap, HeaderValue, CONTENT_TYPE}};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;

use super::{ChatClient, CompletionResponse, UpstreamError};
use crate::llm::{LlmConfig, LlmType};
use crate::models::chat::ChatMessage;

const CHAT_COMPLETIONS_ROUTE: &str = "/v1/chat/completions";

pub struct OpenAIChatClient {
    http: HttpClient,
    llm_type: LlmType,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f64,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    #[serde(default)]
    message: Option<OpenAIResponseMessage>,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(
        llm_type: LlmType,
        api_key: Option<String>,
        model: String,
        base_url: Option<String>,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_url = base_url.unwrap_or_else(|| llm_type.default_base_url().to_string());
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            llm_type,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        Self::new(
            config.llm_type,
            config.api_key.clone(),
            config.completion_model.clone(),
            config.base_url.clone(),
        )
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else {
            format!("{}{}", base, CHAT_COMPLETIONS_ROUTE)
        }
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f64
    ) -> Result<CompletionResponse, UpstreamError> {
        let url = self.endpoint();

        let req = OpenAIChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| OpenAIMessage { role: &m.role, content: &m.content })
                .collect(),
            temperature,
        };

        let mut builder = self.http.post(&url).json(&req);
        match &self.api_key {
            Some(key) => {
                builder = builder.bearer_auth(key);
            }
            None if self.llm_type.requires_api_key() => {
                return Err(UpstreamError::new(format!("No API key configured for {}", self.llm_type)));
            }
            None => {}
        }

        debug!("Sending {} message(s) to {} (model {})", messages.len(), url, self.model);

        let resp = builder
            .send()
            .await
            .map_err(|e| UpstreamError::new(format!("Request to {} failed: {}", url, e)))?;

        let status = resp.status();
        let raw_body = resp
            .text()
            .await
            .map_err(|e| UpstreamError::new(format!("Failed to read upstream response: {}", e)).with_status(status.as_u16()))?;

        if !status.is_success() {
            return Err(UpstreamError::from_response(status.as_u16(), &raw_body));
        }

        let parsed = serde_json::from_str::<OpenAIResponse>(&raw_body)
            .map_err(|e| UpstreamError::new(format!("Malformed completion response: {}", e)).with_status(status.as_u16()))?;

        let content = parsed.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .unwrap_or_default();

        Ok(CompletionResponse { response: content })
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.base_url.clone())
    }
}
