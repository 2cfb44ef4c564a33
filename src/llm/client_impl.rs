use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{ScriptGenerator, ScriptRequest};
use super::prompts::{build_user_prompt, SYSTEM_PROMPT};
use crate::config::LlmConfig;
use crate::error::HandlerError;
use crate::util::SecretString;

/// Generation temperature is fixed; callers only control the prompt.
const TEMPERATURE: f32 = 0.7;

/// Client for OpenAI-compatible `/chat/completions` endpoints. OpenAI,
/// DeepSeek and Polza all speak this shape; they differ only in base URL,
/// model name and credential.
pub struct ChatCompletionClient {
    api_key: SecretString,
    model: String,
    base_url: String,
    max_tokens: u32,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl ChatCompletionClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, HandlerError> {
        Ok(Self {
            api_key: api_key.into(),
            model,
            base_url,
            max_tokens,
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .context("failed to build HTTP client")?,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, HandlerError> {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
            config.max_tokens,
            config.timeout_secs,
        )
    }
}

fn transport_error(err: reqwest::Error) -> HandlerError {
    if err.is_timeout() {
        HandlerError::ProviderTimeout
    } else {
        HandlerError::Other(anyhow!(err).context("failed to reach the generation provider"))
    }
}

#[async_trait]
impl ScriptGenerator for ChatCompletionClient {
    async fn generate(&self, request: &ScriptRequest) -> Result<String, HandlerError> {
        let chat_request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: build_user_prompt(request),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!("Calling chat-completion API at {} with model {}", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.api_key.expose()))
            .json(&chat_request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(HandlerError::Provider { status, message });
        }

        let api_response: ChatResponse = response.json().await.map_err(|err| {
            if err.is_timeout() {
                HandlerError::ProviderTimeout
            } else {
                HandlerError::Other(anyhow!(err).context("failed to parse provider response"))
            }
        })?;

        api_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("no choices in provider response").into())
    }
}
