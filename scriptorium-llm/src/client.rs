use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Message;
use crate::wire::{ApiError, ChatCompletionRequest, ChatCompletionResponse, ModelList};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("chat provider failed: {0}")]
    Provider(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Per-call overrides; `None` falls back to the client defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerateOptions {
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: None,
        }
    }
}

/// The generation seam agents depend on; tests substitute scripted
/// implementations so workflows run without a live backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        messages: &[Message],
        options: GenerateOptions,
    ) -> Result<String, GenerationError>;
}

/// Client for any OpenAI-compatible chat endpoint.
///
/// Local backends usually need no API key; the client sends none.
#[derive(Clone, Debug)]
pub struct ChatClient {
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<Self, GenerationError> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .map_err(|err| GenerationError::Provider(format!("invalid base url: {err}")))?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|err| GenerationError::Provider(err.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
            max_tokens,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lists the models the backend serves.
    pub async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let url = format!("{}/models", self.base_url);
        let list: ModelList = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| GenerationError::Provider(err.to_string()))?
            .error_for_status()
            .map_err(|err| GenerationError::Provider(err.to_string()))?
            .json()
            .await
            .map_err(|err| GenerationError::InvalidResponse(err.to_string()))?;
        Ok(list.data.into_iter().map(|entry| entry.id).collect())
    }

    /// Connectivity probe: true when the backend answers the models listing.
    pub async fn test_connection(&self) -> bool {
        self.list_models().await.is_ok()
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    async fn generate(
        &self,
        messages: &[Message],
        options: GenerateOptions,
    ) -> Result<String, GenerationError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            temperature: Some(options.temperature.unwrap_or(self.temperature)),
            max_tokens: Some(options.max_tokens.unwrap_or(self.max_tokens)),
            stream: false,
        };

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|err| GenerationError::Provider(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = match response.json::<ApiError>().await {
                Ok(body) => body.error.message,
                Err(_) => status.to_string(),
            };
            return Err(GenerationError::Provider(detail));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| GenerationError::InvalidResponse(err.to_string()))?;
        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::InvalidResponse("no choices returned".into()))?;
        choice
            .message
            .content
            .ok_or_else(|| GenerationError::InvalidResponse("empty completion content".into()))
    }
}
