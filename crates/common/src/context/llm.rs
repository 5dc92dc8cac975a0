//! Minimal client for OpenAI-compatible chat completion APIs

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResponseFormat {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Authenticated POSTs to `{base_url}/chat/completions`.
pub(crate) struct ChatClient {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
    service: &'static str,
}

impl ChatClient {
    pub fn new(
        service: &'static str,
        base_url: &str,
        api_key: Option<String>,
        builder: reqwest::ClientBuilder,
    ) -> Result<Self> {
        let client = builder.build().map_err(|e| AppError::Internal {
            message: format!("Failed to create HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            service,
        })
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Fails with a configuration error when no key is set.
    pub fn require_key(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(AppError::Configuration {
                message: format!("{} API key not configured", self.service),
            })
        }
    }

    /// Send a request; non-2xx responses become [`AppError::Upstream`].
    pub async fn send(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response> {
        self.require_key()?;
        let api_key = self.api_key.as_deref().unwrap_or_default();

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream {
                service: self.service.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

pub(crate) fn timeout_error(service: &str, timeout: Duration) -> AppError {
    AppError::Timeout {
        service: service.to_string(),
        timeout_ms: timeout.as_millis() as u64,
    }
}
