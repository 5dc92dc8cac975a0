//! Query Refiner - asks a language model for a better search query

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::llm::{timeout_error, ChatClient, ChatCompletion, ChatMessage, ChatRequest, ResponseFormat};
use super::prompts::refine_prompt;
use crate::config::RefinerConfig;
use crate::errors::{AppError, Result};
use crate::metrics::record_refinement;

/// Improved query plus the model's reasoning for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementResult {
    pub refined_query: String,
    pub explanation: String,
}

#[async_trait]
pub trait QueryRefiner: Send + Sync {
    /// Refine `query`. The mode is forwarded to the model verbatim.
    async fn refine(&self, query: &str, mode: &str, as_of: NaiveDate) -> Result<RefinementResult>;
}

/// Refiner backed by a chat completion model in JSON mode
pub struct Refiner {
    chat: ChatClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl Refiner {
    pub fn new(config: &RefinerConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let chat = ChatClient::new(
            "DeepSeek",
            &config.base_url,
            config.api_key.clone(),
            reqwest::Client::builder().timeout(timeout),
        )?;

        Ok(Self {
            chat,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.chat.is_configured()
    }

    async fn request(&self, query: &str, mode: &str, as_of: NaiveDate) -> Result<RefinementResult> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::system(refine_prompt(query, mode, as_of)),
                ChatMessage::user(query),
            ],
            response_format: Some(ResponseFormat { kind: "json_object" }),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            stream: false,
        };

        let response = self.chat.send(&request).await.map_err(|e| match e {
            AppError::HttpClient(e) if e.is_timeout() => timeout_error(self.chat.service(), self.timeout),
            other => other,
        })?;
        let completion: ChatCompletion = response.json().await?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::Refinement {
                message: "no content received from model".to_string(),
            })?;

        parse_refinement(&content)
    }
}

#[async_trait]
impl QueryRefiner for Refiner {
    async fn refine(&self, query: &str, mode: &str, as_of: NaiveDate) -> Result<RefinementResult> {
        if query.trim().is_empty() {
            return Err(AppError::validation("searchTerm", "Search query is required"));
        }
        self.chat.require_key()?;

        let start = Instant::now();
        let result = self.request(query, mode, as_of).await.map_err(|e| match e {
            AppError::Refinement { .. } => e,
            other => AppError::Refinement {
                message: other.to_string(),
            },
        });
        record_refinement(start.elapsed().as_secs_f64(), &self.model, result.is_ok());

        match &result {
            Ok(refinement) => info!(
                query,
                mode,
                refined = %refinement.refined_query,
                latency_ms = start.elapsed().as_millis() as u64,
                "Query refined"
            ),
            Err(e) => warn!(query, mode, error = %e, "Query refinement failed"),
        }
        result
    }
}

/// Validate model output against the two-field refinement schema.
///
/// Both fields are required strings; a missing field is an error rather than
/// an empty default.
pub fn parse_refinement(content: &str) -> Result<RefinementResult> {
    serde_json::from_str(content.trim()).map_err(|e| AppError::Refinement {
        message: format!("model output does not match schema: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_refinement() {
        let result = parse_refinement(
            r#"{"refined_query": "best electric cars 2024 comparison review", "explanation": "Added year", "extra": 1}"#,
        )
        .unwrap();
        assert_eq!(result.refined_query, "best electric cars 2024 comparison review");
        assert_eq!(result.explanation, "Added year");
    }

    #[test]
    fn test_missing_explanation_rejected() {
        let err = parse_refinement(r#"{"refined_query": "x"}"#).unwrap_err();
        assert!(matches!(err, AppError::Refinement { .. }));
        assert!(err.to_string().starts_with("Failed to refine query"));
    }

    #[test]
    fn test_non_json_and_wrong_types_rejected() {
        assert!(parse_refinement("Sure! Here is a better query").is_err());
        assert!(parse_refinement(r#"{"refined_query": 1, "explanation": "x"}"#).is_err());
    }

    #[tokio::test]
    async fn test_refine_requires_key() {
        let refiner = Refiner::new(&RefinerConfig {
            api_key: None,
            ..RefinerConfig::default()
        })
        .unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let err = refiner.refine("rust", "web", date).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration { .. }));

        let err = refiner.refine("", "web", date).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}
