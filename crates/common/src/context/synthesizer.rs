//! Streaming Synthesizer - streams a cited answer from a reasoning model
//!
//! The model receives one system prompt built from the assembled search
//! context and the user's query, and answers as a stream of reasoning and
//! answer deltas.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::context_stitcher::build_context;
use super::llm::{timeout_error, ChatClient, ChatMessage, ChatRequest};
use super::prompts::synthesis_prompt;
use super::refiner::RefinementResult;
use crate::config::ReasoningConfig;
use crate::errors::{AppError, Result};
use crate::metrics::record_synthesis;
use crate::search::SearchResponse;
use crate::stream::{decode_stream, ChunkStream, WireFormat};

/// Everything the reasoning model is shown for one answer
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub query: String,
    /// Mode text as submitted
    pub mode: String,
    pub results: SearchResponse,
    pub refinement: Option<RefinementResult>,
    pub as_of: NaiveDate,
}

impl SynthesisRequest {
    pub fn context(&self) -> String {
        build_context(&self.query, &self.mode, self.refinement.as_ref(), &self.results)
    }
}

#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    /// Open the answer stream.
    ///
    /// Errors returned here mean no data arrived; errors yielded by the
    /// stream mean it was cut short.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<ChunkStream>;
}

/// Synthesizer backed by an OpenAI-compatible streaming chat endpoint
pub struct Synthesizer {
    chat: ChatClient,
    model: String,
    first_byte_timeout: Duration,
    idle_timeout: Duration,
}

impl Synthesizer {
    pub fn new(config: &ReasoningConfig) -> Result<Self> {
        let chat = ChatClient::new(
            "DeepSeek",
            &config.base_url,
            config.api_key.clone(),
            reqwest::Client::builder().connect_timeout(Duration::from_secs(config.connect_timeout_secs)),
        )?;

        Ok(Self {
            chat,
            model: config.model.clone(),
            first_byte_timeout: Duration::from_secs(config.first_byte_timeout_secs),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.chat.is_configured()
    }
}

#[async_trait]
impl AnswerSynthesizer for Synthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<ChunkStream> {
        self.chat.require_key()?;

        let start = Instant::now();
        let context = request.context();
        let prompt = synthesis_prompt(&request.query, &context, request.as_of);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage::system(prompt),
                ChatMessage::user(request.query.clone()),
            ],
            response_format: None,
            temperature: None,
            max_tokens: None,
            stream: true,
        };

        let opened = tokio::time::timeout(self.first_byte_timeout, self.chat.send(&body)).await;
        let response = match opened {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                record_synthesis(start.elapsed().as_secs_f64(), "error");
                warn!(query = %request.query, error = %e, "Failed to open answer stream");
                return Err(match e {
                    AppError::HttpClient(e) => AppError::Synthesis {
                        message: e.to_string(),
                    },
                    other => other,
                });
            }
            Err(_) => {
                record_synthesis(start.elapsed().as_secs_f64(), "timeout");
                return Err(timeout_error(self.chat.service(), self.first_byte_timeout));
            }
        };

        record_synthesis(start.elapsed().as_secs_f64(), "opened");
        info!(
            query = %request.query,
            mode = %request.mode,
            context_len = context.len(),
            first_byte_ms = start.elapsed().as_millis() as u64,
            "Answer stream opened"
        );

        Ok(decode_stream(
            response.bytes_stream(),
            WireFormat::Sse,
            Some(self.idle_timeout),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::WebResult;

    fn request() -> SynthesisRequest {
        let mut results = SearchResponse::empty("best electric cars 2024");
        results.organic = Some(vec![WebResult {
            title: "Best EVs".into(),
            link: "https://www.caranddriver.com/evs".into(),
            ..Default::default()
        }]);
        SynthesisRequest {
            query: "best electric cars 2024".into(),
            mode: "web".into(),
            results,
            refinement: None,
            as_of: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        }
    }

    #[test]
    fn test_request_context() {
        let context = request().context();
        assert!(context.starts_with("### Search Context\nQuery: best electric cars 2024\n"));
        assert!(context.contains("[1] Best EVs\nSource: https://www.caranddriver.com/evs\n"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let synthesizer = Synthesizer::new(&ReasoningConfig {
            api_key: None,
            ..ReasoningConfig::default()
        })
        .unwrap();
        assert!(!synthesizer.is_configured());

        let err = synthesizer.synthesize(&request()).await.err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }
}
