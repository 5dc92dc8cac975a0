use async_trait::async_trait;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::normalize::normalize;
use super::types::SearchResponse;
use super::{SearchMode, SEARCH_GEOGRAPHY, SEARCH_LANGUAGE};
use crate::config::SearchProviderConfig;
use crate::errors::{AppError, Result};
use crate::metrics::record_search;

const SERVICE: &str = "Serper";

/// External search provider seam
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run one search and return the normalized envelope
    async fn search(&self, query: &str, mode: SearchMode) -> Result<SearchResponse>;
}

#[derive(Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    gl: &'static str,
    hl: &'static str,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    engine: Option<&'static str>,
}

/// Serper (Google Search) client
pub struct SerperClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

impl SerperClient {
    pub fn new(config: &SearchProviderConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone().filter(|key| !key.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::Timeout {
                service: SERVICE.to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            AppError::HttpClient(e)
        }
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str, mode: SearchMode) -> Result<SearchResponse> {
        let api_key = self.api_key.as_deref().ok_or_else(|| AppError::Configuration {
            message: "Serper API key not configured".to_string(),
        })?;
        if query.trim().is_empty() {
            return Err(AppError::validation("q", "Search query is required"));
        }

        let start = Instant::now();
        let (kind, engine) = mode.engine_override().unzip();
        let body = SerperRequest {
            q: query,
            gl: SEARCH_GEOGRAPHY,
            hl: SEARCH_LANGUAGE,
            kind,
            engine,
        };

        let url = format!("{}/{}", self.base_url, mode.endpoint());
        let response = self
            .client
            .post(&url)
            .header("X-API-KEY", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), mode = %mode, "Search provider rejected request");
            return Err(AppError::Upstream {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;
        let results = normalize(mode, query, payload)?;

        let count = results.count_for(mode);
        record_search(start.elapsed().as_secs_f64(), mode.as_str(), count);
        info!(
            query,
            mode = %mode,
            results = count,
            latency_ms = start.elapsed().as_millis() as u64,
            "Search complete"
        );

        Ok(results)
    }
}
