//! Streamed answer synthesis handler
//!
//! Relays the reasoning model's output as newline-delimited JSON records,
//! `{"reasoning_content": ...}` or `{"content": ...}`, one per line.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use futures::StreamExt;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::handlers::{invalid, ApiJson};
use crate::AppState;
use rsearch_common::{
    context::{RefinementResult, SynthesisRequest},
    errors::Result,
    search::SearchResponse,
};

/// Synthesis request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RsearchRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 2000))]
    pub search_term: String,

    #[serde(default)]
    pub search_results: SearchResponse,

    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default)]
    pub refined_query: Option<RefinedQuery>,
}

/// Refinement as the client echoes it back
#[derive(Debug, Deserialize)]
pub struct RefinedQuery {
    pub query: String,
    #[serde(default)]
    pub explanation: String,
}

impl From<RefinedQuery> for RefinementResult {
    fn from(refined: RefinedQuery) -> Self {
        RefinementResult {
            refined_query: refined.query,
            explanation: refined.explanation,
        }
    }
}

fn default_mode() -> String { "web".to_string() }

/// Stream a synthesized answer for already-fetched results
pub async fn rsearch(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RsearchRequest>,
) -> Result<Response> {
    request.validate().map_err(invalid)?;

    let synthesis = SynthesisRequest {
        query: request.search_term,
        mode: request.mode,
        results: request.search_results,
        refinement: request.refined_query.map(RefinementResult::from),
        as_of: Utc::now().date_naive(),
    };

    info!(
        query = %synthesis.query,
        mode = %synthesis.mode,
        sources = synthesis.results.result_count(),
        "Opening synthesis stream"
    );

    let chunks = state.synthesizer.synthesize(&synthesis).await?;

    // An error after the headers went out can only cut the body short
    let body = chunks.map(|chunk| match chunk {
        Ok(chunk) => Ok(Bytes::from(chunk.to_ndjson_line())),
        Err(e) => {
            warn!(error = %e, "Synthesis stream interrupted");
            Err(std::io::Error::other(e.to_string()))
        }
    });

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::{header, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::handlers::testing::{body_json, body_text, post_json};
    use crate::test_support::router;

    #[tokio::test]
    async fn test_streams_ndjson_records() {
        let response = router()
            .oneshot(post_json(
                "/api/rsearch",
                json!({
                    "searchTerm": "best electric cars 2024",
                    "mode": "web",
                    "searchResults": { "organic": [{ "title": "Example", "link": "https://example.com" }] },
                    "refinedQuery": { "query": "best electric cars 2024 comparison", "explanation": "Added intent" }
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");

        let text = body_text(response).await;
        let records: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["reasoning_content"], "Thinking about best electric cars 2024");
        assert_eq!(records[1]["content"], "See [Example](https://example.com).");
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_rejects_missing_search_term() {
        let response = router()
            .oneshot(post_json("/api/rsearch", json!({ "searchResults": {} })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }
}
