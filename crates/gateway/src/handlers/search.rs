//! Search handler

use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::handlers::{invalid, ApiJson};
use crate::AppState;
use rsearch_common::{
    errors::Result,
    search::{SearchMode, SearchResponse},
};

/// Search request
#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 2000))]
    pub q: String,

    /// Defaults to web
    #[serde(default)]
    pub mode: Option<String>,
}

/// Run one provider search and return the normalized envelope
pub async fn search(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> Result<Json<SearchResponse>> {
    request.validate().map_err(invalid)?;

    let mode = match request.mode.as_deref() {
        Some(mode) => mode.parse::<SearchMode>()?,
        None => SearchMode::Web,
    };

    let results = state.provider.search(&request.q, mode).await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::handlers::testing::{body_json, post_json};
    use crate::test_support::router;

    #[tokio::test]
    async fn test_search_defaults_to_web() {
        let response = router()
            .oneshot(post_json("/api/search", json!({ "q": "rust" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["searchParameters"]["q"], "rust");
        assert_eq!(body["organic"][0]["link"], "https://example.com");
    }

    #[tokio::test]
    async fn test_search_rejects_unknown_mode() {
        let response = router()
            .oneshot(post_json("/api/search", json!({ "q": "rust", "mode": "maps" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["details"]["field"], "mode");
    }

    #[tokio::test]
    async fn test_provider_status_is_passed_through() {
        let response = router()
            .oneshot(post_json("/api/search", json!({ "q": "provider down", "mode": "news" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
        assert_eq!(body["error"]["details"]["service"], "Serper");
    }

    #[tokio::test]
    async fn test_malformed_body_keeps_error_shape() {
        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/api/search")
            .header(axum::http::header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{\"q\": "))
            .unwrap();
        let response = router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "INVALID_FORMAT");
    }
}
