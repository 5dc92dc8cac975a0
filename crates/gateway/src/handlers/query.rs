//! Query refinement handler

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::handlers::{invalid, ApiJson};
use crate::AppState;
use rsearch_common::{context::RefinementResult, errors::Result};

/// Refinement request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefineRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 2000))]
    pub search_term: String,

    /// Passed to the model as written
    #[serde(default = "default_mode")]
    pub mode: String,
}

fn default_mode() -> String { "web".to_string() }

/// Rewrite a search term into a sharper query
pub async fn refine_query(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RefineRequest>,
) -> Result<Json<RefinementResult>> {
    request.validate().map_err(invalid)?;

    let today = Utc::now().date_naive();
    let refinement = state
        .refiner
        .refine(&request.search_term, &request.mode, today)
        .await?;

    Ok(Json(refinement))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::handlers::testing::{body_json, post_json};
    use crate::test_support::router;

    #[tokio::test]
    async fn test_refine_returns_result() {
        let response = router()
            .oneshot(post_json("/api/query", json!({ "searchTerm": "best electric cars 2024", "mode": "web" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["refined_query"], "best electric cars 2024 comparison review");
        assert_eq!(body["explanation"], "Added intent");
    }

    #[tokio::test]
    async fn test_refine_rejects_empty_term() {
        let response = router()
            .oneshot(post_json("/api/query", json!({ "mode": "web" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["field"], "search_term");
    }
}
