//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub search: CheckResult,
    pub refiner: CheckResult,
    pub reasoning: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn credential(provider: &str, configured: bool, variable: &str) -> Self {
        Self {
            status: if configured { "up" } else { "down" }.to_string(),
            provider: provider.to_string(),
            error: (!configured).then(|| format!("{} is not set", variable)),
        }
    }

    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness probe - reports which provider credentials are configured
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let preferences = &state.config.preferences;
    let credentials = state.credentials;

    let checks = HealthChecks {
        search: CheckResult::credential(&preferences.search_provider, credentials.search, "SERPER_API_KEY"),
        refiner: CheckResult::credential(&preferences.ai_provider, credentials.refiner, "DEEPSEEK_API_KEY"),
        reasoning: CheckResult::credential(&preferences.ai_provider, credentials.reasoning, "DEEPSEEK_API_KEY"),
    };

    let all_healthy = checks.search.is_up() && checks.refiner.is_up() && checks.reasoning.is_up();

    Json(ReadyResponse {
        status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
        checks,
    })
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    use crate::handlers::testing::body_json;
    use crate::test_support::router;

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_ready_reports_missing_credentials() {
        let response = router()
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;

        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["checks"]["search"]["status"], "up");
        assert_eq!(body["checks"]["search"]["provider"], "serper");
        assert_eq!(body["checks"]["reasoning"]["status"], "down");
        assert_eq!(body["checks"]["reasoning"]["error"], "DEEPSEEK_API_KEY is not set");
    }
}
