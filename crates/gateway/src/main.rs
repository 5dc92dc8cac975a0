//! rSearch API Gateway
//!
//! The HTTP surface of the search pipeline.
//! Handles:
//! - Query refinement, search and streamed synthesis endpoints
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics, tracing)

mod handlers;
mod middleware;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use rsearch_common::{
    config::AppConfig,
    context::{AnswerSynthesizer, QueryRefiner, Refiner, Synthesizer},
    errors::Result,
    metrics,
    search::{OgImageClient, SearchProvider, SerperClient},
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::{signal, sync::Notify};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::middleware::rate_limit::RateLimit;

/// Which provider credentials are present
#[derive(Debug, Clone, Copy)]
pub struct Credentials {
    pub search: bool,
    pub refiner: bool,
    pub reasoning: bool,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub refiner: Arc<dyn QueryRefiner>,
    pub provider: Arc<dyn SearchProvider>,
    pub synthesizer: Arc<dyn AnswerSynthesizer>,
    pub og_image: Arc<OgImageClient>,
    pub credentials: Credentials,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let refiner = Refiner::new(&config.refiner)?;
        let provider = SerperClient::new(&config.search)?;
        let synthesizer = Synthesizer::new(&config.reasoning)?;
        let og_image = OgImageClient::new(config.page_fetch_timeout())?;

        let credentials = Credentials {
            search: provider.is_configured(),
            refiner: refiner.is_configured(),
            reasoning: synthesizer.is_configured(),
        };

        Ok(Self {
            config: Arc::new(config),
            refiner: Arc::new(refiner),
            provider: Arc::new(provider),
            synthesizer: Arc::new(synthesizer),
            og_image: Arc::new(og_image),
            credentials,
        })
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting rSearch API Gateway v{}", rsearch_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                metrics::UPSTREAM_BUCKETS,
            )?
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    metrics::register_metrics();

    let state = AppState::from_config(config)?;
    let credentials = state.credentials;
    if !credentials.search {
        warn!("SERPER_API_KEY is not set, /api/search will fail");
    }
    if !credentials.refiner || !credentials.reasoning {
        warn!("DEEPSEEK_API_KEY is not set, refinement and synthesis will fail");
    }

    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port).parse()?;
    let drain_timeout = state.config.shutdown_timeout();
    let app = create_router(state);

    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Open answer streams get `drain_timeout` to finish once shutdown starts
    let shutting_down = Arc::new(Notify::new());
    let signalled = Arc::clone(&shutting_down);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signalled.notify_one();
        })
        .into_future();

    tokio::select! {
        result = server => result?,
        _ = async {
            shutting_down.notified().await;
            tokio::time::sleep(drain_timeout).await;
        } => warn!(timeout_secs = drain_timeout.as_secs(), "Shutdown timeout elapsed, dropping open connections"),
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut api_routes = Router::new()
        .route("/query", post(handlers::query::refine_query))
        .route("/search", post(handlers::search::search))
        .route("/rsearch", post(handlers::rsearch::rsearch))
        .route("/og-image", get(handlers::og_image::og_image));

    let limits = &state.config.rate_limit;
    if limits.enabled {
        let limiter = RateLimit::new(limits.requests_per_second, limits.burst);
        api_routes = api_routes.route_layer(from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api", api_routes)
        .route_layer(from_fn(middleware::metrics::track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
