// Playground HTTP facade
//
// Routes:
// - GET  /healthz
// - GET  /tasks
// - POST /tasks/:task_name/run
// - GET  /runs/:workflow_run_id/status
//
// plus the OpenAPI document at /api-doc/openapi.json and Swagger UI at
// /swagger-ui. The router is built over any TaskRunner, so the same routes
// serve the hosted platform and the in-process orchestrator.

pub mod config;
pub mod error;
pub mod openapi;
pub mod runs;
pub mod tasks;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use playground_core::TaskRunner;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub use config::{ServerConfig, ServerConfigError};
pub use error::{ApiError, ErrorResponse};
pub use openapi::ApiDoc;

/// State shared by all routes
#[derive(Clone)]
pub struct AppState {
    pub runner: TaskRunner,
}

impl AppState {
    pub fn new(runner: TaskRunner) -> Self {
        Self { runner }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /healthz - Liveness probe
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Build the full application router
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let app = Router::new()
        .route("/healthz", get(healthz))
        .merge(tasks::routes(state.clone()))
        .merge(runs::routes(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()));

    let cors_origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let app = if cors_origins.is_empty() {
        app
    } else {
        tracing::info!(origins = ?cors_origins, "CORS origins configured");
        app.layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(cors_origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN]),
        )
    };

    app.layer(TraceLayer::new_for_http())
}

/// Bind `config`'s address and serve `app` until `shutdown` resolves
pub async fn serve<F>(app: Router, config: &ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    use anyhow::Context;

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")
}
