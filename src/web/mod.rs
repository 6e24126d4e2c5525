// Web server: Axum JSON API over the moderation service.
//
// Every route is a thin wrapper around one ModerationService operation.
// Errors always come back as {"error": "..."} with a non-2xx status, except
// the history listing, which degrades to an empty array.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::service::{ModerationService, ServiceError};

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ModerationService>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(service: Arc<ModerationService>, port: u16, bind: &str) -> Result<()> {
    let app = build_router(AppState { service });

    let addr = format!("{bind}:{port}");
    info!("Mellow API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let content_api = Router::new()
        .route("/classify", post(handlers::content::classify))
        .route("/classify-batch", post(handlers::content::classify_batch))
        .route("/classify-file", post(handlers::content::classify_file))
        .route("/progress", get(handlers::content::get_progress))
        .route(
            "/feedback",
            post(handlers::content::submit_feedback).get(handlers::content::list_feedback),
        )
        .route("/history", get(handlers::content::list_history))
        .route("/clear-history", delete(handlers::content::clear_history));

    Router::new()
        .route("/", get(handlers::status::index))
        .route("/health", get(health))
        .nest("/api/content", content_api)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe: always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::BatchInProgress => StatusCode::CONFLICT,
            ServiceError::Internal(e) => {
                error!(error = %format!("{e:#}"), "Request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        api_error(status, &self.to_string())
    }
}
