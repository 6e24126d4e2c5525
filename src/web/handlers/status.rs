// Index route: service status plus the list of available endpoints.
//
// Combines the storage mode and scorer choice with record counts so a client
// can tell at a glance whether it is talking to the fallback store.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::service::ServiceError;
use crate::web::AppState;

const ENDPOINTS: &[&str] = &[
    "GET /health",
    "POST /api/content/classify",
    "POST /api/content/classify-batch",
    "POST /api/content/classify-file?filename=<name.txt|name.csv>",
    "GET /api/content/progress",
    "POST /api/content/feedback",
    "GET /api/content/feedback",
    "GET /api/content/history",
    "DELETE /api/content/clear-history",
];

pub async fn index(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let status = state.service.status().await?;
    Ok(Json(serde_json::json!({
        "service": "mellow",
        "version": env!("CARGO_PKG_VERSION"),
        "status": status,
        "endpoints": ENDPOINTS,
    })))
}
