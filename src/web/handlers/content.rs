// Content moderation handlers.
//
// POST   /api/content/classify        {text} -> classification record
// POST   /api/content/classify-batch  {lines} -> {results, total}
// POST   /api/content/classify-file   plain-text body, ?filename=x.txt|x.csv
// GET    /api/content/progress        current batch progress
// POST   /api/content/feedback        record a correction
// GET    /api/content/feedback        list corrections
// GET    /api/content/history         list classifications (never errors)
// DELETE /api/content/clear-history   remove all classifications
//
// Malformed JSON bodies are reported with the same {error} shape as every
// other failure instead of axum's plain-text rejection.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::service::FeedbackSubmission;
use crate::web::{api_error, AppState};

#[derive(Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Deserialize, Default)]
pub struct FileQuery {
    pub filename: Option<String>,
}

fn bad_body(rejection: JsonRejection) -> Response {
    api_error(StatusCode::BAD_REQUEST, &rejection.body_text())
}

pub async fn classify(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    let text = request.text.unwrap_or_default();
    match state.service.classify(&text).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn classify_batch(
    State(state): State<AppState>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return bad_body(rejection),
    };
    match state.service.classify_batch(request.lines).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn classify_file(
    State(state): State<AppState>,
    Query(params): Query<FileQuery>,
    body: Bytes,
) -> Response {
    let Some(filename) = params.filename else {
        return api_error(StatusCode::BAD_REQUEST, "No file provided");
    };
    match state.service.classify_upload(&filename, body.to_vec()).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn get_progress(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.get_progress().await)
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackSubmission>, JsonRejection>,
) -> Response {
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(_) => return api_error(StatusCode::BAD_REQUEST, "Invalid feedback data"),
    };
    match state.service.submit_feedback(submission).await {
        Ok(_) => Json(serde_json::json!({ "message": "Feedback submitted successfully" }))
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_feedback(State(state): State<AppState>) -> Response {
    match state.service.list_feedback().await {
        Ok(records) => Json(records).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn list_history(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.list_history().await)
}

pub async fn clear_history(State(state): State<AppState>) -> Response {
    match state.service.clear_history().await {
        Ok(outcome) => Json(serde_json::json!({
            "message": "History cleared",
            "deleted_count": outcome,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}
