//! HTTP API tests: drive the router in-process with tower's `oneshot`.
//!
//! Storage is the fallback file store in a temp directory, so these run
//! without a database.

#![cfg(feature = "web")]

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use mellow::config::StorageSettings;
use mellow::db::PersistenceGateway;
use mellow::decision::DecisionEngine;
use mellow::lexicon::Lexicon;
use mellow::pipeline::Moderator;
use mellow::service::ModerationService;
use mellow::toxicity::adapter::ScoringAdapter;
use mellow::toxicity::traits::{ToxicityResult, ToxicityScorer};
use mellow::web::{build_router, AppState};

struct FixedScorer(f64);

#[async_trait]
impl ToxicityScorer for FixedScorer {
    async fn score_text(&self, _text: &str) -> anyhow::Result<ToxicityResult> {
        Ok(ToxicityResult::new("toxicity", self.0))
    }
}

fn data_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("mellow-http-{name}-{}", std::process::id()))
}

async fn app(name: &str) -> Router {
    let engine = DecisionEngine::new(
        ScoringAdapter::from_external(Ok(Box::new(FixedScorer(0.1)))),
        Arc::new(Lexicon::builtin().unwrap()),
    );
    let settings = StorageSettings {
        data_dir: data_dir(name),
        ..StorageSettings::default()
    };
    let gateway = PersistenceGateway::fallback_only(&settings).await.unwrap();
    let service = ModerationService::new(
        Arc::new(Moderator::with_seed(engine, 3)),
        Arc::new(gateway),
    );
    build_router(AppState {
        service: Arc::new(service),
    })
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn classify_returns_record() {
    let app = app("classify").await;
    let (status, body) = send(
        &app,
        post_json("/api/content/classify", json!({ "text": "you are so stupid" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["classification"], "toxic");
    assert_eq!(body["toxic_signals"], json!(["stupid"]));
    assert_eq!(body["source"], "direct");
    assert!(body["rewritten_text"].is_string());

    std::fs::remove_dir_all(data_dir("classify")).unwrap();
}

#[tokio::test]
async fn classify_empty_text_is_400() {
    let app = app("empty").await;
    for payload in [json!({ "text": "" }), json!({})] {
        let (status, body) = send(&app, post_json("/api/content/classify", payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No text provided");
    }

    let (_, history) = send(&app, get("/api/content/history")).await;
    assert_eq!(history, json!([]));

    std::fs::remove_dir_all(data_dir("empty")).unwrap();
}

#[tokio::test]
async fn malformed_json_is_400_with_error_body() {
    let app = app("malformed").await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/content/classify")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    std::fs::remove_dir_all(data_dir("malformed")).unwrap();
}

#[tokio::test]
async fn history_lists_newest_first_and_clears() {
    let app = app("history").await;
    for text in ["first", "second"] {
        let request = post_json("/api/content/classify", json!({ "text": text }));
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let (status, history) = send(&app, get("/api/content/history")).await;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["second", "first"]);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/content/clear-history")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "History cleared");
    assert_eq!(body["deleted_count"], 0);

    let (_, history) = send(&app, get("/api/content/history")).await;
    assert_eq!(history, json!([]));

    std::fs::remove_dir_all(data_dir("history")).unwrap();
}

#[tokio::test]
async fn feedback_validates_and_lists() {
    let app = app("feedback").await;

    let (status, body) = send(
        &app,
        post_json(
            "/api/content/feedback",
            json!({ "originalText": "hm", "correctClassification": "spicy" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid feedback data");

    let (status, body) = send(
        &app,
        post_json(
            "/api/content/feedback",
            json!({
                "originalText": "you fool",
                "originalClassification": "toxic",
                "correctClassification": "offensive",
                "comment": "a bit harsh"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Feedback submitted successfully");

    let (status, list) = send(&app, get("/api/content/feedback")).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["corrected_classification"], "offensive");
    assert_eq!(list[0]["comment"], "a bit harsh");

    std::fs::remove_dir_all(data_dir("feedback")).unwrap();
}

#[tokio::test]
async fn classify_batch_and_progress() {
    let app = app("batch").await;
    let (status, body) = send(
        &app,
        post_json(
            "/api/content/classify-batch",
            json!({ "lines": ["hello there", "", "you idiot"] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["results"][1]["classification"], "toxic");

    let (status, progress) = send(&app, get("/api/content/progress")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        progress,
        json!({ "total": 2, "processed": 2, "in_progress": false, "error": null })
    );

    std::fs::remove_dir_all(data_dir("batch")).unwrap();
}

#[tokio::test]
async fn classify_file_checks_extension() {
    let app = app("upload").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/content/classify-file?filename=notes.pdf")
        .body(Body::from("hello"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Invalid file type: notes.pdf. Only .txt and .csv files are allowed"
    );

    let request = Request::builder()
        .method("POST")
        .uri("/api/content/classify-file")
        .body(Body::from("hello"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file provided");

    let request = Request::builder()
        .method("POST")
        .uri("/api/content/classify-file?filename=comments.CSV")
        .body(Body::from("good morning\n\nyou are dumb \u{1F621}\n"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    for record in body["results"].as_array().unwrap() {
        assert_eq!(record["source"], "file");
    }

    std::fs::remove_dir_all(data_dir("upload")).unwrap();
}

#[tokio::test]
async fn health_and_index() {
    let app = app("index").await;

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["service"], "mellow");
    assert_eq!(body["status"]["storage"], "fallback");
    assert_eq!(body["status"]["scorer"], "external");
    assert!(body["endpoints"].as_array().unwrap().len() > 5);

    std::fs::remove_dir_all(data_dir("index")).unwrap();
}
