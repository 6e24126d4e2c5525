// Google Perspective API implementation.
//
// Perspective scores text on several attributes (toxicity, insult, threat,
// ...). It's free to use but rate-limited to ~1 QPS. The adapter only needs
// a single (label, confidence) pair, so the attribute with the highest
// summary score wins.
//
// API docs: https://developers.perspectiveapi.com/s/about-the-api-methods

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rate_limiter::RateLimiter;
use super::traits::{ToxicityResult, ToxicityScorer};
use crate::output::truncate_chars;

const PERSPECTIVE_URL: &str = "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

/// Requested attributes, in tie-break order.
const ATTRIBUTES: [&str; 6] = [
    "TOXICITY",
    "SEVERE_TOXICITY",
    "IDENTITY_ATTACK",
    "INSULT",
    "PROFANITY",
    "THREAT",
];

/// Perspective API toxicity scorer.
pub struct PerspectiveScorer {
    client: Client,
    api_key: String,
    rate_limiter: RateLimiter,
}

impl PerspectiveScorer {
    /// Create a new Perspective API scorer with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            // Perspective free tier: 1 query per second
            rate_limiter: RateLimiter::new(1.0),
        }
    }
}

#[async_trait]
impl ToxicityScorer for PerspectiveScorer {
    async fn score_text(&self, text: &str) -> Result<ToxicityResult> {
        // Respect rate limits before making the call
        self.rate_limiter.acquire().await;

        let request = PerspectiveRequest {
            comment: Comment {
                text: text.to_string(),
            },
            requested_attributes: ATTRIBUTES
                .iter()
                .map(|a| (a.to_string(), AttributeConfig {}))
                .collect(),
            languages: vec!["en".to_string()],
        };

        let response = self
            .client
            .post(PERSPECTIVE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("Failed to call Perspective API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Perspective API returned {}: {}", status, body);
        }

        let parsed: PerspectiveResponse = response
            .json()
            .await
            .context("Failed to parse Perspective API response")?;

        let result = top_attribute(&parsed)?;

        debug!(
            label = %result.label,
            confidence = result.confidence,
            text_preview = %truncate_chars(text, 50),
            "Scored text"
        );

        Ok(result)
    }
}

/// Reduce the attribute map to its strongest attribute, lowercased.
fn top_attribute(response: &PerspectiveResponse) -> Result<ToxicityResult> {
    let scored = ATTRIBUTES.iter().filter_map(|attribute| {
        response
            .attribute_scores
            .get(*attribute)
            .map(|score| (*attribute, score.summary_score.value))
    });
    let top = ToxicityResult::from_label_scores(scored)
        .context("Perspective API response contained no attribute scores")?;
    Ok(ToxicityResult::new(top.label.to_lowercase(), top.confidence))
}

// --- Perspective API request/response types ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveRequest {
    comment: Comment,
    requested_attributes: HashMap<String, AttributeConfig>,
    languages: Vec<String>,
}

#[derive(Serialize)]
struct Comment {
    text: String,
}

#[derive(Serialize)]
struct AttributeConfig {}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerspectiveResponse {
    attribute_scores: HashMap<String, AttributeScore>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: SummaryScore,
}

#[derive(Deserialize)]
struct SummaryScore {
    value: f64,
}
