// Scoring adapter: a stable, infallible score(text) over whichever scorer
// could be constructed at startup.
//
// The external scorer is built exactly once. If that fails, the adapter pins
// itself to the keyword scorer for the rest of the process. A later per-call
// failure of a working external scorer is answered by the keyword scorer for
// that call only.

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};

use super::keyword::KeywordScorer;
use super::onnx::OnnxToxicityScorer;
use super::perspective::PerspectiveScorer;
use super::traits::{ToxicityResult, ToxicityScorer};
use crate::config::{Config, ScorerBackend};
use crate::output::truncate_chars;

/// Which scorer the adapter settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorerKind {
    External,
    Keyword,
}

impl std::fmt::Display for ScorerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScorerKind::External => write!(f, "external"),
            ScorerKind::Keyword => write!(f, "keyword"),
        }
    }
}

pub struct ScoringAdapter {
    external: Option<Box<dyn ToxicityScorer>>,
    keyword: KeywordScorer,
}

impl ScoringAdapter {
    /// Build the configured external scorer, degrading to keywords on failure.
    pub fn initialize(config: &Config) -> Self {
        Self::from_external(create_external(config))
    }

    /// Wrap the outcome of constructing an external scorer.
    pub fn from_external(external: Result<Box<dyn ToxicityScorer>>) -> Self {
        match external {
            Ok(scorer) => Self {
                external: Some(scorer),
                keyword: KeywordScorer,
            },
            Err(e) => {
                warn!(error = %e, "External scorer unavailable, using keyword scorer for this process");
                Self::keyword_only()
            }
        }
    }

    pub fn keyword_only() -> Self {
        Self {
            external: None,
            keyword: KeywordScorer,
        }
    }

    pub fn kind(&self) -> ScorerKind {
        if self.external.is_some() {
            ScorerKind::External
        } else {
            ScorerKind::Keyword
        }
    }

    /// Score text. Never fails; confidence is always within [0, 1].
    pub async fn score(&self, text: &str) -> ToxicityResult {
        let result = match &self.external {
            Some(scorer) => match scorer.score_text(text).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        error = %e,
                        text_preview = %truncate_chars(text, 50),
                        "External scorer failed, using keyword score for this text"
                    );
                    self.keyword.score(text)
                }
            },
            None => self.keyword.score(text),
        };
        result.clamped()
    }
}

/// Construct the external scorer selected by configuration.
fn create_external(config: &Config) -> Result<Box<dyn ToxicityScorer>> {
    match config.scorer_backend {
        ScorerBackend::Onnx => {
            let scorer = OnnxToxicityScorer::load(&config.model_dir)?;
            info!("Using local ONNX toxicity scorer");
            Ok(Box::new(scorer))
        }
        ScorerBackend::Perspective => {
            config.require_perspective()?;
            info!("Using Perspective API toxicity scorer");
            Ok(Box::new(PerspectiveScorer::new(
                config.perspective_api_key.clone(),
            )))
        }
        ScorerBackend::Keyword => anyhow::bail!("MELLOW_SCORER=keyword selects no external scorer"),
    }
}
