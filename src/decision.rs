// Decision engine: combines the scorer's confidence with lexicon signals.
//
// The scorer's own label is ignored; only its confidence matters. Any lexicon
// signal forces a toxic verdict regardless of what the model thought.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::lexicon::{contains_any_emoji, Lexicon};
use crate::toxicity::adapter::ScoringAdapter;

/// Confidence strictly above this is toxic.
pub const TOXIC_THRESHOLD: f64 = 0.7;
/// Confidence strictly above this (and not toxic) is offensive.
pub const OFFENSIVE_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Neutral,
    Offensive,
    Toxic,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Neutral => "neutral",
            Classification::Offensive => "offensive",
            Classification::Toxic => "toxic",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Classification {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "neutral" => Ok(Classification::Neutral),
            "offensive" => Ok(Classification::Offensive),
            "toxic" => Ok(Classification::Toxic),
            other => anyhow::bail!(
                "Unknown classification {other:?} (expected neutral, offensive, or toxic)"
            ),
        }
    }
}

/// Tier a confidence value. First match wins; comparisons are strict.
pub fn tier(confidence: f64, has_signals: bool) -> Classification {
    if confidence > TOXIC_THRESHOLD || has_signals {
        Classification::Toxic
    } else if confidence > OFFENSIVE_THRESHOLD {
        Classification::Offensive
    } else {
        Classification::Neutral
    }
}

/// The engine's verdict for one text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub classification: Classification,
    pub confidence: f64,
    pub toxic_signals: Vec<String>,
    pub has_emoji: bool,
}

pub struct DecisionEngine {
    scorer: ScoringAdapter,
    lexicon: Arc<Lexicon>,
}

impl DecisionEngine {
    pub fn new(scorer: ScoringAdapter, lexicon: Arc<Lexicon>) -> Self {
        Self { scorer, lexicon }
    }

    pub fn lexicon(&self) -> &Arc<Lexicon> {
        &self.lexicon
    }

    pub fn scorer(&self) -> &ScoringAdapter {
        &self.scorer
    }

    pub async fn classify(&self, text: &str) -> Decision {
        let score = self.scorer.score(text).await;
        let toxic_signals = self.lexicon.find_signals(text);
        let classification = tier(score.confidence, !toxic_signals.is_empty());

        Decision {
            classification,
            confidence: score.confidence,
            toxic_signals,
            has_emoji: contains_any_emoji(text),
        }
    }
}
