// Toxicity scorer trait: the swap-ready abstraction.
//
// Every scorer reduces its output to a single (label, confidence) pair: the
// highest-scoring category and its probability. Callers downstream only ever
// look at the confidence.

use anyhow::Result;
use async_trait::async_trait;

/// The result of scoring a single piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct ToxicityResult {
    /// The provider's top category (e.g. "toxicity", "insult", "neutral")
    pub label: String,
    /// Probability of that category, 0.0 to 1.0
    pub confidence: f64,
}

impl ToxicityResult {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }

    /// Pick the highest-scoring category out of a multi-label output.
    ///
    /// Ties keep the earlier label. Returns None for an empty iterator.
    pub fn from_label_scores<'a, I>(scores: I) -> Option<Self>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        scores
            .into_iter()
            .fold(None::<(&'a str, f64)>, |best, (label, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((label, score)),
            })
            .map(|(label, score)| Self::new(label, score))
    }

    /// Confidence forced into [0, 1]; NaN becomes 0.
    pub fn clamped(mut self) -> Self {
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}

/// Trait for scoring text toxicity. Implementations are async because
/// most providers require HTTP calls or blocking inference off the runtime.
#[async_trait]
pub trait ToxicityScorer: Send + Sync {
    /// Score a single text.
    async fn score_text(&self, text: &str) -> Result<ToxicityResult>;
}
