// Deterministic keyword scorer.
//
// Used when no external scorer could be constructed at startup, and for any
// single call where the external scorer errors. Plain substring containment
// over the lowercased text; the confidence is always 0.9.

use anyhow::Result;
use async_trait::async_trait;

use super::traits::{ToxicityResult, ToxicityScorer};

/// Keywords that flip the keyword scorer to "toxic".
pub const KEYWORDS: &[&str] = &["hate", "kill", "die", "idiot", "stupid", "dumb"];

/// Fixed confidence reported for both outcomes.
pub const KEYWORD_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer;

impl KeywordScorer {
    pub fn score(&self, text: &str) -> ToxicityResult {
        let lowered = text.to_lowercase();
        let label = if KEYWORDS.iter().any(|k| lowered.contains(k)) {
            "toxic"
        } else {
            "neutral"
        };
        ToxicityResult::new(label, KEYWORD_CONFIDENCE)
    }
}

#[async_trait]
impl ToxicityScorer for KeywordScorer {
    async fn score_text(&self, text: &str) -> Result<ToxicityResult> {
        Ok(self.score(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_hit() {
        let result = KeywordScorer.score("I HATE mondays");
        assert_eq!(result, ToxicityResult::new("toxic", 0.9));
    }

    #[test]
    fn test_no_keyword() {
        let result = KeywordScorer.score("lovely weather");
        assert_eq!(result, ToxicityResult::new("neutral", 0.9));
    }

    #[test]
    fn test_substring_counts() {
        // containment, not word boundaries
        assert_eq!(KeywordScorer.score("my diet").label, "toxic");
    }

    #[tokio::test]
    async fn test_trait_impl_never_errors() {
        let result = KeywordScorer.score_text("").await.unwrap();
        assert_eq!(result.label, "neutral");
    }
}
