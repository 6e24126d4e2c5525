// Moderation pipeline: score + lexicon -> decision -> suggestion + rewrite.
//
// Produces the ClassificationRecord that gets persisted. File-sourced text is
// always rewritten without emoji; direct messages keep theirs.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::db::models::{ClassificationRecord, Source};
use crate::decision::DecisionEngine;
use crate::output::truncate_chars;
use crate::rewrite::{self, RewriteGenerator};

pub struct Moderator {
    engine: DecisionEngine,
    rewriter: RewriteGenerator,
    rng: Mutex<StdRng>,
}

impl Moderator {
    pub fn new(engine: DecisionEngine) -> Self {
        Self::with_rng(engine, StdRng::from_os_rng())
    }

    /// Deterministic suggestions and rewrites, for tests.
    pub fn with_seed(engine: DecisionEngine, seed: u64) -> Self {
        Self::with_rng(engine, StdRng::seed_from_u64(seed))
    }

    fn with_rng(engine: DecisionEngine, rng: StdRng) -> Self {
        let rewriter = RewriteGenerator::new(engine.lexicon().clone());
        Self {
            engine,
            rewriter,
            rng: Mutex::new(rng),
        }
    }

    pub fn engine(&self) -> &DecisionEngine {
        &self.engine
    }

    /// Classify one message and build its record.
    pub async fn analyze(&self, text: &str, source: Source) -> ClassificationRecord {
        let decision = self.engine.classify(text).await;
        let strip = source == Source::File;

        // The rng guard must not live across an await.
        let (positive_suggestion, rewritten) = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            let suggestion = rewrite::suggest(decision.classification, &mut *rng);
            let rewritten =
                self.rewriter
                    .rewrite(text, &decision.toxic_signals, strip, &mut *rng);
            (suggestion, rewritten)
        };

        debug!(
            text = %truncate_chars(text, 60),
            classification = %decision.classification,
            confidence = decision.confidence,
            signals = decision.toxic_signals.len(),
            "Classified message"
        );

        ClassificationRecord {
            text: text.to_string(),
            classification: decision.classification,
            confidence: decision.confidence,
            toxic_signals: decision.toxic_signals,
            has_emoji: decision.has_emoji,
            positive_suggestion,
            rewritten_text: Some(rewritten),
            timestamp: Utc::now(),
            source,
        }
    }
}
