// Moderation service: the operations exposed to the CLI and HTTP layers.
//
// Owns the pipeline, the persistence gateway, and the batch coordinator, and
// turns their results into typed errors the outer layers can map to exit
// codes or status codes.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::batch::{BatchCoordinator, BatchError, BatchOutcome, BatchProgress};
use crate::config::Config;
use crate::db::models::{
    ClassificationRecord, ClearOutcome, Collection, FeedbackRecord, Record, Source,
};
use crate::db::{self, PersistenceGateway, StorageMode};
use crate::decision::{Classification, DecisionEngine};
use crate::lexicon::Lexicon;
use crate::output::truncate_chars;
use crate::pipeline::Moderator;
use crate::toxicity::adapter::{ScorerKind, ScoringAdapter};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Caller supplied something unusable. Nothing was stored.
    #[error("{0}")]
    InvalidInput(String),
    #[error("A batch is already in progress")]
    BatchInProgress,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<BatchError> for ServiceError {
    fn from(e: BatchError) -> Self {
        match e {
            BatchError::InProgress => ServiceError::BatchInProgress,
            BatchError::UnsupportedFile(_) | BatchError::Input(_) => {
                ServiceError::InvalidInput(e.to_string())
            }
            BatchError::Internal(e) => ServiceError::Internal(e),
        }
    }
}

/// A user's correction as submitted, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub original_classification: Option<String>,
    #[serde(default)]
    pub correct_classification: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl FeedbackSubmission {
    fn validate(self) -> Result<FeedbackRecord, ServiceError> {
        let invalid = || ServiceError::InvalidInput("Invalid feedback data".to_string());

        let original_text = self
            .original_text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(invalid)?;
        let corrected_classification = self
            .correct_classification
            .as_deref()
            .and_then(|c| c.parse::<Classification>().ok())
            .ok_or_else(invalid)?;
        let original_classification = match self.original_classification.as_deref() {
            Some(c) if !c.trim().is_empty() => Some(c.parse().map_err(|_| invalid())?),
            _ => None,
        };

        Ok(FeedbackRecord {
            original_text,
            original_classification,
            corrected_classification,
            comment: self.comment.filter(|c| !c.trim().is_empty()),
            timestamp: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub storage: StorageMode,
    pub scorer: ScorerKind,
    pub history_count: usize,
    pub feedback_count: usize,
    pub batch: BatchProgress,
}

pub struct ModerationService {
    moderator: Arc<Moderator>,
    gateway: Arc<PersistenceGateway>,
    batches: BatchCoordinator,
}

impl ModerationService {
    /// Build every component from configuration: lexicon, scorer, storage.
    pub async fn start(config: &Config) -> Result<Self> {
        let lexicon = Arc::new(Lexicon::builtin()?);
        let scorer = ScoringAdapter::initialize(config);
        info!(scorer = %scorer.kind(), "Scoring adapter ready");
        let moderator = Moderator::new(DecisionEngine::new(scorer, lexicon));
        let gateway = db::open(&config.storage).await?;
        info!(storage = %gateway.mode(), "Persistence gateway ready");
        Ok(Self::new(Arc::new(moderator), Arc::new(gateway)))
    }

    pub fn new(moderator: Arc<Moderator>, gateway: Arc<PersistenceGateway>) -> Self {
        let batches = BatchCoordinator::new(
            moderator.clone(),
            gateway.clone(),
            Arc::new(RwLock::new(BatchProgress::default())),
        );
        Self {
            moderator,
            gateway,
            batches,
        }
    }

    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    /// Classify a single message and record it.
    pub async fn classify(&self, text: &str) -> Result<ClassificationRecord, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::InvalidInput("No text provided".to_string()));
        }

        let record = self.moderator.analyze(text, Source::Direct).await;
        self.gateway
            .store(&Record::from(record.clone()))
            .await
            .map_err(|e| {
                error!(
                    text = %truncate_chars(text, 60),
                    error = %e,
                    "Failed to store classification"
                );
                e
            })?;
        Ok(record)
    }

    pub async fn classify_batch(&self, lines: Vec<String>) -> Result<BatchOutcome, ServiceError> {
        if lines.iter().all(|l| l.trim().is_empty()) {
            return Err(ServiceError::InvalidInput("No lines provided".to_string()));
        }
        Ok(self.batches.run_batch(lines).await?)
    }

    pub async fn classify_file(&self, path: &Path) -> Result<BatchOutcome, ServiceError> {
        Ok(self.batches.run_file(path).await?)
    }

    pub async fn classify_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<BatchOutcome, ServiceError> {
        if filename.trim().is_empty() {
            return Err(ServiceError::InvalidInput("No file selected".to_string()));
        }
        Ok(self.batches.run_upload(filename, bytes).await?)
    }

    pub async fn get_progress(&self) -> BatchProgress {
        self.batches.progress().await
    }

    pub async fn submit_feedback(
        &self,
        submission: FeedbackSubmission,
    ) -> Result<FeedbackRecord, ServiceError> {
        let record = submission.validate()?;
        self.gateway.store(&Record::from(record.clone())).await?;
        info!(
            corrected = %record.corrected_classification,
            "Feedback recorded"
        );
        Ok(record)
    }

    /// Stored classifications, newest first. A storage failure yields an
    /// empty list so listing views keep working.
    pub async fn list_history(&self) -> Vec<ClassificationRecord> {
        match self.gateway.history().await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to list history, returning empty list");
                Vec::new()
            }
        }
    }

    pub async fn list_feedback(&self) -> Result<Vec<FeedbackRecord>, ServiceError> {
        Ok(self.gateway.feedback().await?)
    }

    pub async fn clear_history(&self) -> Result<ClearOutcome, ServiceError> {
        let outcome = self.gateway.clear(Collection::History).await?;
        info!(deleted = %outcome, "History cleared");
        Ok(outcome)
    }

    pub async fn status(&self) -> Result<ServiceStatus, ServiceError> {
        Ok(ServiceStatus {
            storage: self.gateway.mode(),
            scorer: self.moderator.engine().scorer().kind(),
            history_count: self.gateway.list(Collection::History).await?.len(),
            feedback_count: self.gateway.list(Collection::Feedback).await?.len(),
            batch: self.get_progress().await,
        })
    }
}
