// Batch coordinator: runs the moderation pipeline over many lines.
//
// Progress lives in one shared slot that polling clients read. Only one batch
// may hold the slot at a time; a second request while one is running is
// refused rather than allowed to overwrite the counters.
//
// The work runs in its own task, so a caller that stops waiting does not stop
// the batch. Per-line storage failures are logged and skipped; only failing
// to read the input aborts a batch and is recorded in the progress slot.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::db::models::{ClassificationRecord, Record, Source};
use crate::db::PersistenceGateway;
use crate::output::truncate_chars;
use crate::pipeline::Moderator;

/// Live state of the current (or last) batch, exposed via GET /api/content/progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchProgress {
    pub total: usize,
    pub processed: usize,
    pub in_progress: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub results: Vec<ClassificationRecord>,
    pub total: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("A batch is already in progress")]
    InProgress,
    #[error("Invalid file type: {0}. Only .txt and .csv files are allowed")]
    UnsupportedFile(String),
    #[error("Failed to read batch input: {0}")]
    Input(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// True for the file names a batch upload accepts.
pub fn is_supported_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".txt") || lower.ends_with(".csv")
}

/// Split raw content into trimmed, non-blank lines.
pub fn split_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Clone)]
pub struct BatchCoordinator {
    moderator: Arc<Moderator>,
    gateway: Arc<PersistenceGateway>,
    progress: Arc<RwLock<BatchProgress>>,
}

impl BatchCoordinator {
    pub fn new(
        moderator: Arc<Moderator>,
        gateway: Arc<PersistenceGateway>,
        progress: Arc<RwLock<BatchProgress>>,
    ) -> Self {
        Self {
            moderator,
            gateway,
            progress,
        }
    }

    /// Snapshot of the progress slot.
    pub async fn progress(&self) -> BatchProgress {
        self.progress.read().await.clone()
    }

    /// Classify and store every non-blank line, in order.
    pub async fn run_batch(&self, lines: Vec<String>) -> Result<BatchOutcome, BatchError> {
        let lines: Vec<String> = lines
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        self.reserve(lines.len()).await?;
        self.spawn_lines(lines).await
    }

    /// Read a .txt or .csv file and run it as a batch, one line per message.
    pub async fn run_file(&self, path: &Path) -> Result<BatchOutcome, BatchError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !is_supported_file(&name) {
            return Err(BatchError::UnsupportedFile(name));
        }

        self.reserve(0).await?;

        let label = path.display().to_string();
        match tokio::fs::read(path).await {
            Ok(bytes) => self.run_content(&label, bytes).await,
            Err(e) => Err(self.abort(&format!("{label}: {e}")).await),
        }
    }

    /// Run an uploaded .txt or .csv body as a batch.
    pub async fn run_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<BatchOutcome, BatchError> {
        if !is_supported_file(filename) {
            return Err(BatchError::UnsupportedFile(filename.to_string()));
        }
        self.reserve(0).await?;
        self.run_content(filename, bytes).await
    }

    /// Decode an already-reserved batch input and process it.
    async fn run_content(
        &self,
        label: &str,
        bytes: Vec<u8>,
    ) -> Result<BatchOutcome, BatchError> {
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => {
                let message = format!("{label} is not valid UTF-8: {e}");
                return Err(self.abort(&message).await);
            }
        };
        let lines = split_lines(&content);
        self.progress.write().await.total = lines.len();
        self.spawn_lines(lines).await
    }

    /// Claim the progress slot for a new batch of `total` lines.
    async fn reserve(&self, total: usize) -> Result<(), BatchError> {
        let mut progress = self.progress.write().await;
        if progress.in_progress {
            warn!(
                processed = progress.processed,
                total = progress.total,
                "Rejected batch request while another batch is running"
            );
            return Err(BatchError::InProgress);
        }
        *progress = BatchProgress {
            total,
            processed: 0,
            in_progress: true,
            error: None,
        };
        Ok(())
    }

    /// Release the slot after a top-level failure and record why.
    async fn abort(&self, message: &str) -> BatchError {
        error!(error = message, "Batch aborted");
        let mut progress = self.progress.write().await;
        progress.in_progress = false;
        progress.error = Some(message.to_string());
        BatchError::Input(message.to_string())
    }

    async fn spawn_lines(&self, lines: Vec<String>) -> Result<BatchOutcome, BatchError> {
        let this = self.clone();
        match tokio::spawn(async move { this.process(lines).await }).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let message = format!("Batch task failed: {e}");
                self.abort(&message).await;
                Err(BatchError::Internal(anyhow::anyhow!(message)))
            }
        }
    }

    async fn process(&self, lines: Vec<String>) -> BatchOutcome {
        let total = lines.len();
        info!(total, "Batch started");

        let mut results = Vec::with_capacity(total);
        let mut failed = 0usize;
        for (index, line) in lines.iter().enumerate() {
            let record = self.moderator.analyze(line, Source::File).await;
            if let Err(e) = self.gateway.store(&Record::from(record.clone())).await {
                failed += 1;
                error!(
                    line = index + 1,
                    text = %truncate_chars(line, 60),
                    error = %e,
                    "Failed to store batch line, continuing"
                );
            }
            results.push(record);
            self.progress.write().await.processed = index + 1;
        }

        self.progress.write().await.in_progress = false;
        info!(total, failed, "Batch finished");

        BatchOutcome { results, total }
    }
}
