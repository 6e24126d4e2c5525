// Persistence gateway: picks the backend that serves each storage call.
//
// At startup the primary backend gets a fixed number of connection attempts.
// If none succeed, the fallback store serves the whole process lifetime. Once
// running, any primary failure flips a process-wide flag to fallback and the
// same operation is retried there. The flip is one-way; nothing tries to
// reconnect to the primary until the process restarts.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use super::fallback::JsonFileStore;
use super::models::{
    sort_newest_first, ClassificationRecord, ClearOutcome, Collection, FeedbackRecord, Record,
};
use super::traits::Database;
use crate::config::StorageSettings;

/// Which backend is currently serving requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    Primary,
    Fallback,
}

impl std::fmt::Display for StorageMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageMode::Primary => write!(f, "primary"),
            StorageMode::Fallback => write!(f, "fallback"),
        }
    }
}

pub struct PersistenceGateway {
    primary: Option<Arc<dyn Database>>,
    fallback: Arc<dyn Database>,
    /// Set once the primary is out of service. Never cleared.
    degraded: AtomicBool,
}

impl PersistenceGateway {
    pub fn new(primary: Option<Arc<dyn Database>>, fallback: Arc<dyn Database>) -> Self {
        let degraded = AtomicBool::new(primary.is_none());
        Self {
            primary,
            fallback,
            degraded,
        }
    }

    /// Gateway that only ever uses the fallback store.
    pub async fn fallback_only(settings: &StorageSettings) -> Result<Self> {
        let fallback = JsonFileStore::open(&settings.data_dir).await?;
        info!(dir = %settings.data_dir.display(), "Using fallback storage");
        Ok(Self::new(None, Arc::new(fallback)))
    }

    /// Connect to the primary backend with the configured retry policy.
    ///
    /// `connect` is called once per attempt with the 1-based attempt number.
    /// The fallback storage area is prepared up front either way, since a
    /// runtime downgrade may need it later.
    pub async fn startup<F, Fut>(settings: &StorageSettings, mut connect: F) -> Result<Self>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Arc<dyn Database>>>,
    {
        if !settings.has_primary() {
            return Self::fallback_only(settings).await;
        }

        let fallback: Arc<dyn Database> = Arc::new(JsonFileStore::open(&settings.data_dir).await?);
        let attempts = settings.retries.max(1);

        for attempt in 1..=attempts {
            match connect(attempt).await {
                Ok(primary) => {
                    info!(backend = primary.name(), attempt, "Connected to primary storage");
                    return Ok(Self::new(Some(primary), fallback));
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Primary storage connection failed");
                    if attempt < attempts {
                        tokio::time::sleep(settings.retry_delay).await;
                    }
                }
            }
        }

        warn!(
            attempts,
            dir = %settings.data_dir.display(),
            "Primary storage unavailable, using fallback storage for this process"
        );
        Ok(Self::new(None, fallback))
    }

    pub fn mode(&self) -> StorageMode {
        if self.active_primary().is_some() {
            StorageMode::Primary
        } else {
            StorageMode::Fallback
        }
    }

    fn active_primary(&self) -> Option<&Arc<dyn Database>> {
        if self.degraded.load(Ordering::Acquire) {
            None
        } else {
            self.primary.as_ref()
        }
    }

    fn downgrade(&self, operation: &str, collection: Collection, e: &anyhow::Error) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            error!(
                operation,
                %collection,
                error = %e,
                "Primary storage failed, switching to fallback storage for this process"
            );
        } else {
            warn!(operation, %collection, error = %e, "Primary storage failed after downgrade");
        }
    }

    /// Persist a record in its collection.
    pub async fn store(&self, record: &Record) -> Result<()> {
        let collection = record.collection();
        if let Some(primary) = self.active_primary() {
            match primary.insert(record).await {
                Ok(()) => return Ok(()),
                Err(e) => self.downgrade("store", collection, &e),
            }
        }
        self.fallback
            .insert(record)
            .await
            .with_context(|| format!("Failed to store {collection} record"))
    }

    /// All records of a collection, newest first.
    pub async fn list(&self, collection: Collection) -> Result<Vec<Record>> {
        let mut records = match self.active_primary() {
            Some(primary) => match primary.list(collection).await {
                Ok(records) => records,
                Err(e) => {
                    self.downgrade("list", collection, &e);
                    self.fallback_list(collection).await?
                }
            },
            None => self.fallback_list(collection).await?,
        };
        sort_newest_first(&mut records);
        Ok(records)
    }

    async fn fallback_list(&self, collection: Collection) -> Result<Vec<Record>> {
        self.fallback
            .list(collection)
            .await
            .with_context(|| format!("Failed to list {collection}"))
    }

    /// Remove every record of a collection.
    pub async fn clear(&self, collection: Collection) -> Result<ClearOutcome> {
        if let Some(primary) = self.active_primary() {
            match primary.clear(collection).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => self.downgrade("clear", collection, &e),
            }
        }
        self.fallback
            .clear(collection)
            .await
            .with_context(|| format!("Failed to clear {collection}"))
    }

    pub async fn history(&self) -> Result<Vec<ClassificationRecord>> {
        Ok(self
            .list(Collection::History)
            .await?
            .into_iter()
            .filter_map(|r| match r {
                Record::Classification(c) => Some(c),
                Record::Feedback(_) => None,
            })
            .collect())
    }

    pub async fn feedback(&self) -> Result<Vec<FeedbackRecord>> {
        Ok(self
            .list(Collection::Feedback)
            .await?
            .into_iter()
            .filter_map(|r| match r {
                Record::Feedback(f) => Some(f),
                Record::Classification(_) => None,
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::models::Source;
    use crate::decision::Classification;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory backend that starts failing from a given call onwards.
    #[derive(Default)]
    pub(crate) struct MemoryDb {
        pub calls: AtomicUsize,
        pub fail_from_call: Option<usize>,
        pub records: Mutex<Vec<Record>>,
    }

    impl MemoryDb {
        pub(crate) fn failing_from(call: usize) -> Self {
            Self {
                fail_from_call: Some(call),
                ..Self::default()
            }
        }

        fn tick(&self) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            match self.fail_from_call {
                Some(n) if call >= n => anyhow::bail!("connection reset"),
                _ => Ok(()),
            }
        }

        fn stored(&self) -> usize {
            self.records.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Database for MemoryDb {
        fn name(&self) -> &'static str {
            "memory"
        }

        async fn insert(&self, record: &Record) -> Result<()> {
            self.tick()?;
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn list(&self, collection: Collection) -> Result<Vec<Record>> {
            self.tick()?;
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.collection() == collection)
                .cloned()
                .collect())
        }

        async fn clear(&self, collection: Collection) -> Result<ClearOutcome> {
            self.tick()?;
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.collection() != collection);
            Ok(ClearOutcome::Deleted((before - records.len()) as u64))
        }
    }

    fn settings(name: &str) -> StorageSettings {
        StorageSettings {
            database_url: Some("postgres://localhost/mellow_test".to_string()),
            retries: 3,
            retry_delay: Duration::from_millis(1),
            connect_timeout: Duration::from_millis(10),
            data_dir: temp_dir(name),
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mellow-gateway-{name}-{}", std::process::id()))
    }

    fn record(text: &str, secs: i64) -> Record {
        Record::Classification(ClassificationRecord {
            text: text.to_string(),
            classification: Classification::Neutral,
            confidence: 0.2,
            toxic_signals: vec![],
            has_emoji: false,
            positive_suggestion: None,
            rewritten_text: Some("You're doing great!".to_string()),
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            source: Source::Direct,
        })
    }

    async fn gateway_with(name: &str, primary: Arc<MemoryDb>) -> PersistenceGateway {
        let fallback = JsonFileStore::open(temp_dir(name)).await.unwrap();
        PersistenceGateway::new(Some(primary as Arc<dyn Database>), Arc::new(fallback))
    }

    #[tokio::test]
    async fn test_startup_exhausts_retries_then_uses_fallback() {
        let settings = settings("exhaust");
        let attempts = AtomicUsize::new(0);
        let gateway = PersistenceGateway::startup(&settings, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<Arc<dyn Database>, _>(anyhow::anyhow!("refused")) }
        })
        .await
        .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(gateway.mode(), StorageMode::Fallback);
        assert!(settings.data_dir.is_dir());

        std::fs::remove_dir_all(&settings.data_dir).unwrap();
    }

    #[tokio::test]
    async fn test_startup_succeeds_on_later_attempt() {
        let settings = settings("later");
        let gateway = PersistenceGateway::startup(&settings, |attempt| async move {
            if attempt < 2 {
                anyhow::bail!("not yet");
            }
            Ok(Arc::new(MemoryDb::default()) as Arc<dyn Database>)
        })
        .await
        .unwrap();

        assert_eq!(gateway.mode(), StorageMode::Primary);

        std::fs::remove_dir_all(&settings.data_dir).unwrap();
    }

    #[tokio::test]
    async fn test_startup_without_url_skips_connect() {
        let mut settings = settings("nourl");
        settings.database_url = None;
        let attempts = AtomicUsize::new(0);
        let gateway = PersistenceGateway::startup(&settings, |_| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err::<Arc<dyn Database>, _>(anyhow::anyhow!("unexpected")) }
        })
        .await
        .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.mode(), StorageMode::Fallback);

        std::fs::remove_dir_all(&settings.data_dir).unwrap();
    }

    #[tokio::test]
    async fn test_store_failure_downgrades_and_retries_on_fallback() {
        let primary = Arc::new(MemoryDb::failing_from(2));
        let gateway = gateway_with("downgrade", primary.clone()).await;

        gateway.store(&record("first", 1)).await.unwrap();
        assert_eq!(gateway.mode(), StorageMode::Primary);

        gateway.store(&record("second", 2)).await.unwrap();
        assert_eq!(gateway.mode(), StorageMode::Fallback);
        assert_eq!(primary.stored(), 1);

        // Downgrade is one-way: the primary is never asked again.
        gateway.store(&record("third", 3)).await.unwrap();
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);

        let listed = gateway.history().await.unwrap();
        let texts: Vec<_> = listed.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["third", "second"]);

        std::fs::remove_dir_all(temp_dir("downgrade")).unwrap();
    }

    #[tokio::test]
    async fn test_list_failure_downgrades() {
        let primary = Arc::new(MemoryDb::failing_from(1));
        let gateway = gateway_with("listfail", primary).await;

        assert!(gateway.list(Collection::Feedback).await.unwrap().is_empty());
        assert_eq!(gateway.mode(), StorageMode::Fallback);

        std::fs::remove_dir_all(temp_dir("listfail")).unwrap();
    }

    #[tokio::test]
    async fn test_primary_list_sorted_newest_first() {
        let primary = Arc::new(MemoryDb::default());
        let gateway = gateway_with("sorted", primary).await;
        for (text, secs) in [("b", 20), ("a", 10), ("c", 30)] {
            gateway.store(&record(text, secs)).await.unwrap();
        }
        let texts: Vec<_> = gateway
            .history()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.text)
            .collect();
        assert_eq!(texts, vec!["c", "b", "a"]);

        std::fs::remove_dir_all(temp_dir("sorted")).unwrap();
    }

    #[tokio::test]
    async fn test_clear_counts_differ_by_backend() {
        let primary = Arc::new(MemoryDb::failing_from(4));
        let gateway = gateway_with("clear", primary).await;
        gateway.store(&record("a", 1)).await.unwrap();
        gateway.store(&record("b", 2)).await.unwrap();

        assert_eq!(
            gateway.clear(Collection::History).await.unwrap(),
            ClearOutcome::Deleted(2)
        );
        // Fourth primary call fails; the fallback reports zero.
        assert_eq!(
            gateway.clear(Collection::History).await.unwrap(),
            ClearOutcome::Deleted(0)
        );
        assert_eq!(gateway.mode(), StorageMode::Fallback);
        assert!(gateway.history().await.unwrap().is_empty());

        std::fs::remove_dir_all(temp_dir("clear")).unwrap();
    }

    #[tokio::test]
    async fn test_fallback_failure_is_a_hard_error() {
        let fallback = Arc::new(MemoryDb::failing_from(1));
        let gateway = PersistenceGateway::new(None, fallback);
        let err = gateway.store(&record("x", 1)).await.unwrap_err();
        assert!(err.to_string().contains("history"), "{err}");
    }
}
