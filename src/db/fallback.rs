// JsonFileStore: local fallback backend implementing the Database trait.
//
// Each collection lives in `<dir>/<collection>.json` as one JSON array. Every
// mutation is a read-modify-write of the whole file, serialized through an
// in-process mutex and committed with a temp file + rename so a crash never
// leaves a half-written array behind. Other processes writing the same
// directory are not coordinated with.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use super::models::{ClearOutcome, Collection, Record};
use super::traits::Database;

pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store, creating the storage directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.name()))
    }

    /// Read the raw array. Missing, unreadable, or corrupt files read as empty.
    async fn read_values(&self, collection: Collection) -> Vec<Value> {
        let path = self.path_for(collection);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable fallback file, treating as empty");
                return Vec::new();
            }
        };
        if content.trim().is_empty() {
            return Vec::new();
        }
        match serde_json::from_str::<Vec<Value>>(&content) {
            Ok(values) => values,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt fallback file, treating as empty");
                Vec::new()
            }
        }
    }

    async fn write_values(&self, collection: Collection, values: &[Value]) -> Result<()> {
        let path = self.path_for(collection);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(values).context("Failed to serialize records")?;

        let result = async {
            tokio::fs::write(&tmp, &bytes)
                .await
                .with_context(|| format!("Failed to write {}", tmp.display()))?;
            tokio::fs::rename(&tmp, &path)
                .await
                .with_context(|| format!("Failed to replace {}", path.display()))
        }
        .await;

        if result.is_err() {
            // Best effort; the tmp file may never have been created.
            let _ = tokio::fs::remove_file(&tmp).await;
        }
        result
    }
}

#[async_trait]
impl Database for JsonFileStore {
    fn name(&self) -> &'static str {
        "json-file"
    }

    async fn insert(&self, record: &Record) -> Result<()> {
        let value = serde_json::to_value(record).context("Failed to serialize record")?;
        let collection = record.collection();

        let _guard = self.write_lock.lock().await;
        let mut values = self.read_values(collection).await;
        values.push(value);
        self.write_values(collection, &values).await
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Record>> {
        let values = self.read_values(collection).await;
        let mut records = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            match Record::from_json(collection, value) {
                Ok(record) => records.push(record),
                Err(e) => warn!(%collection, index, error = %e, "Skipping malformed stored record"),
            }
        }
        Ok(records)
    }

    async fn clear(&self, collection: Collection) -> Result<ClearOutcome> {
        let _guard = self.write_lock.lock().await;
        match self.write_values(collection, &[]).await {
            Ok(()) => Ok(ClearOutcome::Deleted(0)),
            Err(e) => {
                warn!(%collection, error = %e, "Failed to clear fallback collection");
                Ok(ClearOutcome::Unknown)
            }
        }
    }
}
