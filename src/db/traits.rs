// Database trait: backend-agnostic async interface for record storage.
//
// Implementors: PgDatabase (primary, wraps sqlx) and JsonFileStore (fallback,
// one JSON file per collection). The gateway decides which one serves a call;
// callers never talk to a backend directly.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{ClearOutcome, Collection, Record};

#[async_trait]
pub trait Database: Send + Sync {
    /// Short backend name for logs and status output.
    fn name(&self) -> &'static str;

    /// Append a record to its collection.
    async fn insert(&self, record: &Record) -> Result<()>;

    /// All records of a collection, in no particular order.
    async fn list(&self, collection: Collection) -> Result<Vec<Record>>;

    /// Remove every record of a collection.
    async fn clear(&self, collection: Collection) -> Result<ClearOutcome>;
}
