// Database layer: durable storage for classification history and feedback.
//
// PostgreSQL is the primary backend (behind the `postgres` feature); a JSON
// file store under MELLOW_DATA_DIR is the fallback. The gateway owns the
// choice between them.

pub mod fallback;
pub mod gateway;
pub mod models;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

use anyhow::Result;
#[cfg(feature = "postgres")]
use std::sync::Arc;

use crate::config::StorageSettings;
pub use gateway::{PersistenceGateway, StorageMode};
pub use traits::Database;

/// Open the persistence gateway for this process.
///
/// Tries the configured primary backend with the startup retry policy and
/// falls back to local files when it is unreachable or not configured.
#[cfg(feature = "postgres")]
pub async fn open(settings: &StorageSettings) -> Result<PersistenceGateway> {
    let url = settings.database_url.clone().unwrap_or_default();
    let timeout = settings.connect_timeout;
    PersistenceGateway::startup(settings, |attempt| {
        let url = url.clone();
        async move {
            tracing::debug!(attempt, "Connecting to PostgreSQL");
            let db = postgres::PgDatabase::connect(&url, timeout).await?;
            Ok(Arc::new(db) as Arc<dyn Database>)
        }
    })
    .await
}

/// Open the persistence gateway for this process.
///
/// Built without PostgreSQL support, so only the fallback store is available.
#[cfg(not(feature = "postgres"))]
pub async fn open(settings: &StorageSettings) -> Result<PersistenceGateway> {
    if settings.has_primary() {
        tracing::warn!(
            "DATABASE_URL is set but mellow was built without the postgres feature; \
             using fallback storage"
        );
    }
    PersistenceGateway::fallback_only(settings).await
}
