// PgDatabase: PostgreSQL primary backend implementing the Database trait.
//
// Uses sqlx PgPool for native async queries. All queries use runtime
// parameter binding (not compile-time macros) to avoid requiring
// DATABASE_URL at compile time.
//
// Each collection is its own table with typed columns and an identity
// column. Identities never leave this module so records look the same
// whichever backend produced them.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_core::row::Row;
use sqlx_postgres::{PgRow, Postgres};

use super::models::{
    ClassificationRecord, ClearOutcome, Collection, FeedbackRecord, Record,
};
use super::traits::Database;
use crate::decision::Classification;

/// Type alias for the PostgreSQL connection pool.
pub type PgPool = Pool<Postgres>;

const MAX_CONNECTIONS: u32 = 5;

pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Connect to PostgreSQL and run migrations.
    ///
    /// `connect_timeout` bounds how long a single attempt may wait for a
    /// connection; the caller owns any retry policy.
    pub async fn connect(database_url: &str, connect_timeout: Duration) -> Result<Self> {
        let pool = PoolOptions::<Postgres>::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending migrations.
    ///
    /// Holds a session-level advisory lock on a dedicated connection so two
    /// instances starting together don't race to apply the same migration.
    /// The unlock always runs; a migration error takes priority over an
    /// unlock error.
    async fn run_migrations(&self) -> Result<()> {
        // ASCII "MELLOW" as a big-endian integer.
        const MIGRATION_LOCK_KEY: i64 = 0x4D45_4C4C_4F57;

        let mut lock_conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection for migration advisory lock")?;

        sqlx_core::query::query("SELECT pg_advisory_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to acquire migration advisory lock")?;

        let migration_result: Result<()> = async {
            sqlx_core::query::query(
                "CREATE TABLE IF NOT EXISTS schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
            )
            .execute(&self.pool)
            .await?;

            let migrations = [(
                1,
                include_str!("../../migrations/postgres/0001_initial.sql"),
            )];

            for (version, sql) in migrations {
                let applied: bool = sqlx_core::query::query(
                    "SELECT COUNT(*) > 0 FROM schema_version WHERE version = $1",
                )
                .bind(version)
                .fetch_one(&self.pool)
                .await
                .map(|row| row.get::<bool, _>(0))
                .unwrap_or(false);

                if !applied {
                    let mut tx = self.pool.begin().await?;
                    sqlx_core::raw_sql::raw_sql(sql)
                        .execute(&mut *tx)
                        .await
                        .with_context(|| format!("Migration {version} failed"))?;
                    tx.commit().await?;
                }
            }

            Ok(())
        }
        .await;

        let unlock_result = sqlx_core::query::query("SELECT pg_advisory_unlock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *lock_conn)
            .await
            .context("Failed to release migration advisory lock");

        migration_result?;
        unlock_result?;

        Ok(())
    }

    async fn insert_history(&self, r: &ClassificationRecord) -> Result<()> {
        sqlx_core::query::query(
            "INSERT INTO history
                (text, classification, confidence, toxic_signals, has_emoji,
                 positive_suggestion, rewritten_text, recorded_at, source)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&r.text)
        .bind(r.classification.as_str())
        .bind(r.confidence)
        .bind(&r.toxic_signals)
        .bind(r.has_emoji)
        .bind(r.positive_suggestion.as_deref())
        .bind(r.rewritten_text.as_deref())
        .bind(r.timestamp)
        .bind(r.source.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to insert history record")?;
        Ok(())
    }

    async fn insert_feedback(&self, r: &FeedbackRecord) -> Result<()> {
        sqlx_core::query::query(
            "INSERT INTO feedback
                (original_text, original_classification, corrected_classification,
                 comment, recorded_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&r.original_text)
        .bind(r.original_classification.map(|c| c.as_str()))
        .bind(r.corrected_classification.as_str())
        .bind(r.comment.as_deref())
        .bind(r.timestamp)
        .execute(&self.pool)
        .await
        .context("Failed to insert feedback record")?;
        Ok(())
    }
}

fn history_from_row(row: &PgRow) -> Result<ClassificationRecord> {
    Ok(ClassificationRecord {
        text: row.try_get("text")?,
        classification: row.try_get::<String, _>("classification")?.parse()?,
        confidence: row.try_get("confidence")?,
        toxic_signals: row.try_get("toxic_signals")?,
        has_emoji: row.try_get("has_emoji")?,
        positive_suggestion: row.try_get("positive_suggestion")?,
        rewritten_text: row.try_get("rewritten_text")?,
        timestamp: row.try_get("recorded_at")?,
        source: row.try_get::<String, _>("source")?.parse()?,
    })
}

fn feedback_from_row(row: &PgRow) -> Result<FeedbackRecord> {
    let original: Option<String> = row.try_get("original_classification")?;
    Ok(FeedbackRecord {
        original_text: row.try_get("original_text")?,
        original_classification: original
            .map(|c| c.parse::<Classification>())
            .transpose()?,
        corrected_classification: row
            .try_get::<String, _>("corrected_classification")?
            .parse()?,
        comment: row.try_get("comment")?,
        timestamp: row.try_get("recorded_at")?,
    })
}

#[async_trait]
impl Database for PgDatabase {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, record: &Record) -> Result<()> {
        match record {
            Record::Classification(r) => self.insert_history(r).await,
            Record::Feedback(r) => self.insert_feedback(r).await,
        }
    }

    async fn list(&self, collection: Collection) -> Result<Vec<Record>> {
        let records = match collection {
            Collection::History => {
                let rows = sqlx_core::query::query(
                    "SELECT text, classification, confidence, toxic_signals, has_emoji,
                            positive_suggestion, rewritten_text, recorded_at, source
                     FROM history
                     ORDER BY recorded_at DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await
                .context("Failed to list history")?;
                rows.iter()
                    .map(|row| history_from_row(row).map(Record::Classification))
                    .collect::<Result<Vec<_>>>()?
            }
            Collection::Feedback => {
                let rows = sqlx_core::query::query(
                    "SELECT original_text, original_classification, corrected_classification,
                            comment, recorded_at
                     FROM feedback
                     ORDER BY recorded_at DESC, id DESC",
                )
                .fetch_all(&self.pool)
                .await
                .context("Failed to list feedback")?;
                rows.iter()
                    .map(|row| feedback_from_row(row).map(Record::Feedback))
                    .collect::<Result<Vec<_>>>()?
            }
        };
        Ok(records)
    }

    async fn clear(&self, collection: Collection) -> Result<ClearOutcome> {
        let sql = match collection {
            Collection::History => "DELETE FROM history",
            Collection::Feedback => "DELETE FROM feedback",
        };
        let result = sqlx_core::query::query(sql)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to clear {collection}"))?;
        Ok(ClearOutcome::Deleted(result.rows_affected()))
    }
}
