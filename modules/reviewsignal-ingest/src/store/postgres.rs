// Postgres persistence for scored reviews.

use async_trait::async_trait;
use reviewsignal_common::{BatchId, BatchSummary, ScoredRecord, SentimentCategory};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::ReviewStore;
use crate::error::PersistenceError;

#[derive(Clone)]
pub struct PgReviewStore {
    pool: PgPool,
}

impl PgReviewStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        info!("Connected to review store");
        Ok(Self::new(pool))
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<(), PersistenceError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ReviewStore for PgReviewStore {
    async fn append(&self, record: &ScoredRecord) -> Result<(), PersistenceError> {
        sqlx::query(
            r#"
            INSERT INTO scored_reviews
                (batch_id, source_kind, review_text, polarity, subjectivity, category, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.batch_id().as_str())
        .bind(record.source_kind().as_str())
        .bind(record.text())
        .bind(record.polarity())
        .bind(record.subjectivity())
        .bind(record.category().as_str())
        .bind(record.created_at())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count_by_batch_and_category(
        &self,
        batch_id: &BatchId,
    ) -> Result<BatchSummary, PersistenceError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT category, COUNT(*)
            FROM scored_reviews
            WHERE batch_id = $1
            GROUP BY category
            "#,
        )
        .bind(batch_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut summary = BatchSummary::new();
        for (category, count) in rows {
            let category: SentimentCategory =
                category.parse().map_err(PersistenceError::Corrupt)?;
            let count = u64::try_from(count)
                .map_err(|_| PersistenceError::Corrupt(format!("negative count {count}")))?;
            summary.add(category, count);
        }
        Ok(summary)
    }
}
