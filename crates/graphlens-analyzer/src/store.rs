//! Historical store seam used by the analyzer.

use async_trait::async_trait;
use graphlens_core::{DataPoint, HistoricalDataPoint};
use sqlx::PgPool;

use crate::error::AnalyzeError;

/// Read and append access to previously extracted data points.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Up to `limit` most recent points per category for `metric_name`,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Store`] if the lookup fails.
    async fn query(
        &self,
        metric_name: &str,
        categories: &[String],
        limit: i64,
    ) -> Result<Vec<HistoricalDataPoint>, AnalyzeError>;

    /// Append `points` under `metric_name`, tagged with `source_hash`.
    ///
    /// Returns the number of points stored; `0` when `source_hash` was
    /// already recorded.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Store`] if the insert fails.
    async fn insert_batch(
        &self,
        metric_name: &str,
        points: &[DataPoint],
        source_hash: &str,
    ) -> Result<u64, AnalyzeError>;
}

/// [`HistoryStore`] backed by the Postgres `graph_data_history` table.
#[derive(Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn query(
        &self,
        metric_name: &str,
        categories: &[String],
        limit: i64,
    ) -> Result<Vec<HistoricalDataPoint>, AnalyzeError> {
        let rows =
            graphlens_db::query_recent_history(&self.pool, metric_name, categories, limit).await?;
        let points = rows
            .into_iter()
            .map(HistoricalDataPoint::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(points)
    }

    async fn insert_batch(
        &self,
        metric_name: &str,
        points: &[DataPoint],
        source_hash: &str,
    ) -> Result<u64, AnalyzeError> {
        let inserted =
            graphlens_db::insert_history_batch(&self.pool, metric_name, points, source_hash)
                .await?;
        Ok(inserted)
    }
}
