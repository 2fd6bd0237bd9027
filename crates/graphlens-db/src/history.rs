//! Database operations for the `graph_data_history` and `graph_sources` tables.

use chrono::{DateTime, Utc};
use graphlens_core::{DataPoint, HistoricalDataPoint};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `graph_data_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct HistoryRow {
    pub id: i64,
    pub metric_name: String,
    pub category: String,
    pub value: Decimal,
    pub extracted_at: DateTime<Utc>,
    pub source_hash: String,
}

impl TryFrom<HistoryRow> for HistoricalDataPoint {
    type Error = DbError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        let value = row.value.to_f64().ok_or(DbError::UnreadableValue {
            id: row.id,
            value: row.value,
        })?;
        Ok(Self {
            id: row.id,
            metric_name: row.metric_name,
            category: row.category,
            value,
            extracted_at: row.extracted_at,
            source_hash: row.source_hash,
        })
    }
}

/// The `NUMERIC` form of `value`, if it can be stored and read back.
///
/// Non-finite values, magnitudes beyond [`Decimal::MAX`], and non-zero values
/// too small to keep any significant digit at 28 decimal places yield `None`.
#[must_use]
pub fn storable_value(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    let decimal = Decimal::from_f64(value)?;
    if decimal.is_zero() && value != 0.0 {
        return None;
    }
    Some(decimal)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Return up to `limit` most recent rows per category for `metric_name`.
///
/// Only rows whose category is in `categories` are considered. The combined
/// result is ordered newest first (`extracted_at DESC, id DESC`).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn query_recent_history(
    pool: &PgPool,
    metric_name: &str,
    categories: &[String],
    limit: i64,
) -> Result<Vec<HistoryRow>, DbError> {
    if categories.is_empty() || limit <= 0 {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, HistoryRow>(
        "SELECT id, metric_name, category, value, extracted_at, source_hash \
         FROM ( \
             SELECT id, metric_name, category, value, extracted_at, \
                    source_graph_hash AS source_hash, \
                    ROW_NUMBER() OVER ( \
                        PARTITION BY category \
                        ORDER BY extracted_at DESC, id DESC \
                    ) AS rn \
             FROM graph_data_history \
             WHERE metric_name = $1 \
               AND category = ANY($2::text[]) \
         ) ranked \
         WHERE rn <= $3 \
         ORDER BY extracted_at DESC, id DESC",
    )
    .bind(metric_name)
    .bind(categories)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Persist one row per data point, tagged with `source_hash`.
///
/// The fingerprint is claimed in `graph_sources` inside the same transaction.
/// If it was already claimed, nothing is inserted and `0` is returned, which
/// makes repeated submissions of the same image idempotent even when they
/// race. Values are converted with [`storable_value`] and bound as `numeric[]`.
///
/// # Errors
///
/// Returns [`DbError::InvalidValue`] for any value [`storable_value`] rejects and
/// [`DbError::Sqlx`] if any statement fails (the transaction is rolled back).
pub async fn insert_history_batch(
    pool: &PgPool,
    metric_name: &str,
    points: &[DataPoint],
    source_hash: &str,
) -> Result<u64, DbError> {
    if points.is_empty() {
        return Ok(0);
    }

    let mut categories: Vec<String> = Vec::with_capacity(points.len());
    let mut values: Vec<Decimal> = Vec::with_capacity(points.len());
    for point in points {
        let value = storable_value(point.value).ok_or(DbError::InvalidValue(point.value))?;
        categories.push(point.category.trim().to_string());
        values.push(value);
    }

    let mut tx = pool.begin().await?;

    let claimed: Option<String> = sqlx::query_scalar(
        "INSERT INTO graph_sources (source_hash, metric_name, point_count) \
         VALUES ($1, $2, $3) \
         ON CONFLICT (source_hash) DO NOTHING \
         RETURNING source_hash",
    )
    .bind(source_hash)
    .bind(metric_name)
    .bind(i32::try_from(points.len()).unwrap_or(i32::MAX))
    .fetch_optional(&mut *tx)
    .await?;

    if claimed.is_none() {
        tx.rollback().await?;
        tracing::debug!(source_hash, "source already recorded, skipping insert");
        return Ok(0);
    }

    let inserted = sqlx::query(
        "INSERT INTO graph_data_history (metric_name, category, value, source_graph_hash) \
         SELECT $1, t.category, t.value, $4 \
         FROM UNNEST($2::text[], $3::numeric[]) AS t(category, value)",
    )
    .bind(metric_name)
    .bind(&categories)
    .bind(&values)
    .bind(source_hash)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    Ok(inserted)
}

/// List recent history rows, optionally filtered by metric name.
///
/// Results are ordered by `extracted_at DESC` then `id DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_history(
    pool: &PgPool,
    metric_name: Option<&str>,
    limit: i64,
) -> Result<Vec<HistoryRow>, DbError> {
    let rows = match metric_name {
        Some(metric) => {
            sqlx::query_as::<_, HistoryRow>(
                "SELECT id, metric_name, category, value, extracted_at, \
                        source_graph_hash AS source_hash \
                 FROM graph_data_history \
                 WHERE metric_name = $1 \
                 ORDER BY extracted_at DESC, id DESC \
                 LIMIT $2",
            )
            .bind(metric)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, HistoryRow>(
                "SELECT id, metric_name, category, value, extracted_at, \
                        source_graph_hash AS source_hash \
                 FROM graph_data_history \
                 ORDER BY extracted_at DESC, id DESC \
                 LIMIT $1",
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows)
}
