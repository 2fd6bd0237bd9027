//! Two-pass insight orchestration.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use graphlens_core::{AppConfig, DataPoint, HistoricalDataPoint, InsightRecord};
use serde::Serialize;

use crate::error::AnalyzeError;
use crate::image::ChartImage;
use crate::model::{TextModel, VisionModel};
use crate::parse::parse_insight;
use crate::prompts::{validation_instruction, EXTRACTION_INSTRUCTION};
use crate::store::HistoryStore;

const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_HISTORY_LIMIT: i64 = 10;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Limits applied by [`Analyzer::analyze`].
#[derive(Debug, Clone, Copy)]
pub struct AnalyzerConfig {
    pub max_image_bytes: usize,
    /// Most recent historical rows fetched per category.
    pub history_limit: i64,
    /// Bound on each model call.
    pub upstream_timeout: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            history_limit: DEFAULT_HISTORY_LIMIT,
            upstream_timeout: Duration::from_secs(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        }
    }
}

impl AnalyzerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_image_bytes: config.max_image_bytes,
            history_limit: config.history_limit,
            upstream_timeout: Duration::from_secs(config.upstream_timeout_secs),
        }
    }
}

/// How the returned insight relates to the validation phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationStatus {
    /// The audit call succeeded; the insight is its refined output.
    Validated,
    /// The audit call failed; the insight is the raw extraction result.
    Unvalidated { reason: String },
    /// No audit was attempted; the insight is the raw extraction result.
    Skipped { reason: String },
}

/// Result of one [`Analyzer::analyze`] call.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub insight: InsightRecord,
    pub validation: ValidationStatus,
    /// Historical rows handed to the auditor.
    pub historical_points: usize,
    pub source_hash: String,
    /// Data points persisted by this call; `0` for a repeated image.
    pub inserted: u64,
}

/// The insight validation orchestrator.
///
/// Holds the two model capabilities and the historical store behind trait
/// objects so each can be replaced independently.
#[derive(Clone)]
pub struct Analyzer {
    vision: Arc<dyn VisionModel>,
    text: Arc<dyn TextModel>,
    store: Arc<dyn HistoryStore>,
    config: AnalyzerConfig,
}

impl Analyzer {
    #[must_use]
    pub fn new(
        vision: Arc<dyn VisionModel>,
        text: Arc<dyn TextModel>,
        store: Arc<dyn HistoryStore>,
        config: AnalyzerConfig,
    ) -> Self {
        Self {
            vision,
            text,
            store,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze one chart image.
    ///
    /// 1. Validate the image (size, encoding) and fingerprint it.
    /// 2. Extraction: one vision call, parsed strictly.
    /// 3. Look up recent history for the inferred metric and categories.
    /// 4. Validation: one text call auditing the draft against that history.
    ///    A failure here returns the draft tagged as unvalidated.
    /// 5. Persist the extracted points once per fingerprint.
    ///
    /// Without a metric name or any categorised data points, steps 3-5 are
    /// skipped and the draft is returned as is.
    ///
    /// # Errors
    ///
    /// - [`AnalyzeError::Validation`] before any upstream call for bad input.
    /// - [`AnalyzeError::UpstreamUnavailable`] / [`AnalyzeError::UpstreamFormat`]
    ///   if extraction fails; nothing is persisted.
    /// - [`AnalyzeError::Store`] if the lookup or insert fails.
    pub async fn analyze(&self, image_bytes: &[u8]) -> Result<AnalysisOutcome, AnalyzeError> {
        let image = ChartImage::validate(image_bytes, self.config.max_image_bytes)?;
        let source_hash = image.source_hash().to_string();

        let raw = bounded(
            self.config.upstream_timeout,
            "extraction",
            self.vision.extract(EXTRACTION_INSTRUCTION, &image),
        )
        .await?;
        let initial = parse_insight(&raw)?;

        tracing::info!(
            source_hash = %source_hash,
            format = ?image.format(),
            chart_type = %initial.chart_type,
            points = initial.extracted_data.len(),
            "extraction complete"
        );

        let Some(metric_name) = initial.resolved_metric_name() else {
            tracing::info!(source_hash = %source_hash, "no metric name inferred, skipping validation");
            return Ok(skipped(initial, source_hash, "metric name could not be inferred"));
        };

        let categories = initial.categories();
        if categories.is_empty() {
            tracing::info!(source_hash = %source_hash, "no data points extracted, skipping validation");
            return Ok(skipped(initial, source_hash, "no data points were extracted"));
        }

        let history = self
            .store
            .query(&metric_name, &categories, self.config.history_limit)
            .await?;

        let (insight, validation) = match self.validate(&metric_name, &initial, &history).await {
            Ok(refined) => (refined, ValidationStatus::Validated),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    metric = %metric_name,
                    "validation failed, returning unvalidated extraction"
                );
                (
                    initial.clone(),
                    ValidationStatus::Unvalidated {
                        reason: e.public_message(),
                    },
                )
            }
        };

        let points = persistable_points(&initial);
        let inserted = self
            .store
            .insert_batch(&metric_name, &points, &source_hash)
            .await?;

        tracing::info!(
            metric = %metric_name,
            historical_points = history.len(),
            inserted,
            validated = matches!(validation, ValidationStatus::Validated),
            "analysis complete"
        );

        Ok(AnalysisOutcome {
            insight,
            validation,
            historical_points: history.len(),
            source_hash,
            inserted,
        })
    }

    async fn validate(
        &self,
        metric_name: &str,
        initial: &InsightRecord,
        history: &[HistoricalDataPoint],
    ) -> Result<InsightRecord, AnalyzeError> {
        let instruction = validation_instruction(metric_name, initial, history).map_err(|e| {
            AnalyzeError::UpstreamFormat(format!("could not serialize audit payload: {e}"))
        })?;

        let raw = bounded(
            self.config.upstream_timeout,
            "validation",
            self.text.complete(&instruction),
        )
        .await?;
        let refined = parse_insight(&raw)?;

        Ok(reconcile(initial, refined))
    }
}

/// Run one upstream call under `limit`, mapping expiry to
/// [`AnalyzeError::UpstreamUnavailable`].
async fn bounded<T, F>(limit: Duration, stage: &'static str, call: F) -> Result<T, AnalyzeError>
where
    F: Future<Output = Result<T, AnalyzeError>>,
{
    tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
        Err(AnalyzeError::UpstreamUnavailable(format!(
            "{stage} call exceeded {}s",
            limit.as_secs()
        )))
    })
}

fn skipped(initial: InsightRecord, source_hash: String, reason: &str) -> AnalysisOutcome {
    AnalysisOutcome {
        insight: initial,
        validation: ValidationStatus::Skipped {
            reason: reason.to_string(),
        },
        historical_points: 0,
        source_hash,
        inserted: 0,
    }
}

/// Data points worth storing: non-blank categories, trimmed, with values the
/// historical store can hold and read back.
fn persistable_points(initial: &InsightRecord) -> Vec<DataPoint> {
    let mut points = Vec::with_capacity(initial.extracted_data.len());
    for point in &initial.extracted_data {
        let category = point.category.trim();
        if category.is_empty() {
            continue;
        }
        if graphlens_db::storable_value(point.value).is_none() {
            tracing::warn!(
                category,
                value = point.value,
                "value outside the storable range, not persisting it"
            );
            continue;
        }
        points.push(DataPoint::new(category, point.value));
    }
    points
}

/// Carry over what the auditor must not lose from the extraction.
///
/// The metric name is inherited when the refined record has none, and any
/// extracted category absent from the refined `extracted_data` is restored.
fn reconcile(initial: &InsightRecord, mut refined: InsightRecord) -> InsightRecord {
    if refined.resolved_metric_name().is_none() {
        refined.metric_name.clone_from(&initial.metric_name);
    }

    let present = refined.categories();
    let missing: Vec<DataPoint> = initial
        .extracted_data
        .iter()
        .filter(|p| {
            let category = p.category.trim();
            !category.is_empty() && !present.iter().any(|c| c == category)
        })
        .cloned()
        .collect();

    if !missing.is_empty() {
        tracing::warn!(
            restored = missing.len(),
            "validation dropped extracted data points, restoring them"
        );
        refined.extracted_data.extend(missing);
    }

    refined
}
