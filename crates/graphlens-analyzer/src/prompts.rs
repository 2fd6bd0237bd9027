//! Instruction text for the extraction and validation calls.

use graphlens_core::{HistoricalDataPoint, InsightRecord};
use serde::Serialize;

/// Fixed instruction sent with every chart image.
pub const EXTRACTION_INSTRUCTION: &str = r#"You are an expert data analyst. Analyze the attached chart image.
Respond with a single JSON object and nothing else. It must contain exactly these keys:
- "chart_type": the kind of chart, e.g. "Line Chart", "Bar Chart", "Pie Chart".
- "summary": one sentence describing the main point of the chart.
- "trends": an array of strings, the key trends or patterns.
- "anomalies": an array of strings, outliers or unexpected points (empty array if none).
- "recommendations": an array of 2-3 actionable business recommendations based only on this chart.
- "extracted_data": an array of objects, one per plotted point, e.g. [{"category": "Jan", "value": 150}, {"category": "Feb", "value": 170}]. "value" must be a number.
- "metric_name": a short lower-case name for the quantity being plotted, taken from the chart title or axis labels, e.g. "sales" or "monthly_active_users". Use null if it cannot be determined."#;

/// Shape of a historical row as shown to the auditor.
#[derive(Serialize)]
struct HistoryEntry<'a> {
    category: &'a str,
    value: f64,
    extracted_at: String,
}

/// Build the audit instruction for the validation call.
///
/// Embeds the serialized extraction result and the serialized historical
/// points. With no history the instruction says so and restricts the review
/// to internal consistency.
///
/// # Errors
///
/// Returns [`serde_json::Error`] if either payload fails to serialize.
pub fn validation_instruction(
    metric_name: &str,
    initial: &InsightRecord,
    history: &[HistoricalDataPoint],
) -> Result<String, serde_json::Error> {
    let initial_json = serde_json::to_string_pretty(initial)?;

    let history_section = if history.is_empty() {
        format!(
            "No historical data exists yet for the metric \"{metric_name}\".\n\
             Limit your review to the internal consistency of the initial analysis: \
             check that the trends, anomalies and recommendations follow from its own \
             extracted_data. Do not claim that anything is confirmed or corroborated by \
             historical data."
        )
    } else {
        let entries: Vec<HistoryEntry<'_>> = history
            .iter()
            .map(|p| HistoryEntry {
                category: &p.category,
                value: p.value,
                extracted_at: p.extracted_at.to_rfc3339(),
            })
            .collect();
        let history_json = serde_json::to_string_pretty(&entries)?;
        format!(
            "Here is the historical data previously recorded for the metric \
             \"{metric_name}\", newest first:\n{history_json}\n\n\
             1. Cross-check the \"trends\" and \"anomalies\" of the initial analysis against \
             the historical data. Challenge them where the history contradicts them; do not \
             simply restate them.\n\
             2. Keep a recommendation only if it is supported by both the new chart and the \
             historical data. Refine or drop the rest."
        )
    };

    Ok(format!(
        "You are a senior auditor reviewing an automated analysis of a chart.\n\n\
         The initial analysis produced this JSON:\n{initial_json}\n\n\
         {history_section}\n\n\
         Return a single JSON object and nothing else, with exactly the same keys as the \
         initial analysis (chart_type, summary, trends, anomalies, recommendations, \
         extracted_data, metric_name). Include every extracted_data entry of the initial \
         analysis; do not drop any category."
    ))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use graphlens_core::DataPoint;

    use super::*;

    fn initial() -> InsightRecord {
        InsightRecord {
            chart_type: "Bar Chart".to_string(),
            summary: "Sales grew.".to_string(),
            trends: vec!["growth".to_string()],
            anomalies: vec![],
            recommendations: vec!["expand".to_string()],
            extracted_data: vec![DataPoint::new("Jan", 100.0), DataPoint::new("Feb", 120.0)],
            metric_name: Some("sales".to_string()),
        }
    }

    #[test]
    fn extraction_instruction_names_every_field() {
        for key in [
            "chart_type",
            "summary",
            "trends",
            "anomalies",
            "recommendations",
            "extracted_data",
            "metric_name",
        ] {
            assert!(EXTRACTION_INSTRUCTION.contains(key), "missing {key}");
        }
    }

    #[test]
    fn embeds_initial_and_history() {
        let history = vec![HistoricalDataPoint {
            id: 1,
            metric_name: "sales".to_string(),
            category: "May".to_string(),
            value: 145_000.0,
            extracted_at: Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap(),
            source_hash: "h".to_string(),
        }];

        let text = validation_instruction("sales", &initial(), &history).unwrap();
        assert!(text.contains("\"Feb\""));
        assert!(text.contains("\"May\""));
        assert!(text.contains("145000"));
        assert!(text.contains("2025-05-01"));
        assert!(!text.contains("No historical data"));
    }

    #[test]
    fn notes_absence_of_history() {
        let text = validation_instruction("sales", &initial(), &[]).unwrap();
        assert!(text.contains("No historical data exists yet"));
        assert!(text.contains("Do not claim"));
        assert!(text.contains("\"Jan\""));
    }
}
