use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured insight produced by the extraction call and refined by the
/// validation call.
///
/// Every field except `metric_name` is required when deserializing; a model
/// response that omits one of them does not parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    /// Free-text chart category, e.g. `"Bar Chart"`.
    pub chart_type: String,
    pub summary: String,
    pub trends: Vec<String>,
    pub anomalies: Vec<String>,
    pub recommendations: Vec<String>,
    pub extracted_data: Vec<DataPoint>,
    /// Name of the plotted metric as guessed by the extraction model
    /// (e.g. `"sales"`). Used to key historical lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
}

/// One `(category, value)` pair read off a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub category: String,
    pub value: f64,
}

impl DataPoint {
    #[must_use]
    pub fn new(category: impl Into<String>, value: f64) -> Self {
        Self {
            category: category.into(),
            value,
        }
    }
}

impl InsightRecord {
    /// Returns the normalized metric name, or `None` if the model did not
    /// supply a usable one.
    #[must_use]
    pub fn resolved_metric_name(&self) -> Option<String> {
        self.metric_name.as_deref().and_then(normalize_metric_name)
    }

    /// Distinct non-blank categories in `extracted_data`, in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for point in &self.extracted_data {
            let category = point.category.trim();
            if !category.is_empty() && !seen.iter().any(|c: &String| c == category) {
                seen.push(category.to_string());
            }
        }
        seen
    }
}

/// Normalize a model-supplied metric name for use as a store key.
///
/// Trims surrounding whitespace and lower-cases. Returns `None` for blank input.
#[must_use]
pub fn normalize_metric_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// A previously extracted data point, as stored in the historical store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataPoint {
    pub id: i64,
    pub metric_name: String,
    pub category: String,
    pub value: f64,
    pub extracted_at: DateTime<Utc>,
    /// SHA-256 hex fingerprint of the image the point was read from.
    pub source_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_json() -> serde_json::Value {
        serde_json::json!({
            "chart_type": "Bar Chart",
            "summary": "Sales rose in February.",
            "trends": ["upward"],
            "anomalies": [],
            "recommendations": ["stock more in Q1"],
            "extracted_data": [
                {"category": "Jan", "value": 100},
                {"category": "Feb", "value": 120.5}
            ],
            "metric_name": "  Sales "
        })
    }

    #[test]
    fn deserializes_full_record() {
        let record: InsightRecord = serde_json::from_value(record_json()).expect("parse");
        assert_eq!(record.chart_type, "Bar Chart");
        assert_eq!(record.extracted_data.len(), 2);
        assert!((record.extracted_data[1].value - 120.5).abs() < f64::EPSILON);
        assert_eq!(record.resolved_metric_name().as_deref(), Some("sales"));
    }

    #[test]
    fn missing_anomalies_field_is_rejected() {
        let mut value = record_json();
        value.as_object_mut().unwrap().remove("anomalies");
        assert!(serde_json::from_value::<InsightRecord>(value).is_err());
    }

    #[test]
    fn string_value_is_rejected() {
        let mut value = record_json();
        value["extracted_data"][0]["value"] = serde_json::json!("100");
        assert!(serde_json::from_value::<InsightRecord>(value).is_err());
    }

    #[test]
    fn metric_name_is_optional_and_omitted_when_absent() {
        let mut value = record_json();
        value.as_object_mut().unwrap().remove("metric_name");
        let record: InsightRecord = serde_json::from_value(value).expect("parse");
        assert!(record.resolved_metric_name().is_none());
        let out = serde_json::to_value(&record).unwrap();
        assert!(out.get("metric_name").is_none());
    }

    #[test]
    fn blank_metric_name_does_not_resolve() {
        assert_eq!(normalize_metric_name("   "), None);
        assert_eq!(normalize_metric_name("Revenue"), Some("revenue".to_string()));
    }

    #[test]
    fn categories_are_distinct_and_ordered() {
        let mut record: InsightRecord = serde_json::from_value(record_json()).unwrap();
        record.extracted_data.push(DataPoint::new("Jan", 90.0));
        record.extracted_data.push(DataPoint::new(" ", 1.0));
        assert_eq!(record.categories(), vec!["Jan".to_string(), "Feb".to_string()]);
    }
}
