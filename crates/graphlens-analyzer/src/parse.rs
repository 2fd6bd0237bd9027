use graphlens_core::InsightRecord;

use crate::error::AnalyzeError;

/// Parse model output into an [`InsightRecord`].
///
/// The whole response must be one JSON object with every required field.
/// Nothing is stripped or repaired: surrounding prose or markdown fences
/// make the response invalid.
///
/// # Errors
///
/// Returns [`AnalyzeError::UpstreamFormat`] if the text is not a conforming
/// JSON object.
pub fn parse_insight(raw: &str) -> Result<InsightRecord, AnalyzeError> {
    serde_json::from_str::<InsightRecord>(raw.trim()).map_err(|e| {
        AnalyzeError::UpstreamFormat(format!("response is not a valid insight record: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "chart_type": "Line Chart",
        "summary": "Visits are flat.",
        "trends": ["flat"],
        "anomalies": [],
        "recommendations": ["hold"],
        "extracted_data": [{"category": "Mon", "value": 3}]
    }"#;

    #[test]
    fn parses_conforming_json_with_surrounding_whitespace() {
        let record = parse_insight(&format!("\n  {VALID}\n")).expect("parse");
        assert_eq!(record.chart_type, "Line Chart");
        assert_eq!(record.extracted_data[0].category, "Mon");
        assert!(record.metric_name.is_none());
    }

    #[test]
    fn rejects_prose() {
        let err = parse_insight("Sure! Here is the analysis you asked for.").unwrap_err();
        assert!(matches!(err, AnalyzeError::UpstreamFormat(_)));
    }

    #[test]
    fn rejects_markdown_fenced_json() {
        let err = parse_insight(&format!("```json\n{VALID}\n```")).unwrap_err();
        assert!(matches!(err, AnalyzeError::UpstreamFormat(_)));
    }

    #[test]
    fn rejects_missing_fields() {
        let err = parse_insight(r#"{"chart_type": "Pie Chart", "summary": "x"}"#).unwrap_err();
        assert!(matches!(err, AnalyzeError::UpstreamFormat(ref m) if m.contains("missing field")));
    }

    #[test]
    fn rejects_data_point_without_value() {
        let raw = VALID.replace(r#""value": 3"#, r#""label": "3""#);
        assert!(parse_insight(&raw).is_err());
    }
}
