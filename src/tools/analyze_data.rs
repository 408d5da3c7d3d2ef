use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::types::Artifact;

pub struct AnalyzeDataTool;

#[async_trait]
impl Tool for AnalyzeDataTool {
    fn name(&self) -> &str {
        "analyze_data"
    }

    fn description(&self) -> &str {
        "Analyze data and extract insights"
    }

    async fn execute(&self, input: &Value, _artifacts: &[Artifact]) -> String {
        let analysis_type = input
            .get("analysisType")
            .and_then(Value::as_str)
            .unwrap_or("general");

        json!({
            "insights": [
                "Pattern identified: correlation between variables",
                "Anomaly detected in dataset segment 3",
                "Trend analysis shows upward trajectory"
            ],
            "confidence": 0.85,
            "summary": format!(
                "Analysis complete. {} analysis revealed 3 key insights.",
                analysis_type
            )
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_analysis_type_in_summary() {
        let tool = AnalyzeDataTool;
        let result = tool
            .execute(&json!({"data": "1,2,3", "analysisType": "statistical"}), &[])
            .await;
        let parsed: Value = serde_json::from_str(&result).unwrap();
        assert!(parsed["summary"].as_str().unwrap().contains("statistical"));
        assert_eq!(parsed["insights"].as_array().unwrap().len(), 3);
    }
}
