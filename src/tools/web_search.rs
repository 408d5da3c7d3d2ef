use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::types::Artifact;

/// Simulated web search: returns a fixed pair of results echoing the query.
pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information on a topic"
    }

    async fn execute(&self, input: &Value, _artifacts: &[Artifact]) -> String {
        let query = input.get("query").and_then(Value::as_str).unwrap_or("");

        json!({
            "results": [
                {
                    "title": format!("Result for: {}", query),
                    "snippet": "Found relevant information about the topic...",
                    "url": "https://example.com/1"
                },
                {
                    "title": format!("More on: {}", query),
                    "snippet": "Additional details and context...",
                    "url": "https://example.com/2"
                }
            ],
            "summary": format!(
                "Search completed for \"{}\". Found 2 relevant results with key insights.",
                query
            )
        })
        .to_string()
    }
}
