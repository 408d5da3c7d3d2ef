use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::types::Artifact;

/// Looks an artifact up by exact name. A miss is a structured result listing
/// what is available, so the agent can retry with a real filename.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file or artifact by name"
    }

    async fn execute(&self, input: &Value, artifacts: &[Artifact]) -> String {
        let filename = input.get("filename").and_then(Value::as_str).unwrap_or("");

        match artifacts.iter().find(|a| a.name == filename) {
            Some(artifact) => json!({
                "filename": artifact.name,
                "type": artifact.kind,
                "content": artifact.content,
                "createdBy": artifact.created_by,
                "summary": format!(
                    "Successfully read file \"{}\" ({})",
                    artifact.name,
                    serde_json::to_value(artifact.kind)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_default()
                )
            })
            .to_string(),
            None => {
                let available = artifacts
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                json!({
                    "error": format!("File \"{}\" not found", filename),
                    "availableFiles": if available.is_empty() {
                        "No files available".to_string()
                    } else {
                        available
                    }
                })
                .to_string()
            }
        }
    }
}
