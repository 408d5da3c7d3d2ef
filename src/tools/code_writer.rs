use async_trait::async_trait;
use serde_json::{json, Value};

use super::Tool;
use crate::types::Artifact;

pub struct CodeWriterTool;

#[async_trait]
impl Tool for CodeWriterTool {
    fn name(&self) -> &str {
        "code_writer"
    }

    fn description(&self) -> &str {
        "Write code in various programming languages"
    }

    async fn execute(&self, input: &Value, _artifacts: &[Artifact]) -> String {
        let language = input
            .get("language")
            .and_then(Value::as_str)
            .unwrap_or("javascript");
        let task = input.get("task").and_then(Value::as_str).unwrap_or("");

        let code = format!(
            "// Generated {} code for: {}\nfunction solution() {{\n  // Implementation here\n  return result;\n}}",
            language, task
        );

        json!({
            "code": code,
            "language": language,
            "summary": format!("Generated {} code for the specified task.", language)
        })
        .to_string()
    }
}
