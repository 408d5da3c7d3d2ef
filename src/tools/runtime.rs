use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};

use super::{analyze_data::AnalyzeDataTool, code_writer::CodeWriterTool, read_file::ReadFileTool,
    web_search::WebSearchTool, Tool};
use crate::types::Artifact;

const DEFAULT_LATENCY: Duration = Duration::from_millis(400);

/// Registry and dispatcher for the tool vocabulary. `execute` never fails:
/// an unknown tool name comes back as a structured error string, same as any
/// other tool result.
pub struct ToolRuntime {
    tools: HashMap<&'static str, Box<dyn Tool>>,
    latency: Duration,
}

impl ToolRuntime {
    pub fn new() -> Self {
        let mut tools: HashMap<&'static str, Box<dyn Tool>> = HashMap::new();
        tools.insert("web_search", Box::new(WebSearchTool));
        tools.insert("analyze_data", Box::new(AnalyzeDataTool));
        tools.insert("code_writer", Box::new(CodeWriterTool));
        tools.insert("read_file", Box::new(ReadFileTool));

        Self {
            tools,
            latency: DEFAULT_LATENCY,
        }
    }

    /// Override the simulated latency (zero for tests).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub async fn execute(&self, tool_name: &str, input: &Value, artifacts: &[Artifact]) -> String {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.tools.get(tool_name) {
            Some(tool) => tool.execute(input, artifacts).await,
            None => json!({ "error": format!("Unknown tool: {}", tool_name) }).to_string(),
        }
    }
}

impl Default for ToolRuntime {
    fn default() -> Self {
        Self::new()
    }
}
