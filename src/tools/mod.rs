pub mod analyze_data;
pub mod code_writer;
pub mod read_file;
pub mod runtime;
pub mod web_search;

pub use runtime::ToolRuntime;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::Artifact;

/// A side-effect action an agent can take. Execution always produces a
/// result string (usually JSON) for the agent to interpret; failure modes
/// like a missing file are part of the result, never an error.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    async fn execute(&self, input: &Value, artifacts: &[Artifact]) -> String;
}

/// Static tool vocabulary, used to describe tools to the decision provider
/// without holding a runtime.
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: &'static str,
}

pub const TOOL_CATALOG: &[ToolSpec] = &[
    ToolSpec {
        name: "web_search",
        description: "Search the web for information on a topic",
        parameters: r#"{"query": "string"}"#,
    },
    ToolSpec {
        name: "analyze_data",
        description: "Analyze data and extract insights",
        parameters: r#"{"data": "string", "analysisType": "string"}"#,
    },
    ToolSpec {
        name: "code_writer",
        description: "Write code in various programming languages",
        parameters: r#"{"language": "string", "task": "string"}"#,
    },
    ToolSpec {
        name: "read_file",
        description: "Read the contents of a file or artifact by name",
        parameters: r#"{"filename": "string"}"#,
    },
];

pub fn spec_for(name: &str) -> Option<&'static ToolSpec> {
    TOOL_CATALOG.iter().find(|s| s.name == name)
}
