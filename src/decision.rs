use std::sync::{Arc, OnceLock};

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::providers::{LLMProvider, Message};
use crate::tools::spec_for;
use crate::types::{Agent, ArtifactKind, Task};

const COST_PER_TOKEN: f64 = 0.000001;

const MALFORMED_MESSAGE: &str = "Research completed - check artifacts for detailed results";
const MALFORMED_REASON: &str = "Completed task with malformed output";
const API_ERROR_MESSAGE: &str =
    "I encountered an issue processing this request. Please try again.";

/// One structured "thinking" step. A closed set: adding an action kind is a
/// compile-checked change everywhere the loop dispatches on it.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    UseTool {
        tool: String,
        input: Value,
        reason: String,
    },
    CreateArtifact {
        name: String,
        content: String,
        kind: ArtifactKind,
        reason: String,
    },
    AskUser {
        message: String,
        reason: String,
    },
    Complete {
        message: String,
        reason: String,
    },
}

impl Decision {
    pub fn kind(&self) -> &'static str {
        match self {
            Decision::UseTool { .. } => "use_tool",
            Decision::CreateArtifact { .. } => "create_artifact",
            Decision::AskUser { .. } => "ask_user",
            Decision::Complete { .. } => "complete",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Decision::UseTool { reason, .. }
            | Decision::CreateArtifact { reason, .. }
            | Decision::AskUser { reason, .. }
            | Decision::Complete { reason, .. } => reason,
        }
    }
}

/// Approximate spend for one decision. The character-count heuristic is not
/// a contract; only monotonic accumulation on the agent is.
#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub tokens: u64,
    pub cost: f64,
}

impl Usage {
    fn estimate(prompt: &str, response: &str) -> Self {
        let tokens = (prompt.len().div_ceil(4) + response.len().div_ceil(4)) as u64;
        Self {
            tokens,
            cost: tokens as f64 * COST_PER_TOKEN,
        }
    }
}

#[derive(Debug)]
pub struct DecisionOutcome {
    pub decision: Decision,
    pub usage: Usage,
}

#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn decide(
        &self,
        agent: &Agent,
        task: &Task,
        mission_context: &str,
        previous_results: &[String],
    ) -> Result<DecisionOutcome>;
}

/// The flat JSON shape the model is asked to emit. Everything optional so a
/// partially-valid response still deserializes and can be salvaged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDecision {
    action: Option<String>,
    tool: Option<String>,
    tool_input: Option<Value>,
    artifact_name: Option<String>,
    artifact_content: Option<String>,
    artifact_type: Option<ArtifactKind>,
    message: Option<String>,
    reason: Option<String>,
}

fn json_blob_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static pattern"))
}

fn reason_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""reason"\s*:\s*"([^"]+)""#).expect("static pattern"))
}

/// Widest `{...}` span in the raw model output, the same recovery the rest
/// of the crate uses before attempting a strict parse.
pub(crate) fn extract_json(text: &str) -> Option<&str> {
    json_blob_pattern().find(text).map(|m| m.as_str())
}

/// The terminal recovery for unparsable model output: never crash a run over
/// one bad response.
fn malformed_fallback(blob: &str) -> Decision {
    let reason = reason_pattern()
        .captures(blob)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| MALFORMED_REASON.to_string());

    Decision::Complete {
        message: MALFORMED_MESSAGE.to_string(),
        reason,
    }
}

fn convert(raw: RawDecision) -> Option<Decision> {
    let reason = raw.reason.unwrap_or_else(|| "No reason given".to_string());

    match raw.action.as_deref() {
        Some("use_tool") => Some(Decision::UseTool {
            tool: raw.tool?,
            input: raw.tool_input.unwrap_or(Value::Null),
            reason,
        }),
        Some("create_artifact") => Some(Decision::CreateArtifact {
            name: raw.artifact_name?,
            content: raw.artifact_content.unwrap_or_default(),
            kind: raw.artifact_type.unwrap_or(ArtifactKind::Text),
            reason,
        }),
        Some("ask_user") => Some(Decision::AskUser {
            message: raw
                .message
                .unwrap_or_else(|| "I need more information to proceed.".to_string()),
            reason,
        }),
        Some("complete") => Some(Decision::Complete {
            message: raw.message.unwrap_or_else(|| "Task completed.".to_string()),
            reason,
        }),
        _ => None,
    }
}

fn parse_decision(blob: &str) -> Decision {
    match serde_json::from_str::<RawDecision>(blob) {
        Ok(raw) => convert(raw).unwrap_or_else(|| malformed_fallback(blob)),
        Err(err) => {
            log::error!(
                "decision JSON parse failed ({}), raw: {:.500}",
                err,
                blob
            );
            malformed_fallback(blob)
        }
    }
}

/// Decision provider backed by the generative-language model. All failure
/// modes degrade to a safe `Complete`; this implementation never returns
/// `Err` from `decide`.
pub struct LlmDecisionProvider {
    llm: Arc<dyn LLMProvider>,
}

impl LlmDecisionProvider {
    pub fn new(llm: Arc<dyn LLMProvider>) -> Self {
        Self { llm }
    }

    fn steering_context(agent: &Agent) -> String {
        let autonomy = if agent.steering_x < 0.3 {
            "low - ask for guidance often"
        } else if agent.steering_x > 0.7 {
            "high - work independently"
        } else {
            "medium - balance guidance and autonomy"
        };
        let pace = if agent.steering_y < 0.3 {
            "prioritize speed"
        } else if agent.steering_y > 0.7 {
            "prioritize thoroughness"
        } else {
            "balanced"
        };

        format!(
            "Steering parameters (0-1 scale):\n\
             - Autonomy (X): {:.2} ({})\n\
             - Speed vs Quality (Y): {:.2} ({})",
            agent.steering_x, autonomy, agent.steering_y, pace
        )
    }

    /// Only enabled tools make it into the prompt. This is where tool
    /// enablement is enforced; the executor deliberately does not re-check.
    fn offered_tools(agent: &Agent) -> String {
        agent
            .enabled_tools
            .iter()
            .filter_map(|name| spec_for(name))
            .map(|spec| format!("- {}: {}", spec.name, spec.description))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn coordinator_prompt(task: &Task, context: &str, previous_results: &[String]) -> String {
        let question = task
            .goal
            .strip_prefix("Answer user question: ")
            .unwrap_or(&task.goal);
        let mission = if context.is_empty() {
            "No active mission"
        } else {
            context
        };
        let artifacts = if previous_results.is_empty() {
            "None".to_string()
        } else {
            previous_results.join(", ")
        };

        format!(
            r#"You are the Coordinator, the ONLY agent that handles user chat messages.

User question: {question}

Current mission context: {mission}
Available artifacts: {artifacts}

Your role:
- Answer ALL user questions conversationally
- Explain what the system can do and what artifacts are available
- Guide users on next steps
- Be friendly and helpful
- NEVER create artifacts or use tools

Respond with valid JSON:
{{
  "action": "complete",
  "message": "Your direct answer to the user (be natural and conversational)",
  "reason": "Answering user chat"
}}

Keep responses under 100 words unless more detail is needed."#
        )
    }

    fn worker_prompt(
        agent: &Agent,
        task: &Task,
        context: &str,
        previous_results: &[String],
    ) -> String {
        let steering = Self::steering_context(agent);
        let tools = Self::offered_tools(agent);
        let results = if previous_results.is_empty() {
            "None yet".to_string()
        } else {
            previous_results.join("\n---\n")
        };

        format!(
            r#"You are an AI agent named "{name}" with the following description: {description}

Your current task:
Goal: {goal}
Success Criteria: {criteria}
Iteration: {iteration} of {max_iterations}

{steering}

Available tools:
{tools}

Context from user:
{context}

Previous results from this task:
{results}

Based on this information, decide your next action. You MUST respond with valid JSON in this exact format:
{{
  "action": "use_tool" | "create_artifact" | "complete" | "ask_user",
  "tool": "tool_name (if action is use_tool)",
  "toolInput": {{ "param": "value" }} (if action is use_tool),
  "artifactName": "filename.ext (if action is create_artifact)",
  "artifactContent": "content as a single string - escape ALL quotes and newlines properly (if action is create_artifact)",
  "artifactType": "markdown" | "json" | "text" | "code" (if action is create_artifact),
  "message": "message for user (if action is ask_user or complete)",
  "reason": "brief explanation of why you chose this action"
}}

Important:
- If you have enough information, create an artifact with your findings/output
- When naming artifacts, use descriptive names without iteration numbers
- Complete the task once you've produced meaningful output
- Respect the steering parameters for autonomy and thoroughness
- Stay focused on the specific goal"#,
            name = agent.name,
            description = agent.description,
            goal = task.goal,
            criteria = task.success_criteria,
            iteration = task.iteration_count,
            max_iterations = task.max_iterations,
        )
    }
}

#[async_trait]
impl DecisionProvider for LlmDecisionProvider {
    async fn decide(
        &self,
        agent: &Agent,
        task: &Task,
        mission_context: &str,
        previous_results: &[String],
    ) -> Result<DecisionOutcome> {
        let is_coordinator = agent.is_coordinator();
        let prompt = if is_coordinator {
            Self::coordinator_prompt(task, mission_context, previous_results)
        } else {
            Self::worker_prompt(agent, task, mission_context, previous_results)
        };

        let response = match self.llm.complete(vec![Message::user(prompt.clone())]).await {
            Ok(text) => text,
            Err(err) => {
                log::error!("decision call failed for agent {}: {:#}", agent.name, err);
                return Ok(DecisionOutcome {
                    decision: Decision::Complete {
                        message: API_ERROR_MESSAGE.to_string(),
                        reason: format!("Error: {}", err),
                    },
                    usage: Usage::default(),
                });
            }
        };

        let Some(blob) = extract_json(&response) else {
            log::error!(
                "no JSON in decision response for agent {}: {:.200}",
                agent.name,
                response
            );
            return Ok(DecisionOutcome {
                decision: Decision::Complete {
                    message: API_ERROR_MESSAGE.to_string(),
                    reason: "Error: No JSON found in response".to_string(),
                },
                usage: Usage::default(),
            });
        };

        let usage = Usage::estimate(&prompt, &response);

        let mut decision = parse_decision(blob);
        // The Coordinator answers chat and nothing else.
        if is_coordinator && !matches!(decision, Decision::Complete { .. }) {
            decision = malformed_fallback(blob);
        }

        Ok(DecisionOutcome { decision, usage })
    }
}
